//! Course scheduler service.
//!
//! Runs the HTTP API, the outbox relay, the booking consumer and the
//! name-change consumer in one process until Ctrl-C.

use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use sqlx::PgPool;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use course_scheduler::adapters::events::{MessageRelay, OutboxPublisher};
use course_scheduler::adapters::http::{booking_router, BookingAppState};
use course_scheduler::adapters::identity::{
    CircuitBreakingIdentityLookup, HttpIdentityConfig, HttpIdentityLookup,
};
use course_scheduler::adapters::postgres::{
    PostgresBookingOutcomeStore, PostgresOutboxWriter, PostgresScheduleStore,
};
use course_scheduler::adapters::redis::{
    RedisDistributedLock, RedisIdempotencyGuard, RedisScheduleCache, RedisStreamBroker,
};
use course_scheduler::adapters::resilience::LocalCircuitBreaker;
use course_scheduler::application::{
    BookingConsumer, BookingConsumerPorts, ChangeStudentNameHandler, NameChangeConsumer,
    WeeklyScheduleCache,
};
use course_scheduler::config::{AppConfig, RedisConfig};
use course_scheduler::domain::foundation::{Clock, SystemClock};
use course_scheduler::ports::{BookingOutcomeStore, IdentityLookup, ScheduleStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    info!(
        environment = ?config.server.environment,
        booking_stream = %config.broker.booking_stream,
        "Starting course scheduler"
    );

    // PostgreSQL
    let pool: PgPool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    // Redis: blocking stream reads get their own connections
    let shared = redis_connection(&config.redis).await?;
    let booking_stream_conn = redis_connection(&config.redis).await?;
    let name_stream_conn = redis_connection(&config.redis).await?;

    // Ports
    let store: Arc<dyn ScheduleStore> = Arc::new(PostgresScheduleStore::new(pool.clone()));
    let outbox = Arc::new(PostgresOutboxWriter::new(pool.clone()));
    let outcomes: Arc<dyn BookingOutcomeStore> =
        Arc::new(PostgresBookingOutcomeStore::new(pool.clone()));
    let roster = Arc::new(WeeklyScheduleCache::new(
        store.clone(),
        Arc::new(RedisScheduleCache::new(shared.clone(), config.booking.cache_ttl())),
    ));

    let identity: Arc<dyn IdentityLookup> = Arc::new(CircuitBreakingIdentityLookup::new(
        Arc::new(HttpIdentityLookup::new(HttpIdentityConfig {
            base_url: config.identity.base_url.clone(),
            timeout: config.identity.timeout(),
        })?),
        Arc::new(LocalCircuitBreaker::new(
            "member-service",
            config.identity.circuit_breaker(),
        )),
    ));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Outbox delivery
    let relay = Arc::new(MessageRelay::new(
        outbox.clone(),
        Arc::new(RedisStreamBroker::new(shared.clone(), &config.broker)),
        config.broker.booking_stream.clone(),
        config.relay.clone(),
    ));
    let publisher = Arc::new(OutboxPublisher::new(outbox, relay.clone()));

    // Consumers
    let booking_consumer = BookingConsumer::new(
        BookingConsumerPorts {
            source: Arc::new(RedisStreamBroker::new(booking_stream_conn, &config.broker)),
            guard: Arc::new(RedisIdempotencyGuard::new(
                shared.clone(),
                config.booking.idempotency_ttl(),
            )),
            lock: Arc::new(
                RedisDistributedLock::new(shared.clone())
                    .with_retry_interval(config.booking.lock_retry()),
            ),
            store: store.clone(),
            roster: roster.clone(),
            outcomes: outcomes.clone(),
            clock: clock.clone(),
        },
        config.booking.clone(),
        config.broker.booking_stream.clone(),
        config.broker.batch_size,
    );
    let name_change_consumer = NameChangeConsumer::new(
        Arc::new(RedisStreamBroker::new(name_stream_conn, &config.broker)),
        Arc::new(ChangeStudentNameHandler::new(store, roster, clock.clone())),
        config.broker.name_change_stream.clone(),
        config.broker.batch_size,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let relay_task = {
        let relay = relay.clone();
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { relay.run(rx).await })
    };
    let booking_task = {
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { booking_consumer.run(rx).await })
    };
    let name_change_task = {
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { name_change_consumer.run(rx).await })
    };

    // HTTP
    let state = BookingAppState {
        identity,
        publisher,
        outcomes,
        max_slot_hour: config.booking.max_slot_hour,
    };
    let app = booking_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let mut server_shutdown = shutdown_rx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    let (relay_result, booking_result, name_change_result) =
        tokio::join!(relay_task, booking_task, name_change_task);
    for result in [relay_result, booking_result, name_change_result] {
        if let Err(e) = result {
            tracing::error!(error = %e, "Background task panicked");
        }
    }

    pool.close().await;
    info!("Course scheduler stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn redis_connection(config: &RedisConfig) -> Result<MultiplexedConnection, BoxError> {
    let client = redis::Client::open(config.url.as_str())?;
    let conn = tokio::time::timeout(config.timeout(), client.get_multiplexed_tokio_connection())
        .await
        .map_err(|_| format!("Timed out connecting to Redis at {}", config.url))??;
    Ok(conn)
}
