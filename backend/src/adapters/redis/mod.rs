//! Redis adapters - shared key-value and stream infrastructure.
//!
//! - `RedisIdempotencyGuard` - `SET NX EX` claims
//! - `RedisDistributedLock` - `SET NX PX` lease lock with token-checked release
//! - `RedisScheduleCache` - JSON weekly rosters with TTL
//! - `RedisStreamBroker` - Streams + consumer groups with dead-lettering

mod distributed_lock;
mod idempotency_guard;
mod schedule_cache;
mod stream_broker;

pub use distributed_lock::RedisDistributedLock;
pub use idempotency_guard::RedisIdempotencyGuard;
pub use schedule_cache::RedisScheduleCache;
pub use stream_broker::RedisStreamBroker;
