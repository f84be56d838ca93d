//! Identity adapters - member service lookups.

mod circuit_breaking;
mod http;
mod mock;

pub use circuit_breaking::CircuitBreakingIdentityLookup;
pub use http::{HttpIdentityConfig, HttpIdentityLookup};
pub use mock::MockIdentityLookup;
