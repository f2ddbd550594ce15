//! End-to-end tests against in-memory SQLite databases.

pub mod async_exec;
pub mod cardinality;
pub mod errors;
pub mod logging;
pub mod mapping;
pub mod membership;
pub mod pruning;
