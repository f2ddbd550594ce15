//! PostgreSQL rendering, plus a live round trip when a server is available.

#[cfg(feature = "tokio-postgres")]
pub mod live;
pub mod sql;
