//! PostgreSQL persistence module.
//!
//! Provides connection pooling and circuit breaker protection for the
//! PostgreSQL storage backends.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
