//! Failure containment for external dependencies
//!
//! - `CircuitBreaker`: fails storage calls fast while PostgreSQL is down
//! - `ExponentialBackoff`: paces Redis subscriber reconnection attempts

mod backoff;
mod circuit_breaker;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};

/// Get current time in milliseconds since epoch
pub(crate) fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
