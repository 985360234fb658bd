//! Event triggers other than the HTTP API.

mod redis;

pub use redis::{RedisSubscriber, DEFAULT_EVENT_CHANNEL};
