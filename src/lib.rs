// Infrastructure (shared components)
pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;
pub mod resilience;
pub mod telemetry;

// Domain layer (business logic)
pub mod channels;
pub mod feed;
pub mod notification;
pub mod preferences;
pub mod rules;
pub mod template;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;
