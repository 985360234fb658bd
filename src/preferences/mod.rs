//! Routing settings: which channels fire for an event type, above which
//! priority, and when the event type is held back by quiet hours.
//!
//! # Backend Architecture
//!
//! - `MemorySettingsStore`: DashMap storage (default)
//! - `PostgresSettingsStore`: `notification_settings` table
//!
//! Use `create_settings_store()` to pick one from configuration.

mod backend;
mod memory_backend;
mod postgres_backend;
mod types;

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::postgres::PostgresPool;

pub use backend::{SettingsStore, SettingsStoreError};
pub use memory_backend::MemorySettingsStore;
pub use postgres_backend::PostgresSettingsStore;
pub use types::{
    parse_time_of_day, ChannelMatrix, ChannelSetting, InvalidTimeOfDay, NotificationSettings,
    QuietHours,
};

/// Create a settings backend based on configuration.
///
/// - `"postgres"`: `PostgresSettingsStore`; the pool must be connected
/// - `"memory"` (default): `MemorySettingsStore`
///
/// Any other backend name, or `"postgres"` without a pool, is an error.
pub fn create_settings_store(
    storage: &StorageConfig,
    postgres_pool: Option<Arc<PostgresPool>>,
) -> Result<Arc<dyn SettingsStore>, SettingsStoreError> {
    match storage.backend.as_str() {
        "postgres" => {
            let pool = postgres_pool.ok_or_else(|| {
                SettingsStoreError::Unavailable("PostgreSQL backend configured without a pool".to_string())
            })?;
            tracing::info!(backend = "postgres", "Creating PostgreSQL settings store");
            Ok(Arc::new(PostgresSettingsStore::new(pool)))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory settings store");
            Ok(Arc::new(MemorySettingsStore::new()))
        }
        other => Err(SettingsStoreError::UnknownBackend(other.to_string())),
    }
}
