//! Per-user notification feed and delivery audit trail.
//!
//! # Backend Architecture
//!
//! - `MemoryNotificationStore`: DashMap storage (default)
//! - `PostgresNotificationStore`: `notification_records` table
//!
//! Filtering, pagination and statistics are pure functions in `filter` so
//! both backends behave the same.

mod backend;
mod filter;
mod memory_backend;
mod postgres_backend;
mod service;
mod types;

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::postgres::PostgresPool;

pub use backend::{FeedStoreError, NotificationStore};
pub use filter::{compute_stats, matches, paginate};
pub use memory_backend::MemoryNotificationStore;
pub use postgres_backend::PostgresNotificationStore;
pub use service::NotificationFeed;
pub use types::{
    DeliveryStatus, FeedFilter, FeedPage, FeedStats, FeedTab, NotificationRecord,
    ParseFeedFilterError, TimeWindow,
};

/// Create a notification record store based on configuration.
///
/// - `"postgres"`: `PostgresNotificationStore`; the pool must be connected
/// - `"memory"` (default): `MemoryNotificationStore`
pub fn create_notification_store(
    storage: &StorageConfig,
    postgres_pool: Option<Arc<PostgresPool>>,
) -> Result<Arc<dyn NotificationStore>, FeedStoreError> {
    match storage.backend.as_str() {
        "postgres" => {
            let pool = postgres_pool.ok_or_else(|| {
                FeedStoreError::Unavailable("PostgreSQL backend configured without a pool".to_string())
            })?;
            tracing::info!(backend = "postgres", "Creating PostgreSQL notification store");
            Ok(Arc::new(PostgresNotificationStore::new(pool)))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory notification store");
            Ok(Arc::new(MemoryNotificationStore::new()))
        }
        other => Err(FeedStoreError::UnknownBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_requires_pool_for_postgres() {
        let storage = StorageConfig {
            backend: "postgres".to_string(),
        };
        assert!(matches!(
            create_notification_store(&storage, None),
            Err(FeedStoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_factory_builds_memory_store() {
        let store = create_notification_store(&StorageConfig::default(), None).unwrap();
        assert_eq!(store.backend_type(), "memory");
    }
}
