//! In-memory settings backend using DashMap.
//!
//! Settings are lost on restart; used by default and in tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::notification::{Channel, Priority};

use super::backend::{SettingsStore, SettingsStoreError};
use super::types::{ChannelSetting, NotificationSettings, QuietHours};

/// In-memory settings backend.
///
/// Each event type's aggregate lives in one DashMap entry, so an update holds
/// that shard's lock for the whole read-modify-write.
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: DashMap<String, NotificationSettings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed settings directly (fixtures, tests)
    pub fn insert(&self, settings: NotificationSettings) {
        self.settings.insert(settings.event_type.clone(), settings);
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn get_settings(&self, event_type: &str) -> Result<NotificationSettings, SettingsStoreError> {
        Ok(self
            .settings
            .get(event_type)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| NotificationSettings::default_for(event_type)))
    }

    async fn update_channel_setting(
        &self,
        event_type: &str,
        channel: Channel,
        enabled: bool,
        threshold: Priority,
    ) -> Result<NotificationSettings, SettingsStoreError> {
        let mut entry = self
            .settings
            .entry(event_type.to_string())
            .or_insert_with(|| NotificationSettings::default_for(event_type));

        entry.channels.set(channel, ChannelSetting::new(enabled, threshold));
        entry.updated_at = Some(Utc::now());

        tracing::debug!(
            event_type = %event_type,
            channel = %channel,
            enabled = enabled,
            threshold = %threshold,
            "Channel setting updated"
        );

        Ok(entry.value().clone())
    }

    async fn update_quiet_hours(
        &self,
        event_type: &str,
        quiet_hours: QuietHours,
    ) -> Result<NotificationSettings, SettingsStoreError> {
        let mut entry = self
            .settings
            .entry(event_type.to_string())
            .or_insert_with(|| NotificationSettings::default_for(event_type));

        entry.quiet_hours = quiet_hours;
        entry.updated_at = Some(Utc::now());

        tracing::debug!(
            event_type = %event_type,
            enabled = quiet_hours.enabled,
            start = %quiet_hours.start,
            end = %quiet_hours.end,
            "Quiet hours updated"
        );

        Ok(entry.value().clone())
    }

    async fn list_settings(&self) -> Result<Vec<NotificationSettings>, SettingsStoreError> {
        let mut all: Vec<NotificationSettings> = self
            .settings
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.event_type.cmp(&b.event_type));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::parse_time_of_day;

    #[tokio::test]
    async fn test_unknown_event_type_returns_default() {
        let store = MemorySettingsStore::new();
        let settings = store.get_settings("never.configured").await.unwrap();
        assert_eq!(settings, NotificationSettings::default_for("never.configured"));
        assert!(store.list_settings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_channel_returns_full_aggregate() {
        let store = MemorySettingsStore::new();

        let updated = store
            .update_channel_setting("invoices.overdue", Channel::Sms, false, Priority::Low)
            .await
            .unwrap();
        assert!(!updated.channels.sms.enabled);
        assert!(updated.channels.email.enabled);
        assert!(updated.updated_at.is_some());

        let updated = store
            .update_channel_setting("invoices.overdue", Channel::Email, true, Priority::Medium)
            .await
            .unwrap();
        assert!(!updated.channels.sms.enabled);
        assert_eq!(updated.channels.email.threshold, Priority::Medium);

        let read_back = store.get_settings("invoices.overdue").await.unwrap();
        assert_eq!(read_back, updated);
    }

    #[tokio::test]
    async fn test_update_quiet_hours_keeps_channels() {
        let store = MemorySettingsStore::new();
        store
            .update_channel_setting("inventory.low_stock", Channel::Push, false, Priority::Low)
            .await
            .unwrap();

        let quiet = QuietHours::new(
            true,
            parse_time_of_day("22:00").unwrap(),
            parse_time_of_day("06:00").unwrap(),
        );
        let updated = store
            .update_quiet_hours("inventory.low_stock", quiet)
            .await
            .unwrap();

        assert_eq!(updated.quiet_hours, quiet);
        assert!(!updated.channels.push.enabled);
    }

    #[tokio::test]
    async fn test_list_sorted_by_event_type() {
        let store = MemorySettingsStore::new();
        for event_type in ["orders.created", "invoices.overdue", "inventory.low_stock"] {
            store
                .update_channel_setting(event_type, Channel::Email, true, Priority::High)
                .await
                .unwrap();
        }

        let listed: Vec<String> = store
            .list_settings()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.event_type)
            .collect();
        assert_eq!(
            listed,
            vec!["inventory.low_stock", "invoices.overdue", "orders.created"]
        );
    }
}
