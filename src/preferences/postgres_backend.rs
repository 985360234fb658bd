//! PostgreSQL settings backend.
//!
//! One row per configured event type in `notification_settings`, with the
//! channel matrix and quiet hours stored as JSONB. Channel updates patch a
//! single key with `jsonb_set` inside one upsert statement, so concurrent
//! updates of different channels of the same event type do not clobber each
//! other.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::notification::{Channel, Priority};
use crate::postgres::PostgresPool;

use super::backend::{SettingsStore, SettingsStoreError};
use super::types::{ChannelMatrix, ChannelSetting, NotificationSettings, QuietHours};

type SettingsRow = (String, serde_json::Value, serde_json::Value, DateTime<Utc>);

pub struct PostgresSettingsStore {
    pool: Arc<PostgresPool>,
}

impl PostgresSettingsStore {
    pub fn new(pool: Arc<PostgresPool>) -> Self {
        Self { pool }
    }

    fn decode(row: SettingsRow) -> Result<NotificationSettings, SettingsStoreError> {
        let (event_type, channels, quiet_hours, updated_at) = row;
        Ok(NotificationSettings {
            event_type,
            channels: serde_json::from_value::<ChannelMatrix>(channels)?,
            quiet_hours: serde_json::from_value::<QuietHours>(quiet_hours)?,
            updated_at: Some(updated_at),
        })
    }
}

#[async_trait]
impl SettingsStore for PostgresSettingsStore {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn get_settings(&self, event_type: &str) -> Result<NotificationSettings, SettingsStoreError> {
        let row: Option<SettingsRow> = self
            .pool
            .guarded(
                sqlx::query_as(
                    r#"
                    SELECT event_type, channels, quiet_hours, updated_at
                    FROM notification_settings
                    WHERE event_type = $1
                    "#,
                )
                .bind(event_type)
                .fetch_optional(self.pool.pool()),
            )
            .await?;

        match row {
            Some(row) => Self::decode(row),
            None => Ok(NotificationSettings::default_for(event_type)),
        }
    }

    async fn update_channel_setting(
        &self,
        event_type: &str,
        channel: Channel,
        enabled: bool,
        threshold: Priority,
    ) -> Result<NotificationSettings, SettingsStoreError> {
        let setting = ChannelSetting::new(enabled, threshold);
        let defaults = NotificationSettings::default_for(event_type).with_channel(channel, setting);

        let row: SettingsRow = self
            .pool
            .guarded(
                sqlx::query_as(
                    r#"
                    INSERT INTO notification_settings (event_type, channels, quiet_hours, updated_at)
                    VALUES ($1, $2, $3, NOW())
                    ON CONFLICT (event_type) DO UPDATE
                    SET channels = jsonb_set(notification_settings.channels, ARRAY[$4::text], $5, true),
                        updated_at = NOW()
                    RETURNING event_type, channels, quiet_hours, updated_at
                    "#,
                )
                .bind(event_type)
                .bind(serde_json::to_value(defaults.channels)?)
                .bind(serde_json::to_value(defaults.quiet_hours)?)
                .bind(channel.as_str())
                .bind(serde_json::to_value(setting)?)
                .fetch_one(self.pool.pool()),
            )
            .await?;

        tracing::debug!(
            event_type = %event_type,
            channel = %channel,
            enabled = enabled,
            threshold = %threshold,
            "Channel setting persisted"
        );

        Self::decode(row)
    }

    async fn update_quiet_hours(
        &self,
        event_type: &str,
        quiet_hours: QuietHours,
    ) -> Result<NotificationSettings, SettingsStoreError> {
        let defaults = NotificationSettings::default_for(event_type);

        let row: SettingsRow = self
            .pool
            .guarded(
                sqlx::query_as(
                    r#"
                    INSERT INTO notification_settings (event_type, channels, quiet_hours, updated_at)
                    VALUES ($1, $2, $3, NOW())
                    ON CONFLICT (event_type) DO UPDATE
                    SET quiet_hours = EXCLUDED.quiet_hours,
                        updated_at = NOW()
                    RETURNING event_type, channels, quiet_hours, updated_at
                    "#,
                )
                .bind(event_type)
                .bind(serde_json::to_value(defaults.channels)?)
                .bind(serde_json::to_value(quiet_hours)?)
                .fetch_one(self.pool.pool()),
            )
            .await?;

        tracing::debug!(
            event_type = %event_type,
            enabled = quiet_hours.enabled,
            "Quiet hours persisted"
        );

        Self::decode(row)
    }

    async fn list_settings(&self) -> Result<Vec<NotificationSettings>, SettingsStoreError> {
        let rows: Vec<SettingsRow> = self
            .pool
            .guarded(
                sqlx::query_as(
                    r#"
                    SELECT event_type, channels, quiet_hours, updated_at
                    FROM notification_settings
                    ORDER BY event_type ASC
                    "#,
                )
                .fetch_all(self.pool.pool()),
            )
            .await?;

        rows.into_iter().map(Self::decode).collect()
    }
}
