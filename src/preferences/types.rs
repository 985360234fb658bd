//! Per event type routing settings

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notification::{Channel, Priority};

/// Enablement and minimum priority for one channel of one event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSetting {
    pub enabled: bool,
    pub threshold: Priority,
}

impl ChannelSetting {
    pub fn new(enabled: bool, threshold: Priority) -> Self {
        Self { enabled, threshold }
    }

    pub fn disabled() -> Self {
        Self::new(false, Priority::Low)
    }

    /// Whether an event of `priority` passes this setting
    pub fn permits(&self, priority: Priority) -> bool {
        self.enabled && priority >= self.threshold
    }
}

impl Default for ChannelSetting {
    fn default() -> Self {
        Self::new(true, Priority::Low)
    }
}

/// Channel settings keyed by the closed set of channels.
///
/// One field per [`Channel`]; `get`/`get_mut` match exhaustively so adding a
/// channel fails to compile until it is wired here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelMatrix {
    #[serde(default)]
    pub email: ChannelSetting,
    #[serde(default)]
    pub sms: ChannelSetting,
    #[serde(default)]
    pub in_app: ChannelSetting,
    #[serde(default)]
    pub push: ChannelSetting,
    #[serde(default)]
    pub slack: ChannelSetting,
    #[serde(default)]
    pub webhook: ChannelSetting,
}

impl ChannelMatrix {
    pub fn get(&self, channel: Channel) -> &ChannelSetting {
        match channel {
            Channel::Email => &self.email,
            Channel::Sms => &self.sms,
            Channel::InApp => &self.in_app,
            Channel::Push => &self.push,
            Channel::Slack => &self.slack,
            Channel::Webhook => &self.webhook,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut ChannelSetting {
        match channel {
            Channel::Email => &mut self.email,
            Channel::Sms => &mut self.sms,
            Channel::InApp => &mut self.in_app,
            Channel::Push => &mut self.push,
            Channel::Slack => &mut self.slack,
            Channel::Webhook => &mut self.webhook,
        }
    }

    pub fn set(&mut self, channel: Channel, setting: ChannelSetting) {
        *self.get_mut(channel) = setting;
    }

    /// Iterate in channel evaluation order
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &ChannelSetting)> {
        Channel::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Daily window during which non-critical events are held back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    #[serde(with = "time_of_day")]
    pub start: NaiveTime,
    #[serde(with = "time_of_day")]
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn new(enabled: bool, start: NaiveTime, end: NaiveTime) -> Self {
        Self { enabled, start, end }
    }

    /// Whether `time` falls inside `[start, end)`, wrapping past midnight
    /// when `end < start`. `start == end` is an empty window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= time && time < self.end
        } else if self.start > self.end {
            time >= self.start || time < self.end
        } else {
            false
        }
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
        }
    }
}

/// Full routing configuration of one event type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub event_type: String,
    pub channels: ChannelMatrix,
    pub quiet_hours: QuietHours,
    /// Unset while the event type still runs on defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotificationSettings {
    /// Defaults: every channel enabled at `low`, quiet hours off
    pub fn default_for(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            channels: ChannelMatrix::default(),
            quiet_hours: QuietHours::default(),
            updated_at: None,
        }
    }

    pub fn with_channel(mut self, channel: Channel, setting: ChannelSetting) -> Self {
        self.channels.set(channel, setting);
        self
    }

    pub fn with_quiet_hours(mut self, quiet_hours: QuietHours) -> Self {
        self.quiet_hours = quiet_hours;
        self
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid time of day '{0}', expected HH:MM or HH:MM:SS")]
pub struct InvalidTimeOfDay(pub String);

/// Parse a wall-clock time such as `22:00` or `06:30:15`
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, InvalidTimeOfDay> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| InvalidTimeOfDay(value.to_string()))
}

/// Serde adapter rendering times as `HH:MM` (or `HH:MM:SS` when seconds are set)
pub(crate) mod time_of_day {
    use chrono::{NaiveTime, Timelike};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = if time.second() == 0 {
            time.format("%H:%M").to_string()
        } else {
            time.format("%H:%M:%S").to_string()
        };
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).map_err(de::Error::custom)
    }
}
