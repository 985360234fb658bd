use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::notification::{event_category, Channel, Priority};

/// Result of the send a record was written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivered" => Ok(DeliveryStatus::Delivered),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(format!("unknown delivery status '{}'", other)),
        }
    }
}

/// One persisted delivery attempt of an event on one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: String,
    pub event_type: String,
    pub channel: Channel,
    pub priority: Priority,
    /// Rendered subject
    pub title: String,
    /// Rendered body
    pub message: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_type: Option<String>,
}

impl NotificationRecord {
    pub fn category(&self) -> &str {
        event_category(&self.event_type)
    }

    /// Whether the record shows up in the user's feed.
    ///
    /// In-app records always do; other channels only once delivered. Failed
    /// external sends stay in the audit trail.
    pub fn is_visible(&self) -> bool {
        self.channel == Channel::InApp || self.status == DeliveryStatus::Delivered
    }

    /// Flip to read. Returns false when it already was; `read_at` keeps the
    /// first read time.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        self.read_at = Some(at);
        true
    }
}

/// Read-state tab of the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedTab {
    #[default]
    All,
    Unread,
    Read,
}

impl FeedTab {
    pub fn admits(&self, read: bool) -> bool {
        match self {
            FeedTab::All => true,
            FeedTab::Unread => !read,
            FeedTab::Read => read,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseFeedFilterError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for FeedTab {
    type Err = ParseFeedFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(FeedTab::All),
            "unread" => Ok(FeedTab::Unread),
            "read" => Ok(FeedTab::Read),
            _ => Err(ParseFeedFilterError {
                kind: "tab",
                value: s.to_string(),
            }),
        }
    }
}

/// Age window relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Last 60 minutes
    Hour,
    /// Since 00:00 UTC of the current day
    Today,
    /// Last 7 days
    Week,
    /// Last 30 days
    Month,
    #[default]
    All,
}

impl TimeWindow {
    /// Earliest `created_at` inside the window, `None` for unbounded
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeWindow::Hour => Some(now - Duration::hours(1)),
            TimeWindow::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            TimeWindow::Week => Some(now - Duration::days(7)),
            TimeWindow::Month => Some(now - Duration::days(30)),
            TimeWindow::All => None,
        }
    }

    pub fn contains(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.since(now).map_or(true, |since| created_at >= since)
    }
}

impl FromStr for TimeWindow {
    type Err = ParseFeedFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeWindow::Hour),
            "today" => Ok(TimeWindow::Today),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "all" | "" => Ok(TimeWindow::All),
            _ => Err(ParseFeedFilterError {
                kind: "window",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Today => "today",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::All => "all",
        };
        f.write_str(name)
    }
}

/// Feed query; every set criterion must hold
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    pub tab: FeedTab,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub window: TimeWindow,
    /// Case-insensitive substring of title, message or event type
    pub query: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Counters over a user's visible records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    pub total: usize,
    pub unread: usize,
    pub read: usize,
    pub critical_or_high: usize,
}

/// One page of the feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub notifications: Vec<NotificationRecord>,
    /// Matching records before pagination
    pub total: usize,
}
