use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Priority levels for notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Informational, lowest threshold
    Low,
    /// Normal priority (default for raised events)
    #[default]
    Medium,
    /// Should be delivered promptly
    High,
    /// Immediate delivery required
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    /// Get numeric value for priority comparison
    pub fn as_weight(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_weight().cmp(&other.as_weight())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown priority '{0}', expected one of low, medium, high, critical")]
pub struct ParsePriorityError(pub String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}

/// Delivery surfaces a notification can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    InApp,
    Push,
    Slack,
    Webhook,
}

impl Channel {
    /// Every channel, in evaluation order.
    pub const ALL: [Channel; 6] = [
        Channel::Email,
        Channel::Sms,
        Channel::InApp,
        Channel::Push,
        Channel::Slack,
        Channel::Webhook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::InApp => "in_app",
            Channel::Push => "push",
            Channel::Slack => "slack",
            Channel::Webhook => "webhook",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown channel '{0}', expected one of email, sms, in_app, push, slack, webhook")]
pub struct ParseChannelError(pub String);

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            "in_app" | "in-app" => Ok(Channel::InApp),
            "push" => Ok(Channel::Push),
            "slack" => Ok(Channel::Slack),
            "webhook" => Ok(Channel::Webhook),
            _ => Err(ParseChannelError(s.to_string())),
        }
    }
}

/// Category of an event type: the part before the first `.`.
///
/// `"invoices.overdue"` belongs to `"invoices"`; a type without a separator is
/// its own category.
pub fn event_category(event_type: &str) -> &str {
    event_type
        .split_once('.')
        .map(|(category, _)| category)
        .unwrap_or(event_type)
}

/// A business event raised for one target user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Unique identifier for this event
    pub id: Uuid,
    /// Type of event (e.g., "invoices.overdue", "inventory.low_stock")
    pub event_type: String,
    /// Severity used for channel thresholds
    pub priority: Priority,
    /// User who should be notified
    pub user_id: String,
    /// Event payload data, used for template variables
    pub payload: serde_json::Value,
    /// When the event occurred
    pub occurred_at: DateTime<Utc>,
    /// Event metadata
    pub metadata: EventMetadata,
}

/// Metadata associated with an event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Source that raised this event ("http-api", "redis:<channel>", ...)
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_type: Option<String>,
    /// Correlation ID for tracing (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Producer supplied key identifying a logical event across retries.
    /// Carried and logged only; records are not deduplicated on it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Builder for creating notification events
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    event_type: String,
    user_id: String,
    payload: serde_json::Value,
    priority: Priority,
    occurred_at: Option<DateTime<Utc>>,
    metadata: EventMetadata,
}

impl NotificationBuilder {
    /// Create a new event builder
    pub fn new(event_type: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            user_id: user_id.into(),
            payload: serde_json::Value::Object(serde_json::Map::new()),
            priority: Priority::default(),
            occurred_at: None,
            metadata: EventMetadata::default(),
        }
    }

    /// Set the payload
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the priority
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set when the event occurred (defaults to now)
    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }

    /// Set the source that raised the event
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = source.into();
        self
    }

    /// Link the event to a business entity (invoice, product, ...)
    pub fn related_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.metadata.related_entity_type = Some(entity_type.into());
        self.metadata.related_entity_id = Some(entity_id.into());
        self
    }

    /// Set the correlation ID for tracing
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.metadata.idempotency_key = Some(key.into());
        self
    }

    /// Build the notification event
    pub fn build(self) -> NotificationEvent {
        NotificationEvent {
            id: Uuid::new_v4(),
            event_type: self.event_type,
            priority: self.priority,
            user_id: self.user_id,
            payload: self.payload,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            metadata: self.metadata,
        }
    }
}

impl NotificationEvent {
    /// Create a builder for this event type
    pub fn builder(event_type: impl Into<String>, user_id: impl Into<String>) -> NotificationBuilder {
        NotificationBuilder::new(event_type, user_id)
    }

    /// Category derived from the event type
    pub fn category(&self) -> &str {
        event_category(&self.event_type)
    }
}

/// Reasons an inbound event envelope is rejected
#[derive(Debug, Error)]
pub enum InvalidEvent {
    #[error("event_type must be 1-128 characters")]
    EventType,

    #[error("user_id must not be empty")]
    UserId,

    #[error("priority is required (low, medium, high or critical)")]
    MissingPriority,

    #[error(transparent)]
    Priority(#[from] ParsePriorityError),
}

/// Wire format of a raised event, shared by `POST /api/v1/events` and the
/// Redis trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    pub event_type: String,
    /// Priority name, required; parsed strictly so an unknown level is rejected
    #[serde(default)]
    pub priority: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub related_entity_id: Option<String>,
    #[serde(default)]
    pub related_entity_type: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl EventEnvelope {
    /// Validate the envelope and turn it into an event tagged with `source`
    pub fn into_event(self, source: impl Into<String>) -> Result<NotificationEvent, InvalidEvent> {
        if self.event_type.trim().is_empty() || self.event_type.len() > 128 {
            return Err(InvalidEvent::EventType);
        }
        if self.user_id.trim().is_empty() {
            return Err(InvalidEvent::UserId);
        }

        let priority = self
            .priority
            .as_deref()
            .ok_or(InvalidEvent::MissingPriority)?
            .parse::<Priority>()?;

        let payload = match self.payload {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            other => other,
        };

        let mut builder = NotificationBuilder::new(self.event_type, self.user_id)
            .payload(payload)
            .priority(priority)
            .source(source);

        if let Some(at) = self.occurred_at {
            builder = builder.occurred_at(at);
        }
        if let Some(id) = self.correlation_id {
            builder = builder.correlation_id(id);
        }
        if let Some(key) = self.idempotency_key {
            builder = builder.idempotency_key(key);
        }

        let mut event = builder.build();
        event.metadata.related_entity_id = self.related_entity_id;
        event.metadata.related_entity_type = self.related_entity_type;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_builder() {
        let event = NotificationBuilder::new("invoices.overdue", "user-1")
            .payload(serde_json::json!({"invoice_number": "INV-7"}))
            .priority(Priority::High)
            .source("test")
            .related_entity("invoice", "inv-7")
            .correlation_id("req-456")
            .build();

        assert_eq!(event.event_type, "invoices.overdue");
        assert_eq!(event.user_id, "user-1");
        assert_eq!(event.priority, Priority::High);
        assert_eq!(event.metadata.source, "test");
        assert_eq!(event.metadata.related_entity_id.as_deref(), Some("inv-7"));
        assert_eq!(event.metadata.correlation_id, Some("req-456".to_string()));
        assert_eq!(event.category(), "invoices");
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_priority_parse_rejects_unknown() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert!("urgent".parse::<Priority>().is_err());
        assert!("".parse::<Priority>().is_err());
    }

    #[test]
    fn test_priority_serde_lowercase() {
        let json = serde_json::to_string(&Priority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, Priority::Low);
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::InApp.as_str(), "in_app");
        assert_eq!("in_app".parse::<Channel>(), Ok(Channel::InApp));
        assert_eq!(serde_json::to_string(&Channel::InApp).unwrap(), "\"in_app\"");
        assert!("fax".parse::<Channel>().is_err());
        assert_eq!(Channel::ALL.len(), 6);
        assert_eq!(Channel::ALL[0], Channel::Email);
    }

    #[test]
    fn test_event_category() {
        assert_eq!(event_category("inventory.low_stock"), "inventory");
        assert_eq!(event_category("a.b.c"), "a");
        assert_eq!(event_category("system"), "system");
    }

    #[test]
    fn test_envelope_into_event() {
        let envelope: EventEnvelope = serde_json::from_value(serde_json::json!({
            "event_type": "inventory.low_stock",
            "priority": "critical",
            "user_id": "user-9",
            "payload": {"sku": "SKU-1"},
            "related_entity_type": "product",
            "related_entity_id": "p-1"
        }))
        .unwrap();

        let event = envelope.into_event("http-api").unwrap();
        assert_eq!(event.priority, Priority::Critical);
        assert_eq!(event.metadata.source, "http-api");
        assert_eq!(event.metadata.related_entity_type.as_deref(), Some("product"));
        assert_eq!(event.payload["sku"], "SKU-1");
    }

    #[test]
    fn test_envelope_rejects_bad_priority() {
        let envelope: EventEnvelope = serde_json::from_value(serde_json::json!({
            "event_type": "inventory.low_stock",
            "priority": "severe",
            "user_id": "user-9"
        }))
        .unwrap();

        assert!(matches!(
            envelope.into_event("test"),
            Err(InvalidEvent::Priority(_))
        ));
    }

    #[test]
    fn test_envelope_requires_priority() {
        let envelope: EventEnvelope = serde_json::from_value(serde_json::json!({
            "event_type": "inventory.low_stock",
            "user_id": "user-9"
        }))
        .unwrap();

        assert!(matches!(
            envelope.into_event("test"),
            Err(InvalidEvent::MissingPriority)
        ));
    }

    #[test]
    fn test_envelope_rejects_missing_user() {
        let envelope: EventEnvelope = serde_json::from_value(serde_json::json!({
            "event_type": "inventory.low_stock",
            "user_id": "  "
        }))
        .unwrap();

        assert!(matches!(envelope.into_event("test"), Err(InvalidEvent::UserId)));
    }
}
