use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::rules::ChannelDecision;

use super::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure => "failure",
        }
    }
}

/// Why a qualifying channel was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    TemplateMissing,
    TemplateRenderFailed,
    RecipientMissing,
    SenderMissing,
    TransportError,
    Timeout,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::TemplateMissing => "template_missing",
            FailureReason::TemplateRenderFailed => "template_render_failed",
            FailureReason::RecipientMissing => "recipient_missing",
            FailureReason::SenderMissing => "sender_missing",
            FailureReason::TransportError => "transport_error",
            FailureReason::Timeout => "timeout",
        }
    }
}

/// Result of one channel of a dispatch
#[derive(Debug, Clone, Serialize)]
pub struct ChannelAttempt {
    pub channel: Channel,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Persisted record, when one was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
    pub duration_ms: u64,
}

impl ChannelAttempt {
    pub fn success(channel: Channel) -> Self {
        Self {
            channel,
            outcome: AttemptOutcome::Success,
            reason: None,
            error: None,
            record_id: None,
            duration_ms: 0,
        }
    }

    pub fn failure(channel: Channel, reason: FailureReason, error: impl Into<String>) -> Self {
        Self {
            channel,
            outcome: AttemptOutcome::Failure,
            reason: Some(reason),
            error: Some(error.into()),
            record_id: None,
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Aggregated outcome of dispatching one event
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub event_id: Uuid,
    pub event_type: String,
    pub user_id: String,
    /// No channel qualified
    pub suppressed: bool,
    pub decisions: Vec<ChannelDecision>,
    /// One entry per qualifying channel, in channel order
    pub attempts: Vec<ChannelAttempt>,
    pub dispatched_at: DateTime<Utc>,
}

impl DeliveryReport {
    pub fn attempt(&self, channel: Channel) -> Option<&ChannelAttempt> {
        self.attempts.iter().find(|a| a.channel == channel)
    }

    pub fn successes(&self) -> impl Iterator<Item = &ChannelAttempt> {
        self.attempts.iter().filter(|a| a.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChannelAttempt> {
        self.attempts.iter().filter(|a| !a.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Some channel failed while at least one was attempted
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut email = ChannelAttempt::failure(Channel::Email, FailureReason::Timeout, "timed out after 10ms");
        email.duration_ms = 10;
        let report = DeliveryReport {
            event_id: Uuid::new_v4(),
            event_type: "invoices.overdue".to_string(),
            user_id: "user-1".to_string(),
            suppressed: false,
            decisions: vec![],
            attempts: vec![email, ChannelAttempt::success(Channel::InApp)],
            dispatched_at: Utc::now(),
        };

        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert!(report.has_failures());
        assert_eq!(
            report.attempt(Channel::Email).and_then(|a| a.reason),
            Some(FailureReason::Timeout)
        );
        assert!(report.attempt(Channel::Sms).is_none());
    }

    #[test]
    fn test_attempt_serialization() {
        let attempt = ChannelAttempt::failure(Channel::Slack, FailureReason::TemplateMissing, "no template");
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["channel"], "slack");
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["reason"], "template_missing");
        assert!(json.get("record_id").is_none());
    }
}
