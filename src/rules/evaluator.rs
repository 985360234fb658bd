use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Utc};
use serde::Serialize;

use crate::config::RulesConfig;
use crate::notification::{Channel, NotificationEvent, Priority};
use crate::preferences::NotificationSettings;

/// Policy knobs applied on top of the stored settings
#[derive(Debug, Clone, Copy)]
pub struct RulePolicy {
    /// Critical events are delivered inside quiet hours
    pub critical_bypasses_quiet_hours: bool,
    /// Wall clock offset quiet hours are expressed in
    pub utc_offset: FixedOffset,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            critical_bypasses_quiet_hours: true,
            utc_offset: utc(),
        }
    }
}

impl RulePolicy {
    pub fn from_config(config: &RulesConfig) -> Self {
        let utc_offset = FixedOffset::east_opt(config.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| {
                tracing::warn!(
                    utc_offset_minutes = config.utc_offset_minutes,
                    "UTC offset out of range, using UTC"
                );
                utc()
            });

        Self {
            critical_bypasses_quiet_hours: config.critical_bypasses_quiet_hours,
            utc_offset,
        }
    }

    /// Time of day of `at` on the policy's wall clock
    pub fn local_time(&self, at: DateTime<Utc>) -> NaiveTime {
        at.with_timezone(&self.utc_offset).time()
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Why a channel does or does not fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Ok,
    Disabled,
    BelowThreshold,
    QuietHours,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::Ok => "ok",
            DecisionReason::Disabled => "disabled",
            DecisionReason::BelowThreshold => "below_threshold",
            DecisionReason::QuietHours => "quiet_hours",
        }
    }
}

/// Outcome of evaluating one channel for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelDecision {
    pub channel: Channel,
    pub should_send: bool,
    pub reason: DecisionReason,
}

impl ChannelDecision {
    fn new(channel: Channel, reason: DecisionReason) -> Self {
        Self {
            channel,
            should_send: reason == DecisionReason::Ok,
            reason,
        }
    }
}

/// Whether quiet hours hold back this event.
pub fn in_quiet_hours(
    event: &NotificationEvent,
    settings: &NotificationSettings,
    policy: &RulePolicy,
) -> bool {
    if !settings.quiet_hours.enabled {
        return false;
    }
    if event.priority == Priority::Critical && policy.critical_bypasses_quiet_hours {
        return false;
    }
    settings
        .quiet_hours
        .contains(policy.local_time(event.occurred_at))
}

/// Decide, for every channel in channel order, whether the event is sent.
///
/// Quiet hours suppress every channel at once. Outside them a channel fires
/// when it is enabled and the event priority reaches its threshold.
pub fn evaluate(
    event: &NotificationEvent,
    settings: &NotificationSettings,
    policy: &RulePolicy,
) -> Vec<ChannelDecision> {
    if in_quiet_hours(event, settings, policy) {
        return Channel::ALL
            .into_iter()
            .map(|channel| ChannelDecision::new(channel, DecisionReason::QuietHours))
            .collect();
    }

    settings
        .channels
        .iter()
        .map(|(channel, setting)| {
            let reason = if setting.permits(event.priority) {
                DecisionReason::Ok
            } else if !setting.enabled {
                DecisionReason::Disabled
            } else {
                DecisionReason::BelowThreshold
            };
            ChannelDecision::new(channel, reason)
        })
        .collect()
}
