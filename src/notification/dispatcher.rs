use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::channels::{ChannelSenders, InMemoryRecipientDirectory, RecipientDirectory};
use crate::config::DispatchConfig;
use crate::feed::{DeliveryStatus, NotificationFeed, NotificationRecord};
use crate::metrics::{DispatchMetrics, TemplateMetrics};
use crate::preferences::{SettingsStore, SettingsStoreError};
use crate::rules::{evaluate, DecisionReason, RulePolicy};
use crate::telemetry;
use crate::template::{RenderedMessage, TemplateStore};

use super::report::{ChannelAttempt, DeliveryReport, FailureReason};
use super::{Channel, NotificationEvent};

/// Errors that abort a dispatch as a whole.
///
/// Per-channel problems never surface here; they become failed attempts in
/// the [`DeliveryReport`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to load routing settings: {0}")]
    Settings(#[from] SettingsStoreError),
}

/// Tunables for the per-channel fan-out
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Upper bound for one provider send
    pub channel_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            channel_timeout: Duration::from_secs(5),
        }
    }
}

impl DispatchOptions {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            channel_timeout: Duration::from_millis(config.channel_timeout_ms),
        }
    }
}

/// Statistics for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Events that went through rule evaluation
    pub events_dispatched: AtomicU64,
    /// Events where no channel qualified
    pub events_suppressed: AtomicU64,
    pub attempts_succeeded: AtomicU64,
    pub attempts_failed: AtomicU64,
    pub records_written: AtomicU64,
    pub record_write_failures: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_suppressed: self.events_suppressed.load(Ordering::Relaxed),
            attempts_succeeded: self.attempts_succeeded.load(Ordering::Relaxed),
            attempts_failed: self.attempts_failed.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            record_write_failures: self.record_write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub events_dispatched: u64,
    pub events_suppressed: u64,
    pub attempts_succeeded: u64,
    pub attempts_failed: u64,
    pub records_written: u64,
    pub record_write_failures: u64,
}

/// Routes events to channels: evaluates the rules, renders each qualifying
/// channel's template, sends it and writes the delivery record.
pub struct NotificationDispatcher {
    settings: Arc<dyn SettingsStore>,
    templates: Arc<TemplateStore>,
    feed: NotificationFeed,
    senders: ChannelSenders,
    recipients: Arc<dyn RecipientDirectory>,
    policy: RulePolicy,
    options: DispatchOptions,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    /// Create a dispatcher with logging transports, user id addressing and the
    /// default rule policy
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        templates: Arc<TemplateStore>,
        feed: NotificationFeed,
    ) -> Self {
        Self {
            settings,
            templates,
            feed,
            senders: ChannelSenders::logging_defaults(),
            recipients: Arc::new(InMemoryRecipientDirectory::default()),
            policy: RulePolicy::default(),
            options: DispatchOptions::default(),
            stats: DispatcherStats::default(),
        }
    }

    pub fn with_senders(mut self, senders: ChannelSenders) -> Self {
        self.senders = senders;
        self
    }

    pub fn with_recipients(mut self, recipients: Arc<dyn RecipientDirectory>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn with_policy(mut self, policy: RulePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn policy(&self) -> &RulePolicy {
        &self.policy
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Dispatch one event to every qualifying channel.
    ///
    /// Only a settings store failure is an error. Channel sends run
    /// concurrently, each bounded by the channel timeout, and the report lists
    /// them in channel order.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, event),
        fields(
            event_id = %event.id,
            event_type = %event.event_type,
            user_id = %event.user_id,
            priority = %event.priority,
            source = %event.metadata.source,
            dispatch.outcome = tracing::field::Empty,
            dispatch.succeeded = tracing::field::Empty,
            dispatch.failed = tracing::field::Empty
        )
    )]
    pub async fn dispatch(&self, event: NotificationEvent) -> Result<DeliveryReport, DispatchError> {
        let started = Instant::now();
        let source = if event.metadata.source.is_empty() {
            "unknown"
        } else {
            event.metadata.source.as_str()
        };
        DispatchMetrics::record_received(source);

        if let Some(key) = &event.metadata.idempotency_key {
            // Not deduplicated; repeated dispatches append new records
            tracing::debug!(idempotency_key = %key, "Event carries idempotency key");
        }

        // One snapshot per dispatch so every channel sees the same settings
        let settings = self
            .settings
            .get_settings(&event.event_type)
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, "Failed to load routing settings");
            })?;

        let decisions = evaluate(&event, &settings, &self.policy);
        let qualifying: Vec<Channel> = decisions
            .iter()
            .filter(|d| d.should_send)
            .map(|d| d.channel)
            .collect();

        self.stats.events_dispatched.fetch_add(1, Ordering::Relaxed);

        if qualifying.is_empty() {
            let reason = if decisions
                .iter()
                .all(|d| d.reason == DecisionReason::QuietHours)
            {
                "quiet_hours"
            } else {
                "rules"
            };
            self.stats.events_suppressed.fetch_add(1, Ordering::Relaxed);
            DispatchMetrics::record_suppressed(reason);
            DispatchMetrics::observe_dispatch(started.elapsed().as_secs_f64());
            telemetry::record_dispatch(&Span::current(), true, 0, 0);
            tracing::info!(reason = reason, "Event suppressed, no qualifying channel");

            return Ok(DeliveryReport {
                event_id: event.id,
                event_type: event.event_type,
                user_id: event.user_id,
                suppressed: true,
                decisions,
                attempts: Vec::new(),
                dispatched_at: Utc::now(),
            });
        }

        let attempts = join_all(
            qualifying
                .iter()
                .map(|&channel| self.attempt_channel(&event, channel)),
        )
        .await;

        let succeeded = attempts.iter().filter(|a| a.is_success()).count() as u64;
        let failed = attempts.len() as u64 - succeeded;
        self.stats
            .attempts_succeeded
            .fetch_add(succeeded, Ordering::Relaxed);
        self.stats.attempts_failed.fetch_add(failed, Ordering::Relaxed);
        DispatchMetrics::observe_dispatch(started.elapsed().as_secs_f64());
        telemetry::record_dispatch(&Span::current(), false, succeeded, failed);

        tracing::info!(
            channels = attempts.len(),
            succeeded = succeeded,
            failed = failed,
            "Event dispatched"
        );

        Ok(DeliveryReport {
            event_id: event.id,
            event_type: event.event_type,
            user_id: event.user_id,
            suppressed: false,
            decisions,
            attempts,
            dispatched_at: Utc::now(),
        })
    }

    async fn attempt_channel(&self, event: &NotificationEvent, channel: Channel) -> ChannelAttempt {
        let started = Instant::now();
        let mut attempt = self.deliver(event, channel).await;
        let elapsed = started.elapsed();

        attempt.duration_ms = elapsed.as_millis() as u64;
        DispatchMetrics::record_attempt(
            channel.as_str(),
            attempt.outcome.as_str(),
            elapsed.as_secs_f64(),
        );

        if let (Some(reason), Some(error)) = (attempt.reason, attempt.error.as_deref()) {
            tracing::warn!(
                channel = %channel,
                reason = reason.as_str(),
                error = %error,
                "Channel delivery failed"
            );
        }
        attempt
    }

    async fn deliver(&self, event: &NotificationEvent, channel: Channel) -> ChannelAttempt {
        let template = match self.templates.resolve(&event.event_type, channel) {
            Ok(template) => template,
            Err(e) => {
                TemplateMetrics::record_missing(channel.as_str());
                return ChannelAttempt::failure(channel, FailureReason::TemplateMissing, e.to_string());
            }
        };

        let message = match self.templates.render(&template, &event.payload) {
            Ok(message) => message,
            Err(e) => {
                return ChannelAttempt::failure(
                    channel,
                    FailureReason::TemplateRenderFailed,
                    e.to_string(),
                );
            }
        };

        // Once there is a message, the attempt is recorded whatever happens next
        let failure = self.send(event, channel, &message).await;
        let record = build_record(event, channel, message, failure.as_ref());
        let record_id = self.persist(record).await;

        let mut attempt = match failure {
            None => ChannelAttempt::success(channel),
            Some((reason, error)) => ChannelAttempt::failure(channel, reason, error),
        };
        attempt.record_id = record_id;
        attempt
    }

    /// Address and send one message; `None` on success.
    async fn send(
        &self,
        event: &NotificationEvent,
        channel: Channel,
        message: &RenderedMessage,
    ) -> Option<(FailureReason, String)> {
        let Some(recipient) = self.recipients.address(&event.user_id, channel).await else {
            return Some((
                FailureReason::RecipientMissing,
                format!("no {} address for user {}", channel, event.user_id),
            ));
        };

        let Some(sender) = self.senders.get(channel) else {
            return Some((
                FailureReason::SenderMissing,
                format!("no sender registered for {}", channel),
            ));
        };

        let subject = message.subject.clone();
        let body = message.body.clone();
        let handle = tokio::spawn(
            async move { sender.send(channel, &recipient, &subject, &body).await }
                .instrument(telemetry::channel_send_span(channel)),
        );

        // On timeout the handle is dropped and the send finishes detached
        match tokio::time::timeout(self.options.channel_timeout, handle).await {
            Ok(Ok(Ok(()))) => None,
            Ok(Ok(Err(e))) => Some((FailureReason::TransportError, e.to_string())),
            Ok(Err(e)) => Some((
                FailureReason::TransportError,
                format!("sender task failed: {}", e),
            )),
            Err(_) => Some((
                FailureReason::Timeout,
                format!(
                    "no response within {}ms",
                    self.options.channel_timeout.as_millis()
                ),
            )),
        }
    }

    async fn persist(&self, record: NotificationRecord) -> Option<Uuid> {
        let id = record.id;
        let channel = record.channel;

        match self.feed.record(record).await {
            Ok(()) => {
                self.stats.records_written.fetch_add(1, Ordering::Relaxed);
                Some(id)
            }
            Err(e) => {
                self.stats
                    .record_write_failures
                    .fetch_add(1, Ordering::Relaxed);
                DispatchMetrics::record_record_write_failed();
                tracing::error!(
                    record_id = %id,
                    channel = %channel,
                    error = %e,
                    "Failed to persist notification record"
                );
                None
            }
        }
    }
}

fn build_record(
    event: &NotificationEvent,
    channel: Channel,
    message: RenderedMessage,
    failure: Option<&(FailureReason, String)>,
) -> NotificationRecord {
    NotificationRecord {
        id: Uuid::new_v4(),
        event_id: event.id,
        user_id: event.user_id.clone(),
        event_type: event.event_type.clone(),
        channel,
        priority: event.priority,
        title: message.subject,
        message: message.body,
        status: if failure.is_some() {
            DeliveryStatus::Failed
        } else {
            DeliveryStatus::Delivered
        },
        error: failure.map(|(reason, error)| format!("{}: {}", reason.as_str(), error)),
        created_at: Utc::now(),
        read: false,
        read_at: None,
        related_entity_id: event.metadata.related_entity_id.clone(),
        related_entity_type: event.metadata.related_entity_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{ChannelSender, SendError};
    use crate::feed::MemoryNotificationStore;
    use crate::notification::Priority;
    use crate::preferences::{ChannelSetting, MemorySettingsStore, NotificationSettings};
    use crate::template::Template;
    use async_trait::async_trait;

    struct Rejecting;

    #[async_trait]
    impl ChannelSender for Rejecting {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        async fn send(&self, _: Channel, _: &str, _: &str, _: &str) -> Result<(), SendError> {
            Err(SendError::Rejected("mailbox full".to_string()))
        }
    }

    fn only_email_settings() -> NotificationSettings {
        let mut settings = NotificationSettings::default_for("invoices.overdue");
        for channel in Channel::ALL {
            settings.channels.set(channel, ChannelSetting::disabled());
        }
        settings.with_channel(Channel::Email, ChannelSetting::new(true, Priority::Low))
    }

    fn email_template() -> Template {
        Template {
            id: "invoice-email".to_string(),
            name: "Invoice overdue".to_string(),
            event_type: "invoices.overdue".to_string(),
            channels: vec![Channel::Email],
            subject: "Invoice {{number}}".to_string(),
            body: "Overdue".to_string(),
            variables: vec![],
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn dispatcher(with_template: bool) -> (NotificationDispatcher, NotificationFeed) {
        let settings = Arc::new(MemorySettingsStore::new());
        settings.insert(only_email_settings());

        let templates = Arc::new(TemplateStore::new());
        if with_template {
            templates.create(email_template()).unwrap();
        }

        let feed = NotificationFeed::new(Arc::new(MemoryNotificationStore::new()));
        (NotificationDispatcher::new(settings, templates, feed.clone()), feed)
    }

    fn event() -> NotificationEvent {
        NotificationEvent::builder("invoices.overdue", "user-1")
            .priority(Priority::High)
            .payload(serde_json::json!({"number": "INV-5"}))
            .build()
    }

    #[tokio::test]
    async fn test_template_missing_is_reported_without_record() {
        let (dispatcher, feed) = dispatcher(false);
        let event = event();
        let event_id = event.id;

        let report = dispatcher.dispatch(event).await.unwrap();
        let attempt = report.attempt(Channel::Email).unwrap();
        assert_eq!(attempt.reason, Some(FailureReason::TemplateMissing));
        assert!(attempt.record_id.is_none());
        assert!(feed.deliveries(event_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sender_missing_is_recorded() {
        let (dispatcher, feed) = dispatcher(true);
        let dispatcher = dispatcher.with_senders(ChannelSenders::new());
        let event = event();
        let event_id = event.id;

        let report = dispatcher.dispatch(event).await.unwrap();
        let attempt = report.attempt(Channel::Email).unwrap();
        assert_eq!(attempt.reason, Some(FailureReason::SenderMissing));

        let records = feed.deliveries(event_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DeliveryStatus::Failed);
        assert_eq!(records[0].title, "Invoice INV-5");
    }

    #[tokio::test]
    async fn test_transport_error_keeps_error_text() {
        let (dispatcher, feed) = dispatcher(true);
        let dispatcher =
            dispatcher.with_senders(ChannelSenders::new().with(Channel::Email, Arc::new(Rejecting)));
        let event = event();
        let event_id = event.id;

        let report = dispatcher.dispatch(event).await.unwrap();
        let attempt = report.attempt(Channel::Email).unwrap();
        assert_eq!(attempt.reason, Some(FailureReason::TransportError));
        assert!(attempt.error.as_deref().unwrap().contains("mailbox full"));

        let record = feed.deliveries(event_id).await.unwrap().remove(0);
        assert!(record.error.unwrap().starts_with("transport_error"));
    }

    #[tokio::test]
    async fn test_recipient_missing_without_fallback() {
        let (dispatcher, _feed) = dispatcher(true);
        let dispatcher =
            dispatcher.with_recipients(Arc::new(InMemoryRecipientDirectory::new(false)));

        let report = dispatcher.dispatch(event()).await.unwrap();
        assert_eq!(
            report.attempt(Channel::Email).unwrap().reason,
            Some(FailureReason::RecipientMissing)
        );
    }

    #[tokio::test]
    async fn test_suppressed_event_has_no_attempts() {
        let (dispatcher, _feed) = dispatcher(true);
        let event = NotificationEvent::builder("invoices.overdue", "user-1")
            .priority(Priority::Low)
            .build();
        let settings = Arc::new(MemorySettingsStore::new());
        settings.insert(
            only_email_settings()
                .with_channel(Channel::Email, ChannelSetting::new(true, Priority::High)),
        );
        let dispatcher = NotificationDispatcher {
            settings,
            ..dispatcher
        };

        let report = dispatcher.dispatch(event).await.unwrap();
        assert!(report.suppressed);
        assert!(report.attempts.is_empty());
        assert_eq!(report.decisions.len(), Channel::ALL.len());

        let stats = dispatcher.stats();
        assert_eq!(stats.events_dispatched, 1);
        assert_eq!(stats.events_suppressed, 1);
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let (dispatcher, _feed) = dispatcher(true);
        dispatcher.dispatch(event()).await.unwrap();
        dispatcher.dispatch(event()).await.unwrap();

        let stats = dispatcher.stats();
        assert_eq!(stats.events_dispatched, 2);
        assert_eq!(stats.attempts_succeeded, 2);
        assert_eq!(stats.records_written, 2);
        assert_eq!(stats.record_write_failures, 0);
    }
}
