use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::config::RedisConfig;
use crate::metrics::{DispatchMetrics, StorageMetrics};
use crate::notification::{EventEnvelope, NotificationDispatcher};
use crate::resilience::ExponentialBackoff;

/// Channel subscribed when none are configured
pub const DEFAULT_EVENT_CHANNEL: &str = "notify:events";

/// How long shutdown waits for in-flight dispatches
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Redis Pub/Sub subscriber feeding event envelopes into the dispatcher.
///
/// Each message is dispatched on its own task. At most
/// `redis.max_in_flight` dispatches run at once; when all slots are taken the
/// receive loop waits for one to free up.
pub struct RedisSubscriber {
    config: RedisConfig,
    dispatcher: Arc<NotificationDispatcher>,
    in_flight: Arc<Semaphore>,
    shutdown: broadcast::Sender<()>,
}

impl RedisSubscriber {
    /// Create a new Redis subscriber
    pub fn new(config: RedisConfig, dispatcher: Arc<NotificationDispatcher>) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        let in_flight = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self {
            config,
            dispatcher,
            in_flight,
            shutdown,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Start the Redis subscriber loop, reconnecting with backoff until shut down
    pub async fn start(&self) -> anyhow::Result<()> {
        let channels = self.channels();
        tracing::info!(channels = ?channels, "Starting Redis subscriber");

        let mut backoff = ExponentialBackoff::new();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            match self.run_subscription_loop(&channels, &mut backoff).await {
                Ok(()) => {
                    self.drain().await;
                    tracing::info!("Redis subscriber stopped gracefully");
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    StorageMetrics::record_redis_reconnection();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Redis subscription error, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Shutdown received while reconnecting");
                            self.drain().await;
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    /// Wait for running dispatches to finish, bounded by `DRAIN_TIMEOUT`
    async fn drain(&self) {
        let slots = self.config.max_in_flight.max(1) as u32;
        match tokio::time::timeout(DRAIN_TIMEOUT, self.in_flight.acquire_many(slots)).await {
            Ok(_) => tracing::debug!("Redis dispatches drained"),
            Err(_) => tracing::warn!(
                running = slots as usize - self.in_flight.available_permits(),
                "Redis dispatches still running after drain timeout"
            ),
        }
    }

    fn channels(&self) -> Vec<String> {
        if self.config.channels.is_empty() {
            vec![DEFAULT_EVENT_CHANNEL.to_string()]
        } else {
            self.config.channels.clone()
        }
    }

    async fn run_subscription_loop(
        &self,
        channels: &[String],
        backoff: &mut ExponentialBackoff,
    ) -> anyhow::Result<()> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in channels {
            if is_pattern(channel) {
                pubsub.psubscribe(channel).await?;
                tracing::debug!(pattern = %channel, "Subscribed to pattern");
            } else {
                pubsub.subscribe(channel).await?;
                tracing::debug!(channel = %channel, "Subscribed to channel");
            }
        }

        tracing::info!("Redis subscription established");
        backoff.reset();

        let mut message_stream = pubsub.on_message();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    return Ok(());
                }
                msg = message_stream.next() => {
                    let Some(msg) = msg else {
                        anyhow::bail!("Redis message stream ended");
                    };

                    let channel = msg.get_channel_name().to_string();
                    let pattern: Option<String> = if msg.from_pattern() {
                        msg.get_pattern().ok()
                    } else {
                        None
                    };
                    let payload: String = match msg.get_payload() {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to get message payload");
                            continue;
                        }
                    };

                    StorageMetrics::record_redis_message();

                    let permit = tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Received shutdown signal");
                            return Ok(());
                        }
                        permit = self.in_flight.clone().acquire_owned() => permit?,
                    };
                    let source = event_source(pattern.as_deref(), &channel);
                    spawn_dispatch(self.dispatcher.clone(), permit, source, channel, payload);
                }
            }
        }
    }
}

/// Source tag for a message: the subscribed pattern when it arrived through
/// one, the channel otherwise. Keeps the metrics label set to what was
/// configured.
fn event_source(pattern: Option<&str>, channel: &str) -> String {
    format!("redis:{}", pattern.unwrap_or(channel))
}

/// Dispatch one message on its own task, holding `permit` until it finishes
fn spawn_dispatch(
    dispatcher: Arc<NotificationDispatcher>,
    permit: OwnedSemaphorePermit,
    source: String,
    channel: String,
    payload: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _permit = permit;
        handle_message(&dispatcher, &source, &channel, &payload).await;
    })
}

/// Parse and dispatch one message; failures are logged, never fatal
async fn handle_message(
    dispatcher: &NotificationDispatcher,
    source: &str,
    channel: &str,
    payload: &str,
) {
    let event = match parse_envelope(payload).and_then(|envelope| {
        envelope.into_event(source).map_err(anyhow::Error::from)
    }) {
        Ok(event) => event,
        Err(e) => {
            DispatchMetrics::record_rejected(source);
            tracing::warn!(error = %e, channel = %channel, "Rejected Redis event");
            return;
        }
    };

    match dispatcher.dispatch(event).await {
        Ok(report) => tracing::debug!(
            channel = %channel,
            event_id = %report.event_id,
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "Dispatched event from Redis"
        ),
        Err(e) => tracing::error!(error = %e, channel = %channel, "Failed to dispatch Redis event"),
    }
}

fn is_pattern(channel: &str) -> bool {
    channel.contains('*') || channel.contains('?') || channel.contains('[')
}

fn parse_envelope(payload: &str) -> anyhow::Result<EventEnvelope> {
    Ok(serde_json::from_str(payload)?)
}
