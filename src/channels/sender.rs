//! Provider transport port.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::notification::Channel;

use super::in_app::InAppSender;
use super::log_sender::LogSender;

/// Errors a provider transport reports for one send
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// Provider refused the message (bad address, content policy, ...)
    #[error("rejected by provider: {0}")]
    Rejected(String),

    /// Provider could not be reached
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Delivers one rendered message over one channel.
///
/// Implementations must be cheap to call concurrently; the dispatcher invokes
/// them from spawned tasks bounded by a timeout.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Transport name for logs and health output
    fn name(&self) -> &'static str;

    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), SendError>;
}

/// Channel to transport registry used by the dispatcher
#[derive(Clone, Default)]
pub struct ChannelSenders {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl ChannelSenders {
    /// Registry with no transports; every channel reports `sender_missing`
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracing-backed transports for external channels plus the in-app sender
    pub fn logging_defaults() -> Self {
        let log: Arc<dyn ChannelSender> = Arc::new(LogSender);
        let mut senders = Self::new().with(Channel::InApp, Arc::new(InAppSender));
        for channel in Channel::ALL {
            if channel != Channel::InApp {
                senders = senders.with(channel, log.clone());
            }
        }
        senders
    }

    /// Register (or replace) the transport for a channel
    pub fn with(mut self, channel: Channel, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(channel, sender);
        self
    }

    pub fn get(&self, channel: Channel) -> Option<Arc<dyn ChannelSender>> {
        self.senders.get(&channel).cloned()
    }

    /// Registered channels in channel order
    pub fn channels(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.senders.contains_key(c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_defaults_cover_every_channel() {
        let senders = ChannelSenders::logging_defaults();
        assert_eq!(senders.channels(), Channel::ALL.to_vec());
        assert_eq!(senders.get(Channel::InApp).unwrap().name(), "in_app");
        assert_eq!(senders.get(Channel::Email).unwrap().name(), "log");
    }

    #[test]
    fn test_empty_registry() {
        let senders = ChannelSenders::new();
        assert!(senders.get(Channel::Sms).is_none());
        assert!(senders.channels().is_empty());
    }
}
