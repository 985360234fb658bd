use async_trait::async_trait;

use crate::notification::Channel;

use super::sender::{ChannelSender, SendError};

/// Transport that writes the message to the tracing log instead of a provider.
///
/// Used for every external channel until real provider adapters are wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait]
impl ChannelSender for LogSender {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), SendError> {
        if recipient.trim().is_empty() {
            return Err(SendError::Rejected("empty recipient".to_string()));
        }

        tracing::info!(
            channel = %channel,
            recipient = %recipient,
            subject = %subject,
            body_len = body.len(),
            "Delivered notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sender_accepts_and_rejects() {
        let sender = LogSender;
        assert!(sender
            .send(Channel::Email, "ops@example.com", "Hi", "Body")
            .await
            .is_ok());
        assert!(matches!(
            sender.send(Channel::Sms, " ", "Hi", "Body").await,
            Err(SendError::Rejected(_))
        ));
    }
}
