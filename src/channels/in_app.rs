use async_trait::async_trait;

use crate::notification::Channel;

use super::sender::{ChannelSender, SendError};

/// In-app delivery: the persisted notification record is the message, so
/// there is nothing to transmit.
#[derive(Debug, Clone, Copy, Default)]
pub struct InAppSender;

#[async_trait]
impl ChannelSender for InAppSender {
    fn name(&self) -> &'static str {
        "in_app"
    }

    async fn send(
        &self,
        _channel: Channel,
        recipient: &str,
        _subject: &str,
        _body: &str,
    ) -> Result<(), SendError> {
        tracing::debug!(user_id = %recipient, "In-app notification stored for feed");
        Ok(())
    }
}
