//! Delivery channel ports: provider transports and recipient addressing.
//!
//! Real providers (SMTP, SMS gateways, push, Slack, webhooks) plug in by
//! implementing [`ChannelSender`] and registering it in [`ChannelSenders`].

mod in_app;
mod log_sender;
mod recipient;
mod sender;

pub use in_app::InAppSender;
pub use log_sender::LogSender;
pub use recipient::{InMemoryRecipientDirectory, RecipientDirectory};
pub use sender::{ChannelSender, ChannelSenders, SendError};
