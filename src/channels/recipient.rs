//! Recipient address lookup.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::notification::Channel;

/// Resolves where a user is reached on a channel (email address, phone
/// number, Slack member id, webhook URL, ...).
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn address(&self, user_id: &str, channel: Channel) -> Option<String>;
}

/// DashMap-backed directory.
///
/// In-app always addresses the user id. Other channels use registered
/// addresses, falling back to the user id when `fallback_to_user_id` is set.
pub struct InMemoryRecipientDirectory {
    addresses: DashMap<(String, Channel), String>,
    fallback_to_user_id: bool,
}

impl Default for InMemoryRecipientDirectory {
    fn default() -> Self {
        Self::new(true)
    }
}

impl InMemoryRecipientDirectory {
    pub fn new(fallback_to_user_id: bool) -> Self {
        Self {
            addresses: DashMap::new(),
            fallback_to_user_id,
        }
    }

    pub fn register(&self, user_id: impl Into<String>, channel: Channel, address: impl Into<String>) {
        self.addresses
            .insert((user_id.into(), channel), address.into());
    }

    pub fn remove(&self, user_id: &str, channel: Channel) -> Option<String> {
        self.addresses
            .remove(&(user_id.to_string(), channel))
            .map(|(_, address)| address)
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryRecipientDirectory {
    async fn address(&self, user_id: &str, channel: Channel) -> Option<String> {
        if channel == Channel::InApp {
            return Some(user_id.to_string());
        }

        if let Some(address) = self.addresses.get(&(user_id.to_string(), channel)) {
            return Some(address.value().clone());
        }

        self.fallback_to_user_id.then(|| user_id.to_string())
    }
}
