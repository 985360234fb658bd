//! The per-user notification feed on top of a record store.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::backend::{FeedStoreError, NotificationStore};
use super::filter::{compute_stats, paginate};
use super::types::{FeedFilter, FeedPage, FeedStats, NotificationRecord};

#[derive(Clone)]
pub struct NotificationFeed {
    store: Arc<dyn NotificationStore>,
}

impl NotificationFeed {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub fn backend_type(&self) -> &'static str {
        self.store.backend_type()
    }

    /// Persist a delivery record
    pub async fn record(&self, record: NotificationRecord) -> Result<(), FeedStoreError> {
        self.store.insert(record).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<NotificationRecord>, FeedStoreError> {
        self.store.get(id).await
    }

    /// Visible records of a user matching `filter`, newest first
    pub async fn list(
        &self,
        user_id: &str,
        filter: &FeedFilter,
    ) -> Result<Vec<NotificationRecord>, FeedStoreError> {
        Ok(self.page(user_id, filter).await?.notifications)
    }

    /// Like [`list`](Self::list), with the number of matches before pagination
    pub async fn page(&self, user_id: &str, filter: &FeedFilter) -> Result<FeedPage, FeedStoreError> {
        let records = self.store.list_for_user(user_id).await?;
        Ok(paginate(records, filter, Utc::now()))
    }

    /// Mark one record read. True when the record exists, also when it was
    /// already read.
    #[tracing::instrument(name = "feed.mark_read", skip(self))]
    pub async fn mark_read(&self, id: Uuid) -> Result<bool, FeedStoreError> {
        self.store.mark_read(id, Utc::now()).await
    }

    /// Mark every visible unread record of the user read; returns how many flipped
    #[tracing::instrument(name = "feed.mark_all_read", skip(self))]
    pub async fn mark_all_read(&self, user_id: &str) -> Result<usize, FeedStoreError> {
        let flipped = self.store.mark_all_read(user_id, Utc::now()).await?;
        tracing::debug!(user_id = %user_id, count = flipped, "Marked notifications read");
        Ok(flipped)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, FeedStoreError> {
        self.store.delete(id).await
    }

    /// Counters recomputed from the stored records
    pub async fn stats(&self, user_id: &str) -> Result<FeedStats, FeedStoreError> {
        let records = self.store.list_for_user(user_id).await?;
        Ok(compute_stats(&records))
    }

    /// All records of one dispatch, including failed and hidden ones
    pub async fn deliveries(&self, event_id: Uuid) -> Result<Vec<NotificationRecord>, FeedStoreError> {
        self.store.list_for_event(event_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::{DeliveryStatus, FeedTab};
    use crate::feed::MemoryNotificationStore;
    use crate::notification::{Channel, Priority};

    fn record(channel: Channel, status: DeliveryStatus, priority: Priority) -> NotificationRecord {
        NotificationRecord {
            id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            user_id: "user-1".to_string(),
            event_type: "invoices.overdue".to_string(),
            channel,
            priority,
            title: "Invoice overdue".to_string(),
            message: "INV-1".to_string(),
            status,
            error: None,
            created_at: Utc::now(),
            read: false,
            read_at: None,
            related_entity_id: None,
            related_entity_type: None,
        }
    }

    fn feed() -> NotificationFeed {
        NotificationFeed::new(Arc::new(MemoryNotificationStore::new()))
    }

    #[tokio::test]
    async fn test_mark_all_read_counts_visible_unread_only() {
        let feed = feed();
        let visible = record(Channel::InApp, DeliveryStatus::Delivered, Priority::High);
        let hidden = record(Channel::Sms, DeliveryStatus::Failed, Priority::High);
        let hidden_id = hidden.id;
        feed.record(visible).await.unwrap();
        feed.record(record(Channel::Email, DeliveryStatus::Delivered, Priority::Low))
            .await
            .unwrap();
        feed.record(hidden).await.unwrap();

        assert_eq!(feed.mark_all_read("user-1").await.unwrap(), 2);
        assert_eq!(feed.mark_all_read("user-1").await.unwrap(), 0);
        assert!(!feed.get(hidden_id).await.unwrap().unwrap().read);

        let stats = feed.stats("user-1").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.unread, 0);
        assert_eq!(stats.read, 2);
    }

    #[tokio::test]
    async fn test_mark_read_idempotent_and_unknown() {
        let feed = feed();
        let r = record(Channel::InApp, DeliveryStatus::Delivered, Priority::Medium);
        let id = r.id;
        feed.record(r).await.unwrap();

        assert!(feed.mark_read(id).await.unwrap());
        assert!(feed.mark_read(id).await.unwrap());
        assert!(!feed.mark_read(Uuid::new_v4()).await.unwrap());

        let unread = FeedFilter {
            tab: FeedTab::Unread,
            ..FeedFilter::default()
        };
        assert!(feed.list("user-1", &unread).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deliveries_include_hidden_records() {
        let feed = feed();
        feed.record(record(Channel::InApp, DeliveryStatus::Delivered, Priority::High))
            .await
            .unwrap();
        feed.record(record(Channel::Sms, DeliveryStatus::Failed, Priority::High))
            .await
            .unwrap();

        assert_eq!(feed.deliveries(Uuid::nil()).await.unwrap().len(), 2);
        assert_eq!(feed.list("user-1", &FeedFilter::default()).await.unwrap().len(), 1);
    }
}
