//! In-memory notification store backed by DashMap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::backend::{FeedStoreError, NotificationStore};
use super::filter::sort_newest_first;
use super::types::NotificationRecord;

#[derive(Default)]
pub struct MemoryNotificationStore {
    records: DashMap<Uuid, NotificationRecord>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, record: NotificationRecord) -> Result<(), FeedStoreError> {
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<NotificationRecord>, FeedStoreError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationRecord>, FeedStoreError> {
        let mut records: Vec<NotificationRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<NotificationRecord>, FeedStoreError> {
        let mut records: Vec<NotificationRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().event_id == event_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.channel);
        Ok(records)
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, FeedStoreError> {
        match self.records.get_mut(&id) {
            Some(mut record) => {
                record.mark_read(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<usize, FeedStoreError> {
        let mut flipped = 0;
        for mut entry in self.records.iter_mut() {
            let record = entry.value_mut();
            if record.user_id == user_id && record.is_visible() && record.mark_read(at) {
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, FeedStoreError> {
        Ok(self.records.remove(&id).is_some())
    }
}
