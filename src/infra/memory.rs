use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::app::notifications::NotificationStore;
use crate::domain::notification::{Acknowledgement, NewNotification, Notification, Owner};

/// In-process store. Ordered by id so listings follow creation order.
#[derive(Clone, Default)]
pub struct MemoryNotificationStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: BTreeMap<i64, Notification>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored record, read or not.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner.lock().rows.values().cloned().collect()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, new: NewNotification) -> Result<Notification> {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let notification = Notification {
            id: inner.next_id,
            owner: new.owner,
            message: new.message,
            fadeout: new.fadeout,
            delete_after_read: new.delete_after_read,
            is_read: false,
            created_at: OffsetDateTime::now_utc(),
            read_at: None,
        };
        inner.rows.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_unread(&self, owner: &Owner) -> Result<Vec<Notification>> {
        let inner = self.inner.lock();
        Ok(inner
            .rows
            .values()
            .filter(|n| !n.is_read && &n.owner == owner)
            .cloned()
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Notification>> {
        Ok(self.inner.lock().rows.get(&id).cloned())
    }

    async fn get_policy(&self, id: i64) -> Result<Option<bool>> {
        Ok(self.inner.lock().rows.get(&id).map(|n| n.delete_after_read))
    }

    async fn acknowledge(&self, id: i64) -> Result<Acknowledgement> {
        let mut inner = self.inner.lock();
        let delete = match inner.rows.get_mut(&id) {
            None => return Ok(Acknowledgement::NotFound),
            Some(n) if n.delete_after_read => true,
            Some(n) => {
                n.is_read = true;
                n.read_at.get_or_insert_with(OffsetDateTime::now_utc);
                false
            }
        };

        if delete {
            inner.rows.remove(&id);
            Ok(Acknowledgement::Deleted)
        } else {
            Ok(Acknowledgement::MarkedRead)
        }
    }

    async fn purge_read(&self, before: OffsetDateTime) -> Result<u64> {
        let mut inner = self.inner.lock();
        let before_len = inner.rows.len();
        inner
            .rows
            .retain(|_, n| !(n.is_read && n.read_at.map_or(false, |at| at < before)));
        Ok((before_len - inner.rows.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
