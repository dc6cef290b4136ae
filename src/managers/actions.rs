use crate::action_items::{self, ActionItem};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns the derived action-item collection, partitioned by meeting id.
/// A sync replaces exactly one meeting's partition and leaves every other
/// partition untouched. The collection is derived from meeting content and
/// is not persisted; it is rebuilt from the documents on startup.
pub struct ActionItemManager {
    items: Arc<Mutex<Vec<ActionItem>>>,
}

impl ActionItemManager {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Re-derive one meeting's items from its current content.
    pub async fn sync_meeting(
        &self,
        meeting_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Vec<ActionItem> {
        let mut items = self.items.lock().await;
        let existing: Vec<ActionItem> = items
            .iter()
            .filter(|item| item.meeting_id == meeting_id)
            .cloned()
            .collect();
        let updated = action_items::sync(content, &existing, meeting_id, now);

        items.retain(|item| item.meeting_id != meeting_id);
        items.extend(updated.iter().cloned());
        updated
    }

    pub async fn all(&self) -> Vec<ActionItem> {
        self.items.lock().await.clone()
    }

    pub async fn items_for(&self, meeting_id: &str) -> Vec<ActionItem> {
        self.items
            .lock()
            .await
            .iter()
            .filter(|item| item.meeting_id == meeting_id)
            .cloned()
            .collect()
    }

    pub async fn completed_for(&self, meeting_id: &str) -> Vec<ActionItem> {
        self.items
            .lock()
            .await
            .iter()
            .filter(|item| item.meeting_id == meeting_id && item.completed)
            .cloned()
            .collect()
    }

    /// Explicit user action; a content re-scan never goes through here.
    pub async fn toggle(&self, id: &str, now: DateTime<Utc>) -> Option<ActionItem> {
        let mut items = self.items.lock().await;
        *items = action_items::toggle(&items, id, now);
        items.iter().find(|item| item.id == id).cloned()
    }

    /// Drops the partition of a deleted meeting.
    pub async fn remove_meeting(&self, meeting_id: &str) {
        self.items
            .lock()
            .await
            .retain(|item| item.meeting_id != meeting_id);
    }

    pub async fn clear(&self) {
        self.items.lock().await.clear();
    }
}

impl Default for ActionItemManager {
    fn default() -> Self {
        Self::new()
    }
}
