use crate::debounce::Debouncer;
use crate::grouping::{self, Direction, GroupView};
use crate::storage::{keys, KeyValueStore};
use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Content edits are coalesced: only the newest edit inside this window is
/// persisted, so the store may lag the in-memory state by up to one interval.
const CONTENT_SAVE_DELAY: Duration = Duration::from_millis(800);

/// A single meeting document. The flat collection order is the canonical
/// ordering; `group` is an attribute of the meeting, not a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    /// Unique identifier, immutable once created
    pub id: String,
    pub title: String,
    /// User-facing meeting date, kept as entered
    pub date: String,
    /// Rich-text markup from the editor surface
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_time_notes: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    /// Name of the containing group; absent = ungrouped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Non-selectable visual separator record
    #[serde(default)]
    pub is_divider: bool,
    /// Unix millis
    #[serde(default)]
    pub created_at: i64,
    /// Unix millis
    #[serde(default)]
    pub updated_at: i64,
}

impl Meeting {
    pub fn new(title: &str, date: &str) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            date: date.to_string(),
            content: String::new(),
            notes: String::new(),
            next_time_notes: None,
            attendees: Vec::new(),
            group: None,
            is_divider: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for meeting metadata. Content goes through
/// `update_content` so the debounced save path stays in one place.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingUpdate {
    pub title: Option<String>,
    pub date: Option<String>,
    pub notes: Option<String>,
    pub next_time_notes: Option<String>,
    pub attendees: Option<Vec<String>>,
}

/// Owns the canonical ordered meeting collection and the group-order list,
/// including their persistence round-trips. In-memory state is updated
/// synchronously before any storage write, so callers always observe the
/// latest mutation regardless of storage latency.
pub struct MeetingManager {
    store: Arc<dyn KeyValueStore>,
    meetings: Arc<Mutex<Vec<Meeting>>>,
    group_order: Arc<Mutex<Vec<String>>>,
    content_save: Debouncer,
}

impl MeetingManager {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        Self::load_with_save_delay(store, CONTENT_SAVE_DELAY).await
    }

    /// `save_delay` is injectable so tests can exercise the coalescing
    /// window without waiting out the production interval.
    pub async fn load_with_save_delay(store: Arc<dyn KeyValueStore>, save_delay: Duration) -> Self {
        let meetings: Vec<Meeting> = read_collection(store.as_ref(), keys::MEETINGS).await;
        let stored_order: Vec<String> = read_collection(store.as_ref(), keys::GROUPS).await;

        let manager = Self {
            store,
            meetings: Arc::new(Mutex::new(meetings)),
            group_order: Arc::new(Mutex::new(stored_order)),
            content_save: Debouncer::new(save_delay),
        };
        manager.reconcile_groups().await;
        manager
    }

    pub async fn list(&self) -> Vec<Meeting> {
        self.meetings.lock().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Meeting> {
        self.meetings.lock().await.iter().find(|m| m.id == id).cloned()
    }

    pub async fn create(&self, title: &str, date: &str) -> Meeting {
        let meeting = Meeting::new(title, date);
        self.meetings.lock().await.push(meeting.clone());
        log::info!("Created meeting: {} (ID: {})", meeting.title, meeting.id);
        self.persist_meetings().await;
        meeting
    }

    /// Unknown ids are a no-op (`None`) to tolerate races with concurrent
    /// list mutations.
    pub async fn update(&self, id: &str, update: MeetingUpdate) -> Option<Meeting> {
        let mut meetings = self.meetings.lock().await;
        let meeting = meetings.iter_mut().find(|m| m.id == id)?;

        if let Some(title) = update.title {
            meeting.title = title;
        }
        if let Some(date) = update.date {
            meeting.date = date;
        }
        if let Some(notes) = update.notes {
            meeting.notes = notes;
        }
        if let Some(next_time_notes) = update.next_time_notes {
            meeting.next_time_notes = Some(next_time_notes);
        }
        if let Some(attendees) = update.attendees {
            meeting.attendees = attendees;
        }
        meeting.updated_at = Utc::now().timestamp_millis();

        let updated = meeting.clone();
        drop(meetings);
        self.persist_meetings().await;
        Some(updated)
    }

    /// Optimistic in-memory apply, then a debounced persistence pass: a
    /// newer edit cancels and reschedules the pending save.
    pub async fn update_content(&self, id: &str, content: String) -> bool {
        {
            let mut meetings = self.meetings.lock().await;
            let Some(meeting) = meetings.iter_mut().find(|m| m.id == id) else {
                return false;
            };
            meeting.content = content;
            meeting.updated_at = Utc::now().timestamp_millis();
        }

        let store = self.store.clone();
        let meetings = self.meetings.clone();
        self.content_save
            .schedule(async move {
                // Serialize at fire time so the save always carries the
                // newest state, not the state at schedule time.
                let snapshot = meetings.lock().await.clone();
                write_collection(store.as_ref(), keys::MEETINGS, &snapshot).await;
            })
            .await;
        true
    }

    pub async fn delete(&self, id: &str) -> bool {
        let removed = {
            let mut meetings = self.meetings.lock().await;
            let before = meetings.len();
            meetings.retain(|m| m.id != id);
            meetings.len() != before
        };
        if removed {
            log::info!("Deleted meeting: {}", id);
            self.persist_meetings().await;
        }
        removed
    }

    /// Wholesale replacement (the import path). Unlike the background save
    /// paths this propagates storage errors, since the caller has a user
    /// waiting on the result.
    pub async fn replace_all(&self, new_meetings: Vec<Meeting>) -> Result<()> {
        *self.meetings.lock().await = new_meetings;
        self.reconcile_groups().await;
        let snapshot = self.meetings.lock().await.clone();
        self.store
            .set(keys::MEETINGS, serde_json::to_value(&snapshot)?)
            .await?;
        Ok(())
    }

    pub async fn replace_group_order(&self, order: Vec<String>) -> Result<()> {
        *self.group_order.lock().await = order;
        self.reconcile_groups().await;
        let snapshot = self.group_order.lock().await.clone();
        self.store
            .set(keys::GROUPS, serde_json::to_value(&snapshot)?)
            .await?;
        Ok(())
    }

    /// Drag-and-drop relocation: may change both group membership and
    /// position. Unknown ids leave the collection untouched.
    pub async fn relocate(&self, id: &str, dest_group: Option<&str>, dest_index: usize) {
        let now = Utc::now().timestamp_millis();
        {
            let mut meetings = self.meetings.lock().await;
            *meetings = grouping::relocate(&meetings, id, dest_group, dest_index, now);
        }
        self.reconcile_groups().await;
        self.persist_meetings().await;
    }

    pub async fn move_group(&self, name: &str, direction: Direction) {
        {
            let mut order = self.group_order.lock().await;
            *order = grouping::move_group(&order, name, direction);
        }
        self.persist_groups().await;
    }

    pub async fn add_group(&self, name: &str) {
        let added = {
            let mut order = self.group_order.lock().await;
            if name.is_empty() || order.iter().any(|g| g == name) {
                false
            } else {
                order.push(name.to_string());
                true
            }
        };
        if added {
            self.persist_groups().await;
        }
    }

    /// Removes the group from the order list and ungroups its members.
    pub async fn remove_group(&self, name: &str) {
        {
            let mut meetings = self.meetings.lock().await;
            for meeting in meetings.iter_mut() {
                if meeting.group.as_deref() == Some(name) {
                    meeting.group = None;
                }
            }
        }
        {
            let mut order = self.group_order.lock().await;
            order.retain(|g| g != name);
        }
        self.persist_meetings().await;
        self.persist_groups().await;
    }

    pub async fn add_divider(&self, group: Option<&str>) -> Meeting {
        let divider = grouping::divider(group);
        self.meetings.lock().await.push(divider.clone());
        self.reconcile_groups().await;
        self.persist_meetings().await;
        divider
    }

    pub async fn grouped(&self) -> Vec<GroupView> {
        let meetings = self.meetings.lock().await;
        let order = self.group_order.lock().await;
        grouping::grouped_view(&meetings, &order)
    }

    pub async fn group_order(&self) -> Vec<String> {
        self.group_order.lock().await.clone()
    }

    /// Persisted UI state: which group sections the list shows expanded.
    pub async fn expanded_groups(&self) -> Vec<String> {
        read_collection(self.store.as_ref(), keys::EXPANDED_GROUPS).await
    }

    pub async fn set_expanded_groups(&self, expanded: Vec<String>) {
        write_collection(self.store.as_ref(), keys::EXPANDED_GROUPS, &expanded).await;
    }

    /// Self-healing step from the grouping contract: every group name
    /// referenced by a meeting must appear in the order list.
    async fn reconcile_groups(&self) {
        let changed = {
            let meetings = self.meetings.lock().await;
            let mut order = self.group_order.lock().await;
            let reconciled = grouping::reconcile_group_order(&meetings, &order);
            if reconciled.len() == order.len() {
                false
            } else {
                *order = reconciled;
                true
            }
        };
        if changed {
            self.persist_groups().await;
        }
    }

    async fn persist_meetings(&self) {
        let snapshot = self.meetings.lock().await.clone();
        write_collection(self.store.as_ref(), keys::MEETINGS, &snapshot).await;
    }

    async fn persist_groups(&self) {
        let snapshot = self.group_order.lock().await.clone();
        write_collection(self.store.as_ref(), keys::GROUPS, &snapshot).await;
    }

    /// Cancels any pending debounced save. Best-effort: an edit inside the
    /// coalescing window at teardown is not flushed.
    pub async fn shutdown(&self) {
        self.content_save.cancel().await;
        log::info!("MeetingManager shutdown complete");
    }
}

/// Missing or unreadable collections fall back to empty: there is no UI
/// affordance for background-load recovery, so this is log-only.
async fn read_collection<T: serde::de::DeserializeOwned + Default>(
    store: &dyn KeyValueStore,
    key: &str,
) -> T {
    match store.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Failed to parse stored `{}`: {}", key, e);
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("Failed to read `{}` from store: {}", key, e);
            T::default()
        }
    }
}

async fn write_collection<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let value = match serde_json::to_value(value) {
        Ok(value) => value,
        Err(e) => {
            log::error!("Failed to serialize `{}`: {}", key, e);
            return;
        }
    };
    if let Err(e) = store.set(key, value).await {
        log::error!("Failed to persist `{}`: {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    async fn test_manager() -> MeetingManager {
        MeetingManager::load_with_save_delay(
            Arc::new(MemoryStore::new()),
            Duration::from_millis(20),
        )
        .await
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let manager = test_manager().await;

        let meeting = manager.create("Weekly sync", "2026-08-07").await;
        assert_eq!(manager.list().await.len(), 1);

        let fetched = manager.get(&meeting.id).await.unwrap();
        assert_eq!(fetched.title, "Weekly sync");

        let updated = manager
            .update(
                &meeting.id,
                MeetingUpdate {
                    title: Some("Weekly sync (moved)".to_string()),
                    attendees: Some(vec!["Ana".to_string(), "Bob".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Weekly sync (moved)");
        assert_eq!(updated.attendees.len(), 2);
        assert_eq!(updated.id, meeting.id);

        assert!(manager.delete(&meeting.id).await);
        assert!(manager.get(&meeting.id).await.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_noop() {
        let manager = test_manager().await;
        let result = manager
            .update(
                "missing",
                MeetingUpdate {
                    title: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(result.is_none());
        assert!(!manager.delete("missing").await);
    }

    #[tokio::test]
    async fn test_content_edits_are_coalesced() {
        let store = Arc::new(MemoryStore::new());
        let manager =
            MeetingManager::load_with_save_delay(store.clone(), Duration::from_millis(30)).await;
        let meeting = manager.create("Notes", "2026-08-07").await;

        assert!(manager.update_content(&meeting.id, "<p>draft one</p>".to_string()).await);
        assert!(manager.update_content(&meeting.id, "<p>draft two</p>".to_string()).await);

        // In-memory state reflects the latest edit immediately.
        assert_eq!(manager.get(&meeting.id).await.unwrap().content, "<p>draft two</p>");

        tokio::time::sleep(Duration::from_millis(120)).await;

        let stored = store.get(keys::MEETINGS).await.unwrap().unwrap();
        let stored: Vec<Meeting> = serde_json::from_value(stored).unwrap();
        assert_eq!(stored[0].content, "<p>draft two</p>");
    }

    #[tokio::test]
    async fn test_update_content_unknown_id() {
        let manager = test_manager().await;
        assert!(!manager.update_content("missing", "<p>x</p>".to_string()).await);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_save() {
        let store = Arc::new(MemoryStore::new());
        let manager =
            MeetingManager::load_with_save_delay(store.clone(), Duration::from_millis(40)).await;
        let meeting = manager.create("Notes", "2026-08-07").await;

        manager.update_content(&meeting.id, "<p>unsaved</p>".to_string()).await;
        manager.shutdown().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let stored = store.get(keys::MEETINGS).await.unwrap().unwrap();
        let stored: Vec<Meeting> = serde_json::from_value(stored).unwrap();
        // The edit inside the coalescing window was dropped at teardown.
        assert_eq!(stored[0].content, "");
    }

    #[tokio::test]
    async fn test_groups_self_heal_from_membership() {
        let store = Arc::new(MemoryStore::new());
        let manager =
            MeetingManager::load_with_save_delay(store.clone(), Duration::from_millis(20)).await;

        let meeting = manager.create("Planning", "2026-08-07").await;
        manager.relocate(&meeting.id, Some("Team"), 0).await;

        assert_eq!(manager.group_order().await, vec!["Team".to_string()]);
        assert_eq!(
            manager.get(&meeting.id).await.unwrap().group.as_deref(),
            Some("Team")
        );

        // A reload from the same store sees the healed order list.
        let reloaded =
            MeetingManager::load_with_save_delay(store, Duration::from_millis(20)).await;
        assert_eq!(reloaded.group_order().await, vec!["Team".to_string()]);
    }

    #[tokio::test]
    async fn test_add_and_remove_group() {
        let manager = test_manager().await;
        manager.add_group("Team").await;
        manager.add_group("Team").await; // duplicate is a no-op
        manager.add_group("").await; // empty name is a no-op
        assert_eq!(manager.group_order().await, vec!["Team".to_string()]);

        let meeting = manager.create("Retro", "2026-08-07").await;
        manager.relocate(&meeting.id, Some("Team"), 0).await;

        manager.remove_group("Team").await;
        assert!(manager.group_order().await.is_empty());
        assert!(manager.get(&meeting.id).await.unwrap().group.is_none());
    }

    #[tokio::test]
    async fn test_add_divider_is_appended_and_flagged() {
        let manager = test_manager().await;
        manager.create("A", "2026-08-07").await;
        let divider = manager.add_divider(None).await;

        let list = manager.list().await;
        assert_eq!(list.last().unwrap().id, divider.id);
        assert!(list.last().unwrap().is_divider);
        assert!(list.last().unwrap().content.is_empty());
    }

    #[tokio::test]
    async fn test_expanded_groups_roundtrip() {
        let manager = test_manager().await;
        assert!(manager.expanded_groups().await.is_empty());
        manager
            .set_expanded_groups(vec!["Team".to_string(), "1:1s".to_string()])
            .await;
        assert_eq!(
            manager.expanded_groups().await,
            vec!["Team".to_string(), "1:1s".to_string()]
        );
    }

    #[tokio::test]
    async fn test_load_tolerates_corrupt_collection() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(keys::MEETINGS, serde_json::json!({"not": "an array"}))
            .await
            .unwrap();
        let manager = MeetingManager::load(store).await;
        assert!(manager.list().await.is_empty());
    }
}
