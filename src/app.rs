use crate::action_items::{self, ActionItem};
use crate::assistant::AssistantClient;
use crate::managers::actions::ActionItemManager;
use crate::managers::meeting::{Meeting, MeetingManager};
use crate::managers::reminder::ReminderManager;
use crate::search;
use crate::settings::{self, AssistantConfig};
use crate::storage::KeyValueStore;
use crate::transfer;
use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub meetings: usize,
    pub reminders: usize,
    pub groups: usize,
}

/// Wires the store and the managers together and carries the edit flow:
/// editor content lands here, the repository applies it, the action-item
/// collection is re-derived, and the display copy is annotated on the way
/// back out. The embedding UI shell talks to this type only.
pub struct App {
    store: Arc<dyn KeyValueStore>,
    pub meetings: MeetingManager,
    pub reminders: ReminderManager,
    pub action_items: ActionItemManager,
    assistant_config: Mutex<AssistantConfig>,
}

impl App {
    pub async fn init(store: Arc<dyn KeyValueStore>) -> Self {
        let assistant_config = settings::load_or_create_config(store.as_ref()).await;
        let meetings = MeetingManager::load(store.clone()).await;
        let reminders = ReminderManager::load(store.clone()).await;
        let action_items = ActionItemManager::new();

        let app = Self {
            store,
            meetings,
            reminders,
            action_items,
            assistant_config: Mutex::new(assistant_config),
        };
        app.derive_all_action_items().await;
        app
    }

    /// The action-item collection is derived state; rebuild it from the
    /// loaded documents.
    async fn derive_all_action_items(&self) {
        let now = Utc::now();
        self.action_items.clear().await;
        for meeting in self.meetings.list().await {
            if !meeting.is_divider {
                self.action_items
                    .sync_meeting(&meeting.id, &meeting.content, now)
                    .await;
            }
        }
    }

    /// Editor change event: optimistic repository update with debounced
    /// persistence, then re-derive this meeting's action items. Returns
    /// the meeting's current items; unknown ids are a no-op.
    pub async fn edit_content(&self, meeting_id: &str, content: String) -> Vec<ActionItem> {
        if !self.meetings.update_content(meeting_id, content.clone()).await {
            return Vec::new();
        }
        self.action_items
            .sync_meeting(meeting_id, &content, Utc::now())
            .await
    }

    /// The display copy of a meeting's content, with completed action
    /// items annotated. The canonical stored content is never rewritten.
    pub async fn rendered_content(&self, meeting_id: &str) -> Option<String> {
        let meeting = self.meetings.get(meeting_id).await?;
        let completed = self.action_items.completed_for(meeting_id).await;
        Some(action_items::annotate(&meeting.content, &completed, Utc::now()))
    }

    pub async fn toggle_action_item(&self, id: &str) -> Option<ActionItem> {
        self.action_items.toggle(id, Utc::now()).await
    }

    pub async fn delete_meeting(&self, id: &str) -> bool {
        let removed = self.meetings.delete(id).await;
        if removed {
            self.action_items.remove_meeting(id).await;
        }
        removed
    }

    pub async fn search(&self, query: &str) -> Vec<Meeting> {
        let meetings = self.meetings.list().await;
        search::search(&meetings, query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn export_json(&self) -> Result<String> {
        let meetings = self.meetings.list().await;
        let reminders = self.reminders.list().await;
        let groups = self.meetings.group_order().await;
        transfer::export_json(&meetings, &reminders, &groups)
    }

    /// Full replacement import. Validation happens before any store
    /// mutation; a rejected file leaves every collection untouched.
    pub async fn import_json(&self, raw: &str) -> Result<ImportSummary> {
        let document = transfer::parse_import(raw)?;
        let summary = ImportSummary {
            meetings: document.meetings.len(),
            reminders: document.reminders.len(),
            groups: document.groups.as_ref().map_or(0, Vec::len),
        };

        self.meetings.replace_all(document.meetings).await?;
        self.reminders.replace_all(document.reminders).await?;
        if let Some(groups) = document.groups {
            self.meetings.replace_group_order(groups).await?;
        }
        self.derive_all_action_items().await;

        log::info!(
            "Imported {} meetings, {} reminders, {} groups",
            summary.meetings,
            summary.reminders,
            summary.groups
        );
        Ok(summary)
    }

    pub async fn assistant_config(&self) -> AssistantConfig {
        self.assistant_config.lock().await.clone()
    }

    pub async fn set_assistant_config(&self, config: AssistantConfig) {
        settings::write_config(self.store.as_ref(), &config).await;
        *self.assistant_config.lock().await = config;
    }

    /// Errors come back as a single displayable message, categorized by
    /// what went wrong; they never propagate as panics into the shell.
    pub async fn ask_assistant(&self, prompt: &str) -> Result<String> {
        let config = self.assistant_config.lock().await.clone();
        if !config.enabled {
            return Err(anyhow!("Assistant is disabled in settings"));
        }
        let client = AssistantClient::new(config)?;
        Ok(client.generate(prompt).await?)
    }

    /// Best-effort teardown: pending debounced saves are cancelled, not
    /// flushed.
    pub async fn shutdown(&self) {
        self.meetings.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::storage::keys;

    async fn test_app() -> App {
        App::init(Arc::new(MemoryStore::new())).await
    }

    #[tokio::test]
    async fn test_edit_flow_extracts_and_annotates() {
        let app = test_app().await;
        let meeting = app.meetings.create("Standup", "2026-08-07").await;

        let items = app
            .edit_content(&meeting.id, "Buy milk AI: call Bob".to_string())
            .await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "call Bob");
        assert!(!items[0].completed);

        let toggled = app.toggle_action_item(&items[0].id).await.unwrap();
        assert!(toggled.completed);
        assert!(toggled.completed_at.is_some());

        let rendered = app.rendered_content(&meeting.id).await.unwrap();
        assert!(rendered.starts_with("Buy milk Done "));
        assert!(rendered.ends_with(": call Bob"));

        // The canonical content still carries the marker.
        let canonical = app.meetings.get(&meeting.id).await.unwrap().content;
        assert_eq!(canonical, "Buy milk AI: call Bob");

        // Editing again with the same content keeps the completed state.
        let resynced = app
            .edit_content(&meeting.id, "Buy milk AI: call Bob".to_string())
            .await;
        assert_eq!(resynced.len(), 1);
        assert!(resynced[0].completed);
    }

    #[tokio::test]
    async fn test_edit_unknown_meeting_is_noop() {
        let app = test_app().await;
        assert!(app.edit_content("missing", "AI: x".to_string()).await.is_empty());
        assert!(app.rendered_content("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_startup_derives_items_from_stored_documents() {
        let store = Arc::new(MemoryStore::new());
        {
            let app = App::init(store.clone()).await;
            let meeting = app.meetings.create("Standup", "2026-08-07").await;
            app.edit_content(&meeting.id, "<p>AI: send recap</p>".to_string())
                .await;
            // Flush the coalescing window so the content is on disk.
            tokio::time::sleep(std::time::Duration::from_millis(900)).await;
        }

        let reopened = App::init(store).await;
        let meetings = reopened.meetings.list().await;
        assert_eq!(meetings.len(), 1);
        let items = reopened.action_items.items_for(&meetings[0].id).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "send recap");
    }

    #[tokio::test]
    async fn test_delete_meeting_drops_its_items() {
        let app = test_app().await;
        let meeting = app.meetings.create("Standup", "2026-08-07").await;
        app.edit_content(&meeting.id, "AI: one".to_string()).await;

        assert!(app.delete_meeting(&meeting.id).await);
        assert!(app.action_items.all().await.is_empty());
        assert!(!app.delete_meeting(&meeting.id).await);
    }

    #[tokio::test]
    async fn test_import_replaces_collections_and_rederives() {
        let app = test_app().await;
        let old = app.meetings.create("Old", "2026-01-01").await;
        app.edit_content(&old.id, "AI: stale item".to_string()).await;

        let raw = r#"{
            "meetings": [
                {"id": "m1", "title": "Imported", "date": "2026-08-01",
                 "content": "<p>AI: ship release</p>", "group": "Team"}
            ],
            "reminders": [],
            "groups": ["Team"]
        }"#;
        let summary = app.import_json(raw).await.unwrap();
        assert_eq!(summary.meetings, 1);
        assert_eq!(summary.groups, 1);

        let meetings = app.meetings.list().await;
        assert_eq!(meetings.len(), 1);
        assert_eq!(meetings[0].id, "m1");
        assert_eq!(app.meetings.group_order().await, vec!["Team".to_string()]);

        let items = app.action_items.items_for("m1").await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "ship release");
        // The old meeting's partition is gone with the old collection.
        assert!(app.action_items.items_for(&old.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_import_leaves_state_untouched() {
        let store = Arc::new(MemoryStore::new());
        let app = App::init(store.clone()).await;
        app.meetings.create("Keep me", "2026-08-07").await;

        let raw = r#"{"meetings": [{"id": "1", "title": "A"}], "reminders": []}"#;
        assert!(app.import_json(raw).await.is_err());

        assert_eq!(app.meetings.list().await.len(), 1);
        assert_eq!(app.meetings.list().await[0].title, "Keep me");

        let stored = store.get(keys::MEETINGS).await.unwrap().unwrap();
        let stored: Vec<Meeting> = serde_json::from_value(stored).unwrap();
        assert_eq!(stored[0].title, "Keep me");
    }

    #[tokio::test]
    async fn test_search_skips_dividers() {
        let app = test_app().await;
        let meeting = app.meetings.create("Budget review", "2026-08-07").await;
        app.edit_content(&meeting.id, "<p>forecast numbers</p>".to_string())
            .await;
        app.meetings.add_divider(None).await;

        assert_eq!(app.search("forecast").await.len(), 1);
        assert!(app.search("").await.is_empty());
    }

    #[tokio::test]
    async fn test_assistant_disabled_by_default() {
        let app = test_app().await;
        let err = app.ask_assistant("hello").await.unwrap_err();
        assert!(err.to_string().contains("disabled"));

        let mut config = app.assistant_config().await;
        config.enabled = true;
        app.set_assistant_config(config.clone()).await;
        assert!(app.assistant_config().await.enabled);
    }
}
