use crate::storage::{keys, KeyValueStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    /// Reminders can be free-standing or attached to a meeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<String>,
    pub message: String,
    pub remind_at: DateTime<Utc>,
    #[serde(default)]
    pub dismissed: bool,
    pub created_at: DateTime<Utc>,
}

/// Simple store-backed CRUD; id uniqueness is the only invariant.
pub struct ReminderManager {
    store: Arc<dyn KeyValueStore>,
    reminders: Arc<Mutex<Vec<Reminder>>>,
}

impl ReminderManager {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let reminders = match store.get(keys::REMINDERS).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::warn!("Failed to parse stored reminders: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to read reminders from store: {}", e);
                Vec::new()
            }
        };
        Self {
            store,
            reminders: Arc::new(Mutex::new(reminders)),
        }
    }

    pub async fn list(&self) -> Vec<Reminder> {
        self.reminders.lock().await.clone()
    }

    pub async fn create(
        &self,
        message: &str,
        remind_at: DateTime<Utc>,
        meeting_id: Option<&str>,
    ) -> Reminder {
        let reminder = Reminder {
            id: Uuid::new_v4().to_string(),
            meeting_id: meeting_id.map(|id| id.to_string()),
            message: message.to_string(),
            remind_at,
            dismissed: false,
            created_at: Utc::now(),
        };
        self.reminders.lock().await.push(reminder.clone());
        self.persist().await;
        reminder
    }

    /// Reminders due at `now`: past their trigger time and not dismissed.
    pub async fn due(&self, now: DateTime<Utc>) -> Vec<Reminder> {
        self.reminders
            .lock()
            .await
            .iter()
            .filter(|r| !r.dismissed && r.remind_at <= now)
            .cloned()
            .collect()
    }

    pub async fn dismiss(&self, id: &str) -> bool {
        let dismissed = {
            let mut reminders = self.reminders.lock().await;
            match reminders.iter_mut().find(|r| r.id == id) {
                Some(reminder) => {
                    reminder.dismissed = true;
                    true
                }
                None => false,
            }
        };
        if dismissed {
            self.persist().await;
        }
        dismissed
    }

    pub async fn delete(&self, id: &str) -> bool {
        let removed = {
            let mut reminders = self.reminders.lock().await;
            let before = reminders.len();
            reminders.retain(|r| r.id != id);
            reminders.len() != before
        };
        if removed {
            self.persist().await;
        }
        removed
    }

    /// Import path: full replacement, storage errors propagated.
    pub async fn replace_all(&self, new_reminders: Vec<Reminder>) -> Result<()> {
        *self.reminders.lock().await = new_reminders;
        let snapshot = self.reminders.lock().await.clone();
        self.store
            .set(keys::REMINDERS, serde_json::to_value(&snapshot)?)
            .await?;
        Ok(())
    }

    async fn persist(&self) {
        let snapshot = self.reminders.lock().await.clone();
        let value = match serde_json::to_value(&snapshot) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Failed to serialize reminders: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(keys::REMINDERS, value).await {
            log::error!("Failed to persist reminders: {}", e);
        }
    }
}
