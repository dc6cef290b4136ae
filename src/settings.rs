use crate::storage::{keys, KeyValueStore};
use serde::{Deserialize, Serialize};

/// Assistant endpoint configuration, persisted in the store. Field
/// defaults keep old stored documents loadable as the struct grows.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub enabled: bool,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:11434/api/generate".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

pub fn get_default_config() -> AssistantConfig {
    AssistantConfig {
        endpoint: default_endpoint(),
        timeout_seconds: default_timeout_seconds(),
        enabled: false,
    }
}

/// Load the stored config, falling back to (and writing back) defaults
/// when the key is missing or fails to parse.
pub async fn load_or_create_config(store: &dyn KeyValueStore) -> AssistantConfig {
    match store.get(keys::ASSISTANT_CONFIG).await {
        Ok(Some(value)) => match serde_json::from_value::<AssistantConfig>(value) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to parse assistant config, using defaults: {}", e);
                let defaults = get_default_config();
                write_config(store, &defaults).await;
                defaults
            }
        },
        Ok(None) => {
            let defaults = get_default_config();
            write_config(store, &defaults).await;
            defaults
        }
        Err(e) => {
            log::warn!("Failed to read assistant config: {}", e);
            get_default_config()
        }
    }
}

pub async fn write_config(store: &dyn KeyValueStore, config: &AssistantConfig) {
    let value = match serde_json::to_value(config) {
        Ok(value) => value,
        Err(e) => {
            log::error!("Failed to serialize assistant config: {}", e);
            return;
        }
    };
    if let Err(e) = store.set(keys::ASSISTANT_CONFIG, value).await {
        log::error!("Failed to persist assistant config: {}", e);
    }
}
