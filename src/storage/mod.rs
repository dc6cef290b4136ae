pub mod json_file;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Store keys used by the application. Every persisted collection lives
/// under exactly one of these.
pub mod keys {
    pub const MEETINGS: &str = "meetings";
    pub const REMINDERS: &str = "reminders";
    pub const GROUPS: &str = "groups";
    pub const ASSISTANT_CONFIG: &str = "assistant_config";
    pub const EXPANDED_GROUPS: &str = "expanded_groups";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value for `{key}` is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Async key-value blob store. Values are JSON documents; a `set` replaces
/// the whole value for a key, and writes are atomic per key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn del(&self, key: &str) -> Result<(), StoreError>;
}
