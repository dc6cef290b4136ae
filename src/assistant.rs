use crate::settings::AssistantConfig;
use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Response field names the local text-generation backends use for the
/// generated text, probed in order.
const RESPONSE_TEXT_KEYS: &[&str] = &["response", "text", "output", "completion", "content"];

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

/// Request failures, categorized by what the user can do about them. The
/// `Display` impl is the message the UI shows; nothing here ever crashes
/// the caller.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Assistant endpoint rejected the request; check its access settings")]
    Auth,
    #[error("Assistant endpoint not found; check the configured URL")]
    NotFound,
    #[error("Assistant backend is unavailable; is the local model server running?")]
    Upstream,
    #[error("Assistant request failed with status {0}")]
    Status(u16),
    #[error("Could not reach the assistant endpoint: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Assistant response contained no text")]
    EmptyResponse,
}

pub struct AssistantClient {
    client: reqwest::Client,
    config: AssistantConfig,
}

impl AssistantClient {
    pub fn new(config: AssistantConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| anyhow!("Failed to build assistant HTTP client: {}", e))?;
        Ok(Self { client, config })
    }

    /// Single request/response contract: POST `{ "prompt": ... }`, read the
    /// generated text back out of whichever field the backend used.
    pub async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        log::info!("Calling assistant endpoint: {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&GenerateRequest { prompt })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(categorize_status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        extract_text(&body).ok_or(AssistantError::EmptyResponse)
    }
}

fn categorize_status(status: u16) -> AssistantError {
    match status {
        401 | 403 => AssistantError::Auth,
        404 => AssistantError::NotFound,
        502 | 503 | 504 => AssistantError::Upstream,
        other => AssistantError::Status(other),
    }
}

/// Probe the alternate response shapes the backends produce.
fn extract_text(body: &Value) -> Option<String> {
    for key in RESPONSE_TEXT_KEYS {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}
