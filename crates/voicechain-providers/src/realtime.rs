//! Realtime session control.
//!
//! Mints short-lived client secrets for the browser streaming façade (the
//! long-lived key never leaves the backend) and terminates streaming calls
//! server-side.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_REALTIME_MODEL: &str = "gpt-realtime";

/// Failure of a realtime control call. Upstream HTTP status is preserved so
/// callers can propagate it.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("realtime API error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("realtime API unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct RealtimeControl {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ClientSecretResponse {
    value: String,
}

impl RealtimeControl {
    pub fn new(api_key: String, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: DEFAULT_REALTIME_MODEL.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Mint an ephemeral client secret for one streaming session.
    pub async fn mint_client_secret(&self) -> Result<String, RealtimeError> {
        let resp = self
            .client
            .post(format!("{}/v1/realtime/client_secrets", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "session": {
                    "type": "realtime",
                    "model": self.model,
                }
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RealtimeError::Upstream { status, body });
        }

        let secret: ClientSecretResponse = resp.json().await?;
        debug!("Minted realtime client secret");
        Ok(secret.value)
    }

    /// Terminate a streaming call server-side.
    pub async fn hangup(&self, call_id: &str) -> Result<(), RealtimeError> {
        let resp = self
            .client
            .post(format!(
                "{}/v1/realtime/calls/{call_id}/hangup",
                self.base_url
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RealtimeError::Upstream { status, body });
        }

        info!(call_id, "Hung up realtime call");
        Ok(())
    }
}
