//! Remote chained-processing delegate.
//!
//! Speaks the same `/api/chained/process` JSON contract as the local
//! pipeline. The orchestrator tries it first when configured and falls back
//! to local processing on any failure.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::orchestrator::TurnOutcome;

pub struct ChainedDelegate {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DelegateRequest<'a> {
    audio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DelegateResponse {
    transcription: String,
    ai_response: String,
    audio: String,
}

impl ChainedDelegate {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Delegate one whole turn. Any failure (transport, status, decode) is
    /// reported to the caller, which falls back to local processing.
    pub async fn process(
        &self,
        session_id: &str,
        audio: &[u8],
        instructions: Option<&str>,
        voice: Option<&str>,
    ) -> anyhow::Result<TurnOutcome> {
        debug!(base_url = %self.base_url, "Delegating chained turn");

        let resp = self
            .client
            .post(format!("{}/api/chained/process", self.base_url))
            .json(&DelegateRequest {
                audio: BASE64.encode(audio),
                instructions,
                voice,
                session_id,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("delegate returned {status}: {body}");
        }

        let body: DelegateResponse = resp.json().await?;
        let audio = BASE64.decode(&body.audio)?;
        Ok(TurnOutcome {
            transcription: body.transcription,
            ai_response: body.ai_response,
            audio,
            session_id: session_id.to_string(),
        })
    }
}
