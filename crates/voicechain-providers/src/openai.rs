//! OpenAI implementation of the three chained speech calls.
//!
//! Endpoints: `/v1/audio/transcriptions` (multipart), `/v1/chat/completions`,
//! `/v1/audio/speech`. All three use bearer-token auth against the same base
//! URL.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use voicechain_core::config::{COMPLETION_MAX_TOKENS, COMPLETION_TEMPERATURE};
use voicechain_core::{Result, Stage, VoicechainError};

use crate::SpeechProvider;

const OPENAI_BASE_URL: &str = "https://api.openai.com";

const DEFAULT_STT_MODEL: &str = "whisper-1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TTS_MODEL: &str = "tts-1";

pub struct OpenAiSpeechClient {
    base_url: String,
    api_key: String,
    stt_model: String,
    chat_model: String,
    tts_model: String,
    client: reqwest::Client,
}

impl OpenAiSpeechClient {
    pub fn new(api_key: String, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            stt_model: DEFAULT_STT_MODEL.into(),
            chat_model: DEFAULT_CHAT_MODEL.into(),
            tts_model: DEFAULT_TTS_MODEL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build a client from provider config, resolving the API key.
    pub fn from_config(config: &voicechain_core::config::ProviderConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            VoicechainError::Config("OpenAI API key not configured".to_string())
        })?;
        let mut client = Self::new(api_key, config.base_url.as_deref());
        if let Some(m) = &config.stt_model {
            client.stt_model = m.clone();
        }
        if let Some(m) = &config.chat_model {
            client.chat_model = m.clone();
        }
        if let Some(m) = &config.tts_model {
            client.tts_model = m.clone();
        }
        Ok(client)
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Map a failed response to a stage-tagged error with the upstream body
/// embedded.
async fn stage_error(stage: Stage, resp: reqwest::Response) -> VoicechainError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    VoicechainError::upstream(stage, format!("HTTP {status}: {body}"))
}

fn transport_error(stage: Stage, e: reqwest::Error) -> VoicechainError {
    VoicechainError::upstream(stage, e.to_string())
}

#[async_trait]
impl SpeechProvider for OpenAiSpeechClient {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        debug!(bytes = audio.len(), model = %self.stt_model, "Sending audio for transcription");

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("audio.webm")
            .mime_str("audio/webm")
            .map_err(|e| transport_error(Stage::Transcription, e))?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.stt_model.clone())
            .text("language", "en")
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .header("Authorization", self.auth_header())
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(Stage::Transcription, e))?;

        if !resp.status().is_success() {
            return Err(stage_error(Stage::Transcription, resp).await);
        }

        let body: TranscriptionResponse = resp
            .json()
            .await
            .map_err(|e| transport_error(Stage::Transcription, e))?;
        Ok(body.text)
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        debug!(model = %self.chat_model, "Requesting chat completion");

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&json!({
                "model": self.chat_model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user },
                ],
                "max_tokens": COMPLETION_MAX_TOKENS,
                "temperature": COMPLETION_TEMPERATURE,
            }))
            .send()
            .await
            .map_err(|e| transport_error(Stage::Completion, e))?;

        if !resp.status().is_success() {
            return Err(stage_error(Stage::Completion, resp).await);
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| transport_error(Stage::Completion, e))?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                VoicechainError::upstream(Stage::Completion, "response contained no choices")
            })
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        debug!(model = %self.tts_model, voice, chars = text.len(), "Requesting speech synthesis");

        let resp = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&json!({
                "model": self.tts_model,
                "input": text,
                "voice": voice,
                "response_format": "mp3",
            }))
            .send()
            .await
            .map_err(|e| transport_error(Stage::Synthesis, e))?;

        if !resp.status().is_success() {
            return Err(stage_error(Stage::Synthesis, resp).await);
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| transport_error(Stage::Synthesis, e))?;
        Ok(bytes.to_vec())
    }
}
