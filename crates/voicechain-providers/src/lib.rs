//! AI provider clients.
//!
//! The chained pipeline talks to its provider through the [`SpeechProvider`]
//! trait so the orchestrator can be exercised against mocks; the OpenAI
//! implementation lives in [`openai`]. Realtime session control (ephemeral
//! credential minting, server-side hangup) is in [`realtime`].

use async_trait::async_trait;

use voicechain_core::Result;

pub mod openai;
pub mod realtime;

pub use openai::OpenAiSpeechClient;
pub use realtime::RealtimeControl;

/// The three remote calls of a chained voice turn. Each is a plain
/// request/response with bearer-token auth; failures carry the upstream
/// body, stage-tagged, and are never retried here.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Transcribe a recorded clip. An empty string is a valid result
    /// (silence).
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Single-turn chat completion: one system prompt, one user turn.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Synthesize speech for the given text and voice. Returns mp3 bytes.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;
}
