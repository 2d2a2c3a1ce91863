//! Chained processing orchestrator — one voice turn through the three
//! provider calls, with best-effort persistence.
//!
//! The stages are strictly sequential; each depends on the prior output.
//! Persistence failures never mask a successfully generated reply: once the
//! synthesized audio exists the caller gets it, and step-4 errors are logged
//! and swallowed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use voicechain_core::config::{DEFAULT_INSTRUCTIONS, DEFAULT_VOICE};
use voicechain_core::session::{audio_file_name, message_id, AudioDirection, Message, Speaker};
use voicechain_core::{Result, VoicechainError};
use voicechain_providers::SpeechProvider;

use crate::ledger::SessionLedger;
use crate::remote::ChainedDelegate;

/// Result of one processed turn, returned to the caller regardless of
/// whether the ledger recorded it.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub transcription: String,
    pub ai_response: String,
    /// Synthesized mp3 bytes.
    pub audio: Vec<u8>,
    pub session_id: String,
}

pub struct ChainedPipeline {
    provider: Arc<dyn SpeechProvider>,
    ledger: Arc<SessionLedger>,
    delegate: Option<ChainedDelegate>,
    max_audio_bytes: usize,
}

impl ChainedPipeline {
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        ledger: Arc<SessionLedger>,
        delegate: Option<ChainedDelegate>,
        max_audio_bytes: usize,
    ) -> Self {
        Self {
            provider,
            ledger,
            delegate,
            max_audio_bytes,
        }
    }

    /// Drive one voice turn: validate, (optionally) delegate, otherwise
    /// transcribe → complete → synthesize locally, then persist best-effort.
    pub async fn process_turn(
        &self,
        session_id: &str,
        audio: &[u8],
        instructions: Option<&str>,
        voice: Option<&str>,
    ) -> Result<TurnOutcome> {
        if audio.is_empty() || audio.len() > self.max_audio_bytes {
            return Err(VoicechainError::PayloadTooLarge {
                size: audio.len(),
                limit: self.max_audio_bytes,
            });
        }

        // One fallback transition at most: delegate failure is a warning,
        // never surfaced, and never retried per-stage.
        if let Some(delegate) = &self.delegate {
            match delegate
                .process(session_id, audio, instructions, voice)
                .await
            {
                Ok(outcome) => {
                    info!(session_id, "Chained turn processed by delegate");
                    return Ok(outcome);
                }
                Err(e) => {
                    warn!(session_id, %e, "Delegate failed, falling back to local processing");
                }
            }
        }

        self.process_local(session_id, audio, instructions, voice)
            .await
    }

    async fn process_local(
        &self,
        session_id: &str,
        audio: &[u8],
        instructions: Option<&str>,
        voice: Option<&str>,
    ) -> Result<TurnOutcome> {
        let instructions = instructions.unwrap_or(DEFAULT_INSTRUCTIONS);
        let voice = voice.unwrap_or(DEFAULT_VOICE);

        let transcription = self.provider.transcribe(audio).await?;
        debug!(session_id, text = %transcription, "Transcription complete");

        // An empty transcription (silence) is still a valid turn.
        let ai_response = self
            .provider
            .complete(instructions, &transcription)
            .await?;
        debug!(session_id, chars = ai_response.len(), "Completion received");

        let audio_out = self.provider.synthesize(&ai_response, voice).await?;
        debug!(session_id, bytes = audio_out.len(), "Synthesis complete");

        if let Err(e) = self
            .persist_turn(session_id, audio, &transcription, &ai_response, &audio_out)
            .await
        {
            warn!(session_id, %e, "Failed to persist turn, continuing");
        }

        info!(session_id, "Chained turn processed locally");
        Ok(TurnOutcome {
            transcription,
            ai_response,
            audio: audio_out,
            session_id: session_id.to_string(),
        })
    }

    /// Write the two audio artifacts and append the message pair to the
    /// ledger. Best-effort: any error here is reported to the caller for
    /// logging only.
    async fn persist_turn(
        &self,
        session_id: &str,
        input_audio: &[u8],
        transcription: &str,
        ai_response: &str,
        output_audio: &[u8],
    ) -> Result<()> {
        let mid = message_id();
        let archive = self.ledger.archive();

        archive
            .write_audio(session_id, &mid, AudioDirection::Input, input_audio)
            .await?;
        archive
            .write_audio(session_id, &mid, AudioDirection::Output, output_audio)
            .await?;

        let timestamp = Utc::now();
        let user = Message {
            message_id: mid.clone(),
            speaker: Speaker::User,
            text: transcription.to_string(),
            timestamp,
            audio_file: audio_file_name(session_id, &mid, AudioDirection::Input),
        };
        let assistant = Message {
            message_id: mid.clone(),
            speaker: Speaker::Assistant,
            text: ai_response.to_string(),
            timestamp,
            audio_file: audio_file_name(session_id, &mid, AudioDirection::Output),
        };

        // Absent session: append_turn warns and drops the pair, the turn
        // result still reaches the caller.
        self.ledger.append_turn(session_id, user, assistant).await;
        Ok(())
    }
}
