//! Durable session archive — one JSON transcript per ended session plus
//! flat audio artifacts.
//!
//! Layout under the data dir:
//! - `transcripts/<sessionId>_transcript.json` — full `Session`, pretty-printed
//! - `audio/<sessionId>_<messageId>_<direction>.<webm|mp3>`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::session::{AudioDirection, Session, Speaker};

/// Summary row returned by [`SessionArchive::list_sessions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub voice: String,
    pub conversation_length: usize,
    pub has_audio: AudioPresence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioPresence {
    pub input: bool,
    pub output: bool,
}

pub struct SessionArchive {
    base: PathBuf,
}

impl SessionArchive {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn transcript_dir(&self) -> PathBuf {
        self.base.join("transcripts")
    }

    fn audio_dir(&self) -> PathBuf {
        self.base.join("audio")
    }

    fn transcript_path(&self, session_id: &str) -> PathBuf {
        self.transcript_dir()
            .join(format!("{session_id}_transcript.json"))
    }

    fn audio_path(&self, file_name: &str) -> PathBuf {
        self.audio_dir().join(file_name)
    }

    async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.transcript_dir()).await?;
        tokio::fs::create_dir_all(self.audio_dir()).await?;
        Ok(())
    }

    /// Persist a full session snapshot. Atomic write: temp then rename.
    pub async fn save_session(&self, session: &Session) -> Result<()> {
        self.ensure_dirs().await?;
        let path = self.transcript_path(&session.session_id);
        let data = serde_json::to_string_pretty(session)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(session_id = %session.session_id, "Saved session transcript");
        Ok(())
    }

    pub async fn load_session(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.transcript_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(&path).await?;
        let session: Session = serde_json::from_str(&data)?;
        Ok(Some(session))
    }

    /// List archived sessions, newest-first by start time.
    ///
    /// Unparseable transcript files are skipped with a warning rather than
    /// failing the whole listing.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let dir = self.transcript_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !file_is_transcript(&path) {
                continue;
            }
            let data = tokio::fs::read_to_string(&path).await?;
            let session: Session = match serde_json::from_str(&data) {
                Ok(s) => s,
                Err(e) => {
                    warn!(path = %path.display(), %e, "Skipping corrupt transcript");
                    continue;
                }
            };
            let has_audio = self.probe_audio(&session);
            summaries.push(SessionSummary {
                session_id: session.session_id,
                timestamp: session.start_time,
                voice: session.voice,
                conversation_length: session.conversation.len(),
                has_audio,
            });
        }

        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(summaries)
    }

    fn probe_audio(&self, session: &Session) -> AudioPresence {
        let first_with = |speaker: Speaker| {
            session
                .conversation
                .iter()
                .find(|m| m.speaker == speaker)
                .map(|m| self.audio_path(&m.audio_file).exists())
                .unwrap_or(false)
        };
        AudioPresence {
            input: first_with(Speaker::User),
            output: first_with(Speaker::Assistant),
        }
    }

    /// Store an audio artifact under its deterministic file name.
    pub async fn write_audio(
        &self,
        session_id: &str,
        message_id: &str,
        direction: AudioDirection,
        bytes: &[u8],
    ) -> Result<String> {
        self.ensure_dirs().await?;
        let file_name = crate::session::audio_file_name(session_id, message_id, direction);
        tokio::fs::write(self.audio_path(&file_name), bytes).await?;
        debug!(file = %file_name, bytes = bytes.len(), "Saved audio artifact");
        Ok(file_name)
    }

    pub async fn read_audio(
        &self,
        session_id: &str,
        message_id: &str,
        direction: AudioDirection,
    ) -> Result<Option<Vec<u8>>> {
        let file_name = crate::session::audio_file_name(session_id, message_id, direction);
        let path = self.audio_path(&file_name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(tokio::fs::read(&path).await?))
    }
}

fn file_is_transcript(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_transcript.json"))
}
