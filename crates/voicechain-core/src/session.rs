//! Session model — conversation transcripts and audio artifact references.
//!
//! Field names serialize as camelCase to stay bit-exact with the persisted
//! per-session JSON format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// Direction of a stored audio artifact relative to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioDirection {
    /// Recorded user audio (webm from the browser).
    Input,
    /// Synthesized assistant audio (mp3 from the provider).
    Output,
}

impl AudioDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Input => "webm",
            Self::Output => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Input => "audio/webm",
            Self::Output => "audio/mpeg",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            _ => None,
        }
    }
}

/// One transcript entry. Immutable once appended to a session.
///
/// The user and assistant messages of a single turn share a `message_id`
/// and differ in speaker, text, and audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// File name of the stored audio artifact (not a path).
    pub audio_file: String,
}

/// An active or archived conversation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub voice: String,
    pub instructions: String,
    pub conversation: Vec<Message>,
    pub message_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(voice: String, instructions: String) -> Self {
        Self {
            session_id: session_id(),
            start_time: Utc::now(),
            end_time: None,
            voice,
            instructions,
            conversation: Vec::new(),
            message_count: 0,
            last_activity: None,
        }
    }

    /// Append one user/assistant message pair from a completed turn.
    pub fn append_turn(&mut self, user: Message, assistant: Message) {
        self.conversation.push(user);
        self.conversation.push(assistant);
        self.message_count += 2;
        self.last_activity = Some(Utc::now());
    }
}

/// Deterministic artifact file name for a (session, message, direction).
pub fn audio_file_name(session_id: &str, message_id: &str, direction: AudioDirection) -> String {
    format!(
        "{session_id}_{message_id}_{}.{}",
        direction.as_str(),
        direction.extension()
    )
}

/// Generate a session id: `session_{unix_millis}_{alnum9}`.
///
/// Uniqueness is the only requirement here, not unguessability.
pub fn session_id() -> String {
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix(9))
}

/// Generate a message id: `msg_{unix_millis}_{alnum6}`.
pub fn message_id() -> String {
    format!("msg_{}_{}", Utc::now().timestamp_millis(), suffix(6))
}

fn suffix(len: usize) -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let chars = b"abcdefghijklmnopqrstuvwxyz0123456789";
            chars[rng.random_range(0..chars.len())] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_formats() {
        let sid = session_id();
        assert!(sid.starts_with("session_"));
        let mid = message_id();
        assert!(mid.starts_with("msg_"));
        assert_ne!(message_id(), message_id());
    }

    #[test]
    fn test_audio_file_name() {
        assert_eq!(
            audio_file_name("session_1_a", "msg_2_b", AudioDirection::Input),
            "session_1_a_msg_2_b_input.webm"
        );
        assert_eq!(
            audio_file_name("session_1_a", "msg_2_b", AudioDirection::Output),
            "session_1_a_msg_2_b_output.mp3"
        );
    }

    #[test]
    fn test_append_turn_keeps_count_invariant() {
        let mut session = Session::new("alloy".into(), "be brief".into());
        let ts = Utc::now();
        let mid = message_id();
        session.append_turn(
            Message {
                message_id: mid.clone(),
                speaker: Speaker::User,
                text: "hi".into(),
                timestamp: ts,
                audio_file: audio_file_name(&session.session_id, &mid, AudioDirection::Input),
            },
            Message {
                message_id: mid.clone(),
                speaker: Speaker::Assistant,
                text: "hello".into(),
                timestamp: ts,
                audio_file: audio_file_name(&session.session_id, &mid, AudioDirection::Output),
            },
        );
        assert_eq!(session.message_count, session.conversation.len());
        assert_eq!(session.conversation[0].speaker, Speaker::User);
        assert!(session.last_activity.is_some());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let session = Session::new("alloy".into(), "x".into());
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("sessionId").is_some());
        assert!(json.get("startTime").is_some());
        assert!(json.get("messageCount").is_some());
        // endTime omitted while the session is live
        assert!(json.get("endTime").is_none());
    }
}
