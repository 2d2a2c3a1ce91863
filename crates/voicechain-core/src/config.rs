//! Configuration loading and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// System prompt used when a session or turn supplies no instructions.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful AI assistant. Respond naturally and conversationally. Keep responses concise and engaging.";

/// Voice used when none is requested.
pub const DEFAULT_VOICE: &str = "alloy";

/// Fixed sampling defaults for the completion stage. Deterministic per
/// deployment, not caller-tunable.
pub const COMPLETION_MAX_TOKENS: u32 = 500;
pub const COMPLETION_TEMPERATURE: f64 = 0.7;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Top-level Voicechain configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate: Option<DelegateConfig>,
}

/// AI provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_model: Option<String>,
}

impl ProviderConfig {
    /// Resolve the API key: `api_key` field first, then the `api_key_env`
    /// variable, then `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Ceiling on a single recorded clip; larger payloads are rejected
    /// before any upstream call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_audio_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Remote chained-processing delegate. When set, whole turns are first
/// delegated to this service; any failure falls back to local processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateConfig {
    pub base_url: String,
}

impl Config {
    /// Load from a JSON5 file; a missing file yields defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Config = json5::from_str(&raw)
            .map_err(|e| crate::error::VoicechainError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    pub fn port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn max_audio_bytes(&self) -> usize {
        self.server
            .as_ref()
            .and_then(|s| s.max_audio_bytes)
            .unwrap_or(DEFAULT_MAX_AUDIO_BYTES)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from("saved_data"))
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        self.provider
            .as_ref()
            .map(|p| p.resolve_api_key())
            .unwrap_or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()))
    }
}

/// Resolve a secret: direct value first, then environment variable.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port(), 3000);
        assert_eq!(config.bind_addr(), "0.0.0.0");
        assert_eq!(config.max_audio_bytes(), 25 * 1024 * 1024);
        assert_eq!(config.data_dir(), PathBuf::from("saved_data"));
    }

    #[test]
    fn test_load_json5() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voicechain.json5");
        std::fs::write(
            &path,
            r#"{
                // port override
                server: { port: 8080, max_audio_bytes: 1024 },
                provider: { api_key: "sk-test" },
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.max_audio_bytes(), 1024);
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load(Path::new("/nonexistent/voicechain.json5")).unwrap();
        assert_eq!(config.port(), 3000);
    }

    #[test]
    fn test_resolve_secret_field_prefers_direct() {
        let direct = Some("direct".to_string());
        let env = Some("VOICECHAIN_TEST_UNSET_VAR".to_string());
        assert_eq!(resolve_secret_field(&direct, &env).as_deref(), Some("direct"));
        assert_eq!(resolve_secret_field(&None, &env), None);
    }
}
