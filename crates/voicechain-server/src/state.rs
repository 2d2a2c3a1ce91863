//! Shared server state.
//!
//! All state is injected at construction: the ledger starts empty at
//! process start and in-flight sessions are abandoned at shutdown, never
//! force-flushed.

use std::sync::Arc;

use tracing::warn;

use voicechain_core::archive::SessionArchive;
use voicechain_core::config::Config;
use voicechain_pipeline::{ChainedDelegate, ChainedPipeline, SessionLedger};
use voicechain_providers::{OpenAiSpeechClient, RealtimeControl};

pub struct AppState {
    pub config: Arc<Config>,
    pub ledger: Arc<SessionLedger>,
    /// Absent when no provider credential is configured; the chained
    /// endpoint then fails per-request with a configuration error.
    pub pipeline: Option<Arc<ChainedPipeline>>,
    pub realtime: Option<Arc<RealtimeControl>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        ledger: Arc<SessionLedger>,
        pipeline: Option<Arc<ChainedPipeline>>,
        realtime: Option<Arc<RealtimeControl>>,
    ) -> Self {
        Self {
            config,
            ledger,
            pipeline,
            realtime,
        }
    }

    /// Wire up the full state from configuration.
    pub fn from_config(config: Config) -> Self {
        let config = Arc::new(config);
        let archive = Arc::new(SessionArchive::new(config.data_dir()));
        let ledger = Arc::new(SessionLedger::new(archive));

        let provider_config = config.provider.clone().unwrap_or_default();
        let delegate = config
            .delegate
            .as_ref()
            .map(|d| ChainedDelegate::new(&d.base_url));

        let (pipeline, realtime) = match OpenAiSpeechClient::from_config(&provider_config) {
            Ok(client) => {
                let pipeline = Arc::new(ChainedPipeline::new(
                    Arc::new(client),
                    ledger.clone(),
                    delegate,
                    config.max_audio_bytes(),
                ));
                // from_config succeeded, so a key resolved above
                let realtime = config.resolve_api_key().map(|key| {
                    let mut control =
                        RealtimeControl::new(key, provider_config.base_url.as_deref());
                    if let Some(model) = &provider_config.realtime_model {
                        control = control.with_model(model.clone());
                    }
                    Arc::new(control)
                });
                (Some(pipeline), realtime)
            }
            Err(e) => {
                warn!(%e, "Voice provider not configured; chained and realtime endpoints will fail");
                (None, None)
            }
        };

        Self::new(config, ledger, pipeline, realtime)
    }
}
