//! API integration tests — the router served on an ephemeral port with a
//! stubbed speech provider.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

use voicechain_core::archive::SessionArchive;
use voicechain_core::config::Config;
use voicechain_core::Result;
use voicechain_pipeline::{ChainedPipeline, SessionLedger};
use voicechain_providers::SpeechProvider;
use voicechain_server::{api_router, AppState};

struct StubProvider;

#[async_trait]
impl SpeechProvider for StubProvider {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Ok("what's the weather".to_string())
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Ok("It's sunny today.".to_string())
    }

    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Vec<u8>> {
        Ok(vec![0xFF, 0xF3, 0xAA, 0xBB])
    }
}

const MAX_AUDIO_BYTES: usize = 1024 * 1024;

async fn spawn_app(with_pipeline: bool) -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(Config::default());
    let archive = Arc::new(SessionArchive::new(dir.path().to_path_buf()));
    let ledger = Arc::new(SessionLedger::new(archive));

    let pipeline = with_pipeline.then(|| {
        Arc::new(ChainedPipeline::new(
            Arc::new(StubProvider),
            ledger.clone(),
            None,
            MAX_AUDIO_BYTES,
        ))
    });

    let state = Arc::new(AppState::new(config, ledger, pipeline, None));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = api_router(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}"), dir)
}

async fn start_session(client: &reqwest::Client, base: &str) -> String {
    let resp: Value = client
        .post(format!("{base}/api/session/start"))
        .json(&serde_json::json!({ "voice": "alloy" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["success"], true);
    resp["sessionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let (base, _dir) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let session_id = start_session(&client, &base).await;

    // process one turn
    let resp = client
        .post(format!("{base}/api/chained/process"))
        .json(&serde_json::json!({
            "audio": BASE64.encode(b"fake webm clip"),
            "sessionId": session_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["transcription"], "what's the weather");
    assert_eq!(body["aiResponse"], "It's sunny today.");
    assert_eq!(body["sessionId"], session_id.as_str());
    assert!(!body["audio"].as_str().unwrap().is_empty());

    // not archived until ended
    let listing: Value = client
        .get(format!("{base}/api/saved-data"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["totalSessions"], 0);

    // end the session
    let resp = client
        .post(format!("{base}/api/session/end"))
        .json(&serde_json::json!({ "sessionId": session_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Session ended and saved successfully");

    // now archived, newest-first listing with audio presence
    let listing: Value = client
        .get(format!("{base}/api/saved-data"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["totalSessions"], 1);
    let row = &listing["sessions"][0];
    assert_eq!(row["sessionId"], session_id.as_str());
    assert_eq!(row["conversationLength"], 2);
    assert_eq!(row["hasAudio"]["input"], true);
    assert_eq!(row["hasAudio"]["output"], true);

    // full transcript retrieval
    let detail: Value = client
        .get(format!("{base}/api/saved-data/{session_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session = &detail["session"];
    assert_eq!(session["messageCount"], 2);
    assert!(session["endTime"].is_string());
    let message_id = session["conversation"][0]["messageId"].as_str().unwrap();

    // audio artifact retrieval with the right content types
    let resp = client
        .get(format!(
            "{base}/api/saved-data/{session_id}/{message_id}/input"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "audio/webm"
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"fake webm clip");

    let resp = client
        .get(format!(
            "{base}/api/saved-data/{session_id}/{message_id}/output"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "audio/mpeg"
    );

    // ending twice is a 404, not a crash
    let resp = client
        .post(format!("{base}/api/session/end"))
        .json(&serde_json::json!({ "sessionId": session_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Session not found");
}

#[tokio::test]
async fn test_oversized_audio_is_rejected() {
    let (base, _dir) = spawn_app(true).await;
    let client = reqwest::Client::new();
    let session_id = start_session(&client, &base).await;

    let resp = client
        .post(format!("{base}/api/chained/process"))
        .json(&serde_json::json!({
            "audio": BASE64.encode(vec![0u8; MAX_AUDIO_BYTES + 1]),
            "sessionId": session_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
}

#[tokio::test]
async fn test_invalid_base64_audio() {
    let (base, _dir) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/chained/process"))
        .json(&serde_json::json!({
            "audio": "not!!valid!!base64",
            "sessionId": "session_1_abc",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_invalid_audio_type_segment() {
    let (base, _dir) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/saved-data/session_1_a/msg_1_b/sideways"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_missing_audio_is_404() {
    let (base, _dir) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/saved-data/session_1_a/msg_1_b/input"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Audio file not found");
}

#[tokio::test]
async fn test_unknown_saved_session_is_404() {
    let (base, _dir) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/saved-data/session_0_missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_unconfigured_provider_fails_chained_and_realtime() {
    let (base, _dir) = spawn_app(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/chained/process"))
        .json(&serde_json::json!({
            "audio": BASE64.encode(b"clip"),
            "sessionId": "session_1_abc",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "OpenAI API key not configured");

    let resp = client
        .post(format!("{base}/api/realtime/session"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let (base, _dir) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("{base}/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["apiKeyConfigured"], true);
    assert!(body["timestamp"].is_string());
}
