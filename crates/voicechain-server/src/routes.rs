//! API route handlers.
//!
//! Responses are flat JSON with a `success` flag on happy paths and
//! `{"error": ...}` bodies on failures. Existing browser clients depend on
//! these exact field names.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use voicechain_core::session::AudioDirection;
use voicechain_core::VoicechainError;
use voicechain_providers::realtime::RealtimeError;

use crate::state::AppState;

// Audio arrives base64-encoded inside JSON bodies, so the body limit sits
// well above the raw clip ceiling.
const BODY_LIMIT: usize = 50 * 1024 * 1024;

pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/session/start", post(session_start))
        .route("/api/session/end", post(session_end))
        .route("/api/chained/process", post(chained_process))
        .route("/api/saved-data", get(saved_data_list))
        .route("/api/saved-data/{session_id}", get(saved_data_session))
        .route(
            "/api/saved-data/{session_id}/{message_id}/{audio_type}",
            get(saved_data_audio),
        )
        .route("/api/realtime/session", post(realtime_session))
        .route("/api/realtime/calls/{call_id}/hangup", post(realtime_hangup))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error response: status code plus `{"error": message}`.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_configured() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "OpenAI API key not configured",
        )
    }
}

impl From<VoicechainError> for ApiError {
    fn from(err: VoicechainError) -> Self {
        let status = match &err {
            VoicechainError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            VoicechainError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &err {
            VoicechainError::SessionNotFound(_) => "Session not found".to_string(),
            _ => err.to_string(),
        };
        Self::new(status, message)
    }
}

impl From<RealtimeError> for ApiError {
    fn from(err: RealtimeError) -> Self {
        match err {
            // propagate the upstream status code
            RealtimeError::Upstream { status, body } => Self::new(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                format!("Hangup failed: {body}"),
            ),
            RealtimeError::Transport(e) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, message = %self.message, "Request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "apiKeyConfigured": state.pipeline.is_some(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct StartSessionRequest {
    voice: Option<String>,
    instructions: Option<String>,
}

async fn session_start(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = state
        .ledger
        .start_session(body.voice, body.instructions)
        .await;
    Json(json!({ "success": true, "sessionId": session_id }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndSessionRequest {
    session_id: String,
}

async fn session_end(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EndSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.ledger.end_session(&body.session_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Session ended and saved successfully",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainedProcessRequest {
    audio: String,
    instructions: Option<String>,
    voice: Option<String>,
    session_id: String,
}

async fn chained_process(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChainedProcessRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = state.pipeline.as_ref().ok_or_else(ApiError::not_configured)?;

    let audio = BASE64
        .decode(&body.audio)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid base64 audio: {e}")))?;

    let outcome = pipeline
        .process_turn(
            &body.session_id,
            &audio,
            body.instructions.as_deref(),
            body.voice.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "transcription": outcome.transcription,
        "aiResponse": outcome.ai_response,
        "audio": BASE64.encode(&outcome.audio),
        "sessionId": outcome.session_id,
    })))
}

async fn saved_data_list(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.ledger.list_sessions().await?;
    Ok(Json(json!({
        "success": true,
        "totalSessions": sessions.len(),
        "sessions": sessions,
    })))
}

async fn saved_data_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .ledger
        .get_session(&session_id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Session not found"))?;
    Ok(Json(json!({ "success": true, "session": session })))
}

async fn saved_data_audio(
    State(state): State<Arc<AppState>>,
    Path((session_id, message_id, audio_type)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let direction = AudioDirection::parse(&audio_type).ok_or_else(|| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "Invalid audio type. Use \"input\" or \"output\"",
        )
    })?;

    let bytes = state
        .ledger
        .archive()
        .read_audio(&session_id, &message_id, direction)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Audio file not found"))?;

    Ok((
        [(header::CONTENT_TYPE, direction.mime_type())],
        bytes,
    ))
}

async fn realtime_session(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let realtime = state.realtime.as_ref().ok_or_else(ApiError::not_configured)?;
    let client_secret = realtime.mint_client_secret().await?;
    Ok(Json(json!({ "clientSecret": client_secret })))
}

async fn realtime_hangup(
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let realtime = state.realtime.as_ref().ok_or_else(ApiError::not_configured)?;
    realtime.hangup(&call_id).await?;
    Ok(Json(json!({ "success": true, "callId": call_id })))
}
