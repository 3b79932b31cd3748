//! HTTP/WebSocket Handlers

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use agent_core::session::{anonymous_user_id, reset_anonymous_id};
use agent_core::{Session, SessionId};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider_connected: bool,
    pub market_source: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub session_id: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionTranscript {
    pub id: String,
    pub title: String,
    pub messages: Vec<TranscriptMessage>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub user_id: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(error: impl std::fmt::Display, code: &str) -> ApiError {
    tracing::error!("{}: {}", code, error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "An internal error occurred.".into(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider_connected,
        market_source: state.market_source,
    })
}

/// The clickable example prompts
pub async fn list_examples(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.assistant.examples().to_vec())
}

/// Main chat endpoint (non-streaming)
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Message cannot be empty.".into(),
                code: "EMPTY_MESSAGE".into(),
            }),
        ));
    }

    // Load the session, or start one under the requested id so the client's
    // sidebar entry stays stable even across a server data wipe
    let mut session = match payload.session_id {
        Some(ref raw) => {
            let id = SessionId::from_string(raw.clone());
            state
                .sessions
                .load(&id)
                .map_err(|e| internal_error(e, "SESSION_LOAD"))?
                .unwrap_or_else(|| {
                    let mut fresh = Session::with_id(id);
                    fresh.metadata.user_id = Some(state.assistant.user_id().to_string());
                    fresh
                })
        }
        None => Session::for_user(state.assistant.user_id()),
    };

    let answer = state
        .assistant
        .respond(&mut session.conversation, &payload.message)
        .await
        .map_err(|e| {
            tracing::error!("Assistant error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.user_message(),
                    code: "AGENT_ERROR".into(),
                }),
            )
        })?;

    let model = state.assistant.config().model.clone();
    session.metadata.model = model.clone();
    session.touch();

    state
        .sessions
        .save(&session)
        .map_err(|e| internal_error(e, "SESSION_SAVE"))?;

    Ok(Json(ChatResponse {
        message: answer,
        session_id: session.id.to_string(),
        model,
    }))
}

/// List sessions for the history sidebar, newest first
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let user_id = query
        .user_id
        .unwrap_or_else(|| state.assistant.user_id().to_string());
    let limit = query.limit.unwrap_or(20).min(100);

    let sessions = state
        .sessions
        .list(Some(&user_id), limit)
        .map_err(|e| internal_error(e, "SESSION_LIST"))?;

    Ok(Json(
        sessions
            .iter()
            .map(|s| SessionSummary {
                id: s.id.to_string(),
                title: s.title(),
                updated_at: s.updated_at,
                message_count: s.message_count(),
            })
            .collect(),
    ))
}

/// Load one session's full transcript
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionTranscript>, ApiError> {
    let session_id = SessionId::from_string(id);
    let session = state
        .sessions
        .load(&session_id)
        .map_err(|e| internal_error(e, "SESSION_LOAD"))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Session not found.".into(),
                    code: "SESSION_NOT_FOUND".into(),
                }),
            )
        })?;

    Ok(Json(SessionTranscript {
        id: session.id.to_string(),
        title: session.title(),
        messages: session
            .conversation
            .messages()
            .iter()
            .map(|m| TranscriptMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
                timestamp: m.timestamp,
            })
            .collect(),
    }))
}

/// Delete a session from the sidebar
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = SessionId::from_string(id);
    state
        .sessions
        .delete(&session_id)
        .map_err(|e| internal_error(e, "SESSION_DELETE"))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Clear the persisted anonymous identity ("switch user").
///
/// Returns the freshly generated id. Components built against the old id
/// (memory tool, composer) pick the new one up on the next server start.
pub async fn reset_identity(
    State(state): State<AppState>,
) -> Result<Json<IdentityResponse>, ApiError> {
    reset_anonymous_id(&state.data_dir).map_err(|e| internal_error(e, "IDENTITY_RESET"))?;
    let user_id = anonymous_user_id(true, &state.data_dir);

    tracing::info!(user_id = %user_id, "Anonymous identity reset");
    Ok(Json(IdentityResponse { user_id }))
}

/// WebSocket streaming chat
pub async fn chat_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => continue,
        };

        let request: ChatRequest = match serde_json::from_str(&msg) {
            Ok(r) => r,
            Err(e) => {
                let error = serde_json::json!({"type": "error", "error": e.to_string()});
                let _ = sender.send(Message::Text(error.to_string().into())).await;
                continue;
            }
        };

        // Prior context for follow-ups, when the client names a session
        let conversation = request
            .session_id
            .as_ref()
            .and_then(|raw| {
                state
                    .sessions
                    .load(&SessionId::from_string(raw.clone()))
                    .ok()
                    .flatten()
            })
            .map(|s| s.conversation)
            .unwrap_or_default();

        match state
            .assistant
            .respond_stream(&conversation, &request.message)
            .await
        {
            Ok(mut stream) => {
                while let Some(result) = stream.next().await {
                    match result {
                        Ok(chunk) => {
                            let response = serde_json::json!({
                                "type": "chunk",
                                "content": chunk.delta,
                                "done": chunk.done,
                            });
                            if sender
                                .send(Message::Text(response.to_string().into()))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => {
                            let error =
                                serde_json::json!({"type": "error", "error": e.user_message()});
                            let _ = sender.send(Message::Text(error.to_string().into())).await;
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                let error = serde_json::json!({"type": "error", "error": e.user_message()});
                let _ = sender.send(Message::Text(error.to_string().into())).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_parsing() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message": "Analyze BTC", "session_id": "abc"}"#).unwrap();
        assert_eq!(request.message, "Analyze BTC");
        assert_eq!(request.session_id.as_deref(), Some("abc"));

        let bare: ChatRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert!(bare.session_id.is_none());
    }

    #[test]
    fn test_chat_response_shape() {
        let response = ChatResponse {
            message: "report".into(),
            session_id: "s1".into(),
            model: "llama3.2".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["message"], "report");
        assert_eq!(json["session_id"], "s1");
    }

    #[test]
    fn test_session_summary_serializes() {
        let summary = SessionSummary {
            id: "s1".into(),
            title: "Analyze BTC".into(),
            updated_at: Utc::now(),
            message_count: 4,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["message_count"], 4);
    }
}
