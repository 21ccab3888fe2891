//! HTTP API routes.

use crate::config::Config;
use crate::provider::GeminiClient;
use crate::session::SessionStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state for the chat endpoints.
#[derive(Clone)]
pub struct ChatState {
    /// Gemini client, absent when no API key is configured
    pub provider: Option<Arc<GeminiClient>>,
    /// Active sessions, one per user
    pub sessions: Arc<SessionStore>,
}

impl ChatState {
    /// Build the service state from configuration.
    ///
    /// A missing API key leaves the provider unset: the service still
    /// starts and reports itself degraded on `/status`, and chat requests
    /// answer 503.
    pub fn from_config(config: &Config) -> Self {
        let provider = config.google_api_key().map(|key| {
            let client = match &config.chat.api_base {
                Some(base) => GeminiClient::with_base_url(key, base.clone()),
                None => GeminiClient::new(key),
            };
            Arc::new(client)
        });

        if provider.is_none() {
            tracing::warn!("GEMINI_API_KEY not configured, chat requests will return 503");
        }

        Self {
            provider,
            sessions: Arc::new(SessionStore::new(config.chat.clone())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub user_id: String,
    pub response: String,
    pub history_length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub llm_client_initialized: bool,
    pub active_chat_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatInfo {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Health check handler.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "chat-relay".into(),
    })
}

/// GET /chat
async fn chat_info_handler() -> Json<ChatInfo> {
    Json(ChatInfo {
        message: "Use POST to send messages.".into(),
    })
}

/// GET /status
async fn status_handler(State(state): State<ChatState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online".into(),
        llm_client_initialized: state.provider.is_some(),
        active_chat_sessions: state.sessions.count().await,
    })
}

/// POST /chat
async fn chat_handler(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Some(provider) = state.provider.as_ref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "AI service unavailable. Check the GEMINI_API_KEY.".to_string(),
                code: "PROVIDER_UNAVAILABLE".to_string(),
            }),
        ));
    };

    let session = state
        .sessions
        .get_or_create(provider, &request.user_id)
        .await;

    match session.send(provider, &request.message).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            user_id: request.user_id,
            response: outcome.reply,
            history_length: outcome.turns,
        })),
        Err(e) => {
            tracing::error!(
                error = %e,
                upstream_status = ?e.status_code,
                user_id = %request.user_id,
                "Gemini request failed"
            );
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Gemini API error: {}", e),
                    code: "PROVIDER_ERROR".to_string(),
                }),
            ))
        }
    }
}

/// DELETE /chat/:user_id
async fn delete_chat_handler(
    State(state): State<ChatState>,
    Path(user_id): Path<String>,
) -> Result<Json<DeleteResponse>, (StatusCode, Json<ErrorResponse>)> {
    if state.sessions.delete(&user_id).await {
        tracing::info!(user_id = %user_id, "Cleared chat session");
        Ok(Json(DeleteResponse {
            message: format!("Chat history for user {} cleared successfully.", user_id),
        }))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No chat session found for user {}.", user_id),
                code: "SESSION_NOT_FOUND".to_string(),
            }),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Routers
// ─────────────────────────────────────────────────────────────────────────────

/// Chat API routes.
pub fn chat_routes() -> Router<ChatState> {
    Router::new()
        .route("/chat", get(chat_info_handler).post(chat_handler))
        .route("/chat/:user_id", delete(delete_chat_handler))
        .route("/status", get(status_handler))
}

/// Liveness routes.
pub fn health_routes() -> Router<ChatState> {
    Router::new().route("/health", get(health_handler))
}
