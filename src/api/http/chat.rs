// src/api/http/chat.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Accepted for client compatibility; each request starts a fresh thread
    #[serde(default)]
    pub history: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub status: String,
}

/// POST /chat
///
/// A body that is not valid JSON is treated like an empty message.
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let user_message = request.message.trim();

    if user_message.is_empty() {
        warn!("Empty message received");
        return Err(ApiError::bad_request("Message is required"));
    }

    let request_id = Uuid::new_v4();
    let span = info_span!("chat", %request_id, backend = app_state.backend.name());

    async move {
        info!("Processing message: {}...", preview(user_message, 100));

        let reply = match app_state.backend.reply(user_message).await? {
            Some(text) => text,
            None => {
                warn!("No assistant response found");
                app_state.fallback_reply.clone()
            }
        };

        info!("✓ Response generated: {}...", preview(&reply, 100));

        Ok::<_, ApiError>(Json(ChatResponse {
            response: reply,
            status: "success".to_string(),
        }))
    }
    .instrument(span)
    .await
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("hello", 100), "hello");
        assert_eq!(preview("héllo wörld", 4), "héll");
        assert_eq!(preview("", 3), "");
    }

    #[test]
    fn test_request_defaults() {
        let request: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(request.message.is_empty());
        assert!(request.history.is_empty());
    }
}
