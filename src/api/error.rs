// src/api/error.rs
// Centralized error handling for HTTP API responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

use crate::error::{AgentError, Step};

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: Option<String>,
}

impl ApiError {
    /// Create a new internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            error_code: Some("INTERNAL_ERROR".to_string()),
        }
    }

    /// Create a new bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::BAD_REQUEST,
            error_code: Some("BAD_REQUEST".to_string()),
        }
    }

    /// Create a new not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::NOT_FOUND,
            error_code: Some("NOT_FOUND".to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response_json = json!({
            "error": self.message,
            "status": self.status_code.as_u16()
        });

        if let Some(error_code) = self.error_code {
            response_json["error_code"] = json!(error_code);
        }

        (self.status_code, Json(response_json)).into_response()
    }
}

/// Upstream failures become 500s with a message naming the step that broke.
/// The full error goes to the log only.
impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        error!("Chat backend error: {}", err);
        let message = match &err {
            AgentError::RunFailed(detail) => format!("Agent error: {detail}"),
            AgentError::Step { step, .. } => match step {
                Step::CreateThread => "Failed to create conversation thread".to_string(),
                Step::SendMessage => "Failed to send message to agent".to_string(),
                Step::RunAgent => "Failed to run agent".to_string(),
                Step::ListMessages => "Failed to retrieve agent response".to_string(),
                Step::Completion => "Failed to get a response from the model".to_string(),
            },
            other => format!("An unexpected error occurred: {other}"),
        };
        ApiError::internal(message)
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_creation() {
        let error = ApiError::internal("Test error");
        assert_eq!(error.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "Test error");
        assert_eq!(error.to_string(), "Test error");
    }

    #[test]
    fn test_agent_error_mapping() {
        let failed: ApiError = AgentError::RunFailed("quota exceeded".into()).into();
        assert_eq!(failed.message, "Agent error: quota exceeded");

        let thread: ApiError =
            AgentError::at(Step::CreateThread)(AgentError::Credential("no token".into())).into();
        assert_eq!(thread.message, "Failed to create conversation thread");
        assert_eq!(thread.status_code, StatusCode::INTERNAL_SERVER_ERROR);

        let listing: ApiError =
            AgentError::at(Step::ListMessages)(AgentError::Credential("x".into())).into();
        assert_eq!(listing.message, "Failed to retrieve agent response");
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::bad_request("Message is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Message is required");
        assert_eq!(json["error_code"], "BAD_REQUEST");
    }
}
