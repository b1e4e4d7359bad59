// src/api/http/handlers.rs

use axum::{
    Json,
    response::{Html, IntoResponse},
};
use serde_json::json;

use crate::api::error::ApiError;

const INDEX_HTML: &str = include_str!("../../../templates/index.html");

/// Chat page
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "SageAlpha.ai"
    }))
}

pub async fn not_found_handler() -> ApiError {
    ApiError::not_found("Endpoint not found")
}
