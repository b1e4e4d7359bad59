// src/api/http/router.rs
// HTTP router composition for the chat page and REST endpoints

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{
    chat::chat_handler,
    handlers::{health_handler, index_handler, not_found_handler},
};
use crate::state::AppState;

/// Main router: page, chat, health, and a JSON 404 for everything else
pub fn http_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
