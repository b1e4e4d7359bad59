// src/state.rs
// Shared application state handed to every request

use std::sync::Arc;

use crate::agents::ChatBackend;

/// Shown to the user when the backend answers without any readable text
pub const FALLBACK_REPLY: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ChatBackend>,
    pub fallback_reply: String,
}

impl AppState {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            fallback_reply: FALLBACK_REPLY.to_string(),
        }
    }
}
