// src/lib.rs

pub mod agents;
pub mod api;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod state;
