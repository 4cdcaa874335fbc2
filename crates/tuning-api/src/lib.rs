//! # tuning-api
//!
//! REST API server built with Axum. Besides serving requests, the binary
//! runs the flush, warmup and visibility jobs until shutdown.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{build_state, create_app, run};
pub use state::AppState;
