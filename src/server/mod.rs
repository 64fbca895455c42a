//! # HTTP Server for the Design Editor
//!
//! Small JSON surface the browser editor talks to: element palette,
//! design preview, dataset inspection, and batch generation.
//!
//! ## Usage
//!
//! ```bash
//! laurea serve --listen 0.0.0.0:8080 --fonts ./fonts
//! ```

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::LaureaError;

/// Build the API router; split out so tests can drive it without a socket.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/elements", get(handlers::elements))
        .route("/api/design/preview", post(handlers::preview))
        .route("/api/dataset/inspect", post(handlers::inspect_dataset))
        // Generation payloads carry inline datasets and data URIs.
        .route(
            "/api/generate",
            post(handlers::generate).layer(DefaultBodyLimit::max(50 * 1024 * 1024)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: ServerConfig) -> Result<(), LaureaError> {
    let state = Arc::new(AppState::new(config.clone()));
    let app = router(state);

    tracing::info!(listen = %config.listen_addr, "starting server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            LaureaError::Server(format!("failed to bind to {}: {}", config.listen_addr, e))
        })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| LaureaError::Server(format!("server error: {}", e)))?;

    Ok(())
}
