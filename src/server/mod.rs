//! HTTP surface for the concierge.
//!
//! `POST /api/chat` answers one turn, `POST /api/transcribe` turns a voice clip
//! into text and `GET /api/health` reports liveness. The chat endpoint never
//! fails at the HTTP level: every problem comes back as a 200 with prose.

mod routes;

use crate::error::Result;
use crate::language::Language;
use crate::llm::models::LlmMessage;
use crate::session::Responder;
use crate::transcription::Transcriber;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Largest voice clip accepted by `/api/transcribe`.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Largest chat request body. Anything bigger is answered with the apology.
pub const MAX_CHAT_BYTES: usize = 2 * 1024 * 1024;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<LlmMessage>,
    /// Absent means English; any value other than `"en"` means Japanese.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscribeReply {
    Text { text: String },
    Error { error: String },
}

/// Shared application state
pub struct AppState {
    pub responder: Arc<dyn Responder>,
    pub transcriber: Arc<dyn Transcriber>,
}

impl AppState {
    pub fn new(responder: Arc<dyn Responder>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            responder,
            transcriber,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/chat",
            post(routes::chat).layer(DefaultBodyLimit::max(MAX_CHAT_BYTES)),
        )
        .route(
            "/api/transcribe",
            post(routes::transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/api/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
