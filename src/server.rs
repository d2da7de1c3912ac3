//! HTTP front end: `POST /cleanup` carries action requests, `GET /health` probes.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ApiError;
use crate::protocol::{ActionRequest, ActionResponse};
use crate::service::CleanupService;

#[derive(Clone)]
pub struct AppState {
    service: Arc<CleanupService>,
}

pub fn router(service: Arc<CleanupService>) -> Router {
    Router::new()
        .route("/cleanup", post(handle_action))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

async fn handle_action(
    State(state): State<AppState>,
    Json(request): Json<ActionRequest>,
) -> Response {
    let service = Arc::clone(&state.service);
    // Store work is synchronous sled I/O.
    match tokio::task::spawn_blocking(move || service.handle(request)).await {
        Ok(response) => Json(response).into_response(),
        Err(join_err) => {
            error!(error = %join_err, "Cleanup handler panicked");
            let body = ActionResponse::failure(&ApiError::Remote(
                "internal error while handling request".to_string(),
            ));
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "batch_size": state.service.batch_size(),
    }))
}

pub async fn bind(addr: &str) -> Result<TcpListener, ApiError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::ConfigError(format!("Failed to bind {}: {}", addr, e)))
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    service: Arc<CleanupService>,
    shutdown: F,
) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!(addr = %local, "Cleanup server listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::Transport(format!("Server error: {}", e)))?;
    info!("Cleanup server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
