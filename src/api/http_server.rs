// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server wiring
//!
//! Builds the axum router and runs it with graceful shutdown. All
//! handler state is shared through [`AppState`].

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::predict::predict_handler;
use crate::config::ServiceConfig;
use crate::detection::DetectorHandle;
use crate::vision::Annotator;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub detector: Arc<DetectorHandle>,
    pub annotator: Arc<Annotator>,
}

/// Build the application router.
///
/// Kept separate from [`start_server`] so tests can drive the router
/// directly with `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> Router {
    // A `*` entry (the default) or an empty list means open CORS,
    // matching the original deployment behind a browser frontend.
    // tower-http rejects a literal `*` inside an origin list.
    let open_cors = state.config.cors_allowed_origins.is_empty()
        || state.config.cors_allowed_origins.iter().any(|o| o == "*");
    let cors = if open_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!("Ignoring unparsable CORS origin: {:?}", o);
                    None
                }
            })
            .collect();
        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, all origins will be rejected");
        }
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Leave headroom over the decoded-image cap for multipart framing
    let body_limit = state.config.max_upload_size + 64 * 1024;

    Router::new()
        // Liveness check
        .route("/", get(root_handler))
        // Detection endpoint
        .route("/predict", post(predict_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "Braille YOLO API is running." }))
}

/// Bind the configured address and serve until ctrl-c.
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.listen_addr.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install ctrl-c handler: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
