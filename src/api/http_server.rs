// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::health_handler;
use super::predict::predict_handler;
use crate::config::ServerConfig;
use crate::vision::ClassifierModelManager;

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub classifier_manager: Arc<ClassifierModelManager>,
    pub upload_dir: PathBuf,
    pub threshold: f32,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: &ServerConfig, classifier_manager: ClassifierModelManager) -> Self {
        Self {
            classifier_manager: Arc::new(classifier_manager),
            upload_dir: config.upload_dir.clone(),
            threshold: config.threshold,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// State with default configuration and no classifier loaded
    pub fn new_for_test() -> Self {
        Self::new(&ServerConfig::default(), ClassifierModelManager::empty())
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        // The browser front end is served from another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("API server listening on {}", listener.local_addr()?);

    let app = create_app(Arc::new(state));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
