// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::http_server::AppState;
use crate::vision::ClassifierModelInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model: Option<String>,
    pub models: Vec<ClassifierModelInfo>,
    pub version: serde_json::Value,
}

/// GET /health - Report whether the classifier is available
///
/// Always 200; a missing model reports `degraded` since /predict will
/// answer "Model not loaded".
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let manager = &state.classifier_manager;
    let classifier = manager.get_classifier();

    Json(HealthResponse {
        status: if classifier.is_some() {
            "healthy"
        } else {
            "degraded"
        }
        .to_string(),
        model_loaded: classifier.is_some(),
        model: classifier.map(|c| c.name().to_string()),
        models: manager.list_models(),
        version: crate::version::get_version_info(),
    })
}
