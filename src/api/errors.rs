// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The classifier failed to load at start-up
    ModelNotLoaded,
    /// No `image` file part in the request
    MissingImage,
    /// Request body exceeded the configured limit
    PayloadTooLarge,
    /// Staging, decoding, preprocessing or inference failed
    ProcessingFailed(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let error = match self {
            ApiError::ModelNotLoaded => "Model not loaded".to_string(),
            ApiError::MissingImage => "No image file provided".to_string(),
            ApiError::PayloadTooLarge => "Image upload too large".to_string(),
            ApiError::ProcessingFailed(msg) => msg.clone(),
        };

        ErrorResponse { error }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ModelNotLoaded => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MissingImage => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ProcessingFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ModelNotLoaded => write!(f, "Model not loaded"),
            ApiError::MissingImage => write!(f, "No image file provided"),
            ApiError::PayloadTooLarge => write!(f, "Image upload too large"),
            ApiError::ProcessingFailed(msg) => write!(f, "Processing failed: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
