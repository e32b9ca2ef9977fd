// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction request extraction from multipart form data

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use tracing::{debug, warn};

use crate::api::errors::ApiError;

/// Multipart field carrying the image file
pub const IMAGE_FIELD: &str = "image";

/// The image file part of a prediction request
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Filename as sent by the client (unsanitized)
    pub filename: String,
    /// Raw file content
    pub bytes: Vec<u8>,
}

/// Pull the first `image` file part out of a multipart body
///
/// Only parts that carry a filename count as files; a plain text field
/// named `image` is ignored. Other fields are skipped.
pub async fn read_image_field(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_string) else {
            debug!("Ignoring non-file '{}' field", IMAGE_FIELD);
            continue;
        };

        let bytes = field.bytes().await.map_err(multipart_error)?;
        debug!("Received upload '{}' ({} bytes)", filename, bytes.len());

        return Ok(ImageUpload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::MissingImage)
}

fn multipart_error(err: MultipartError) -> ApiError {
    warn!("Failed to read multipart body: {}", err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::MissingImage
    }
}
