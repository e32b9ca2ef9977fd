// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction endpoint handler

use anyhow::{Context, Result};
use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::{read_image_field, ImageUpload};
use super::response::PredictResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::upload::StagedUpload;
use crate::vision::image_utils::{format_to_extension, load_image_file};
use crate::vision::{preprocess_image, Classifier, Diagnosis};

/// POST /predict - Classify a palm image for anemia
///
/// Accepts multipart form data with the image in the `image` file field.
///
/// # Response
/// - `isAnemic`: 1 if the anemic probability exceeds the threshold, else 0
/// - `confidence_level`: Confidence in the reported class, two decimals
///
/// # Errors
/// - 500 Internal Server Error: Model not loaded
/// - 400 Bad Request: No image file provided
/// - 413 Payload Too Large: Upload exceeds the body limit
/// - 500 Internal Server Error: Decoding or inference failed
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    // 1. Model must be loaded before anything else is looked at
    let classifier = state.classifier_manager.get_classifier().ok_or_else(|| {
        warn!("Prediction requested but classifier is not loaded");
        ApiError::ModelNotLoaded
    })?;

    // 2. Find the image file part
    let multipart = multipart.map_err(|e| {
        warn!("Rejected prediction request body: {}", e);
        ApiError::MissingImage
    })?;
    let upload = read_image_field(multipart).await?;

    // 3. Stage, decode, preprocess and classify off the async executor
    let upload_dir = state.upload_dir.clone();
    let threshold = state.threshold;
    let started = Instant::now();

    let diagnosis = tokio::task::spawn_blocking(move || {
        run_prediction(classifier.as_ref(), &upload_dir, &upload, threshold)
    })
    .await
    .map_err(|e| {
        warn!("Prediction task failed: {}", e);
        ApiError::ProcessingFailed(format!("Prediction task failed: {}", e))
    })?
    .map_err(|e| {
        warn!("Prediction failed: {:#}", e);
        ApiError::ProcessingFailed(format!("{:#}", e))
    })?;

    info!(
        "Prediction complete: isAnemic={} confidence={:.2} in {}ms",
        diagnosis.flag(),
        diagnosis.confidence_level,
        started.elapsed().as_millis()
    );

    Ok(Json(PredictResponse::from(diagnosis)))
}

/// Run one upload through the full pipeline
///
/// The upload is written to `upload_dir` for the duration of the call and
/// removed before returning, whatever the outcome.
pub fn run_prediction(
    classifier: &dyn Classifier,
    upload_dir: &Path,
    upload: &ImageUpload,
    threshold: f32,
) -> Result<Diagnosis> {
    let staged = StagedUpload::write(upload_dir, Some(&upload.filename), &upload.bytes)?;

    let (image, image_info) = load_image_file(staged.path())?;
    debug!(
        "Decoded {} image: {}x{}, {} bytes",
        format_to_extension(image_info.format),
        image_info.width,
        image_info.height,
        image_info.size_bytes
    );

    let tensor = preprocess_image(&image);

    let probability = classifier
        .predict(&tensor)
        .with_context(|| format!("Classifier '{}' failed", classifier.name()))?;
    debug!("Anemic probability: {}", probability);

    Diagnosis::from_probability(probability, threshold)
}
