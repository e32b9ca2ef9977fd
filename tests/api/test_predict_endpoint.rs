// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Prediction endpoint tests for POST /predict
//!
//! These tests drive the full router with an in-memory classifier and verify:
//! - Missing model is reported before the body is looked at
//! - Missing image field yields the missing-file error
//! - The 0.75 threshold rule and two-decimal confidence formatting
//! - The staged upload is removed after every request

use anemia_detector_node::{
    api::{create_app, AppState},
    vision::{Classifier, ClassifierModelManager},
};
use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use serde_json::Value;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

const BOUNDARY: &str = "----palm-test-boundary";

/// Classifier returning a fixed probability and counting calls
struct FixedClassifier {
    probability: f32,
    calls: AtomicUsize,
}

impl FixedClassifier {
    fn new(probability: f32) -> Arc<Self> {
        Arc::new(Self {
            probability,
            calls: AtomicUsize::new(0),
        })
    }
}

impl Classifier for FixedClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<f32> {
        assert_eq!(input.shape(), &[1, 224, 224, 3]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.probability)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn predict(&self, _input: &Array4<f32>) -> Result<f32> {
        anyhow::bail!("inference backend unavailable")
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Classifier that inspects the upload directory while it runs
///
/// Records every file present at inference time together with its content.
struct StagingObserver {
    upload_dir: PathBuf,
    seen: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

impl StagingObserver {
    fn new(upload_dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            upload_dir,
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl Classifier for StagingObserver {
    fn predict(&self, _input: &Array4<f32>) -> Result<f32> {
        let mut seen = self.seen.lock().unwrap();
        for entry in std::fs::read_dir(&self.upload_dir)? {
            let path = entry?.path();
            let content = std::fs::read(&path)?;
            seen.push((path, content));
        }
        Ok(0.9)
    }

    fn name(&self) -> &str {
        "staging_observer"
    }
}

/// Helper: state with the given classifier staging uploads in `dir`
fn state_with(classifier: Option<Arc<dyn Classifier>>, dir: &TempDir) -> AppState {
    let manager = match classifier {
        Some(c) => ClassifierModelManager::with_classifier(c),
        None => ClassifierModelManager::empty(),
    };
    let mut state = AppState::new_for_test();
    state.classifier_manager = Arc::new(manager);
    state.upload_dir = dir.path().to_path_buf();
    state
}

fn app_with(classifier: Option<Arc<dyn Classifier>>, dir: &TempDir) -> Router {
    create_app(Arc::new(state_with(classifier, dir)))
}

fn palm_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([190, 90, 100])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Build a multipart body with a single file part
fn file_part_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();
    (status, json)
}

fn assert_dir_empty(dir: &TempDir) {
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert!(leftovers.is_empty(), "staged files left behind: {:?}", leftovers);
}

#[cfg(test)]
mod predict_endpoint_tests {
    use super::*;

    // =============================================================================
    // Error paths
    // =============================================================================

    /// Test 1: No model loaded returns 500 even when an image is sent
    #[tokio::test]
    async fn test_model_not_loaded() {
        let dir = TempDir::new().unwrap();
        let app = app_with(None, &dir);

        let body = file_part_body("image", "palm.png", &palm_png());
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Model not loaded");
        assert_dir_empty(&dir);
    }

    /// Test 2: Model check happens before the missing-file check
    #[tokio::test]
    async fn test_model_not_loaded_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let app = app_with(None, &dir);

        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Model not loaded");
    }

    /// Test 3: Multipart body without an image field
    #[tokio::test]
    async fn test_missing_image_field() {
        let dir = TempDir::new().unwrap();
        let classifier = FixedClassifier::new(0.9);
        let app = app_with(Some(classifier.clone()), &dir);

        let body = file_part_body("photo", "palm.png", &palm_png());
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No image file provided");
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_dir_empty(&dir);
    }

    /// Test 4: Non-multipart request is treated as a missing file
    #[tokio::test]
    async fn test_non_multipart_request() {
        let dir = TempDir::new().unwrap();
        let app = app_with(Some(FixedClassifier::new(0.9)), &dir);

        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"image": "abc"}"#))
            .unwrap();
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No image file provided");
    }

    /// Test 5: Undecodable upload yields 500 and is still cleaned up
    #[tokio::test]
    async fn test_invalid_image_cleans_up() {
        let dir = TempDir::new().unwrap();
        let app = app_with(Some(FixedClassifier::new(0.9)), &dir);

        let body = file_part_body("image", "palm.png", b"this is not an image");
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("Unsupported image format"));
        assert_dir_empty(&dir);
    }

    /// Test 6: Empty upload yields 500 and is still cleaned up
    #[tokio::test]
    async fn test_empty_image_cleans_up() {
        let dir = TempDir::new().unwrap();
        let app = app_with(Some(FixedClassifier::new(0.9)), &dir);

        let body = file_part_body("image", "palm.png", b"");
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("empty"));
        assert_dir_empty(&dir);
    }

    /// Test 7: Inference failure yields 500 with the error message
    #[tokio::test]
    async fn test_inference_failure_cleans_up() {
        let dir = TempDir::new().unwrap();
        let app = app_with(Some(Arc::new(FailingClassifier)), &dir);

        let body = file_part_body("image", "palm.png", &palm_png());
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("inference backend unavailable"));
        assert_dir_empty(&dir);
    }

    /// Test 8: Body over the configured limit is rejected with 413
    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let dir = TempDir::new().unwrap();
        let classifier = FixedClassifier::new(0.9);
        let mut state = state_with(Some(classifier.clone()), &dir);
        state.max_upload_bytes = 1024;
        let app = create_app(Arc::new(state));

        let body = file_part_body("image", "palm.png", &vec![0x89u8; 64 * 1024]);
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"], "Image upload too large");
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_dir_empty(&dir);
    }

    // =============================================================================
    // Success paths
    // =============================================================================

    /// Test 9: Probability above threshold reports anemic with p * 100
    #[tokio::test]
    async fn test_anemic_prediction() {
        let dir = TempDir::new().unwrap();
        let classifier = FixedClassifier::new(0.875);
        let app = app_with(Some(classifier.clone()), &dir);

        let body = file_part_body("image", "palm.png", &palm_png());
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["isAnemic"], 1);
        assert_eq!(json["confidence_level"], "87.50");
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_dir_empty(&dir);
    }

    /// Test 10: Probability at or below threshold reports the complement
    #[tokio::test]
    async fn test_not_anemic_prediction() {
        let dir = TempDir::new().unwrap();
        let app = app_with(Some(FixedClassifier::new(0.75)), &dir);

        let body = file_part_body("image", "palm.png", &palm_png());
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["isAnemic"], 0);
        assert_eq!(json["confidence_level"], "25.00");
        assert_dir_empty(&dir);
    }

    /// Test 11: Confidence is truncated, not rounded
    #[tokio::test]
    async fn test_confidence_truncated() {
        let dir = TempDir::new().unwrap();
        let app = app_with(Some(FixedClassifier::new(0.99999)), &dir);

        let body = file_part_body("image", "palm.png", &palm_png());
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["confidence_level"], "99.99");
    }

    /// Test 12: Response has exactly the two documented fields
    #[tokio::test]
    async fn test_response_shape() {
        let dir = TempDir::new().unwrap();
        let app = app_with(Some(FixedClassifier::new(0.1)), &dir);

        let body = file_part_body("image", "palm.png", &palm_png());
        let (_, json) = send(app, multipart_request(body)).await;

        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object["isAnemic"].is_u64());
        let confidence = object["confidence_level"].as_str().unwrap();
        assert_eq!(confidence.split_once('.').unwrap().1.len(), 2);
    }

    /// Test 13: Hostile filenames never escape the upload directory
    #[tokio::test]
    async fn test_path_traversal_filename() {
        let outer = TempDir::new().unwrap();
        let uploads = TempDir::new_in(outer.path()).unwrap();
        let app = app_with(Some(FixedClassifier::new(0.9)), &uploads);

        let body = file_part_body("image", "../../escape.png", &palm_png());
        let (status, _) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_dir_empty(&uploads);
        let outer_entries = std::fs::read_dir(outer.path()).unwrap().count();
        assert_eq!(outer_entries, 1, "only the uploads dir should exist");
    }

    /// Test 14: Concurrent uploads sharing a filename are isolated
    #[tokio::test]
    async fn test_concurrent_same_filename() {
        let dir = TempDir::new().unwrap();
        let classifier = FixedClassifier::new(0.9);
        let app = app_with(Some(classifier.clone()), &dir);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                let body = file_part_body("image", "palm.png", &palm_png());
                send(app, multipart_request(body)).await
            }));
        }

        for handle in handles {
            let (status, json) = handle.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["isAnemic"], 1);
        }
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 8);
        assert_dir_empty(&dir);
    }

    /// Test 15: Raised body limit admits images above the old 10 MiB cap
    #[tokio::test]
    async fn test_raised_limit_accepts_large_image() {
        let dir = TempDir::new().unwrap();
        let classifier = FixedClassifier::new(0.9);
        let mut state = state_with(Some(classifier.clone()), &dir);
        state.max_upload_bytes = 16 * 1024 * 1024;
        let app = create_app(Arc::new(state));

        // 2000 x 2000 RGB bitmap, just over 12 MB
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2000, 2000, Rgb([180, 80, 90])));
        let mut bmp = Vec::new();
        img.write_to(&mut Cursor::new(&mut bmp), ImageFormat::Bmp)
            .unwrap();
        assert!(bmp.len() > 10 * 1024 * 1024);

        let body = file_part_body("image", "palm.bmp", &bmp);
        let (status, json) = send(app, multipart_request(body)).await;

        assert_eq!(status, StatusCode::OK, "unexpected body {}", json);
        assert_eq!(json["isAnemic"], 1);
        assert_eq!(json["confidence_level"], "90.00");
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_dir_empty(&dir);
    }

    /// Test 16: Upload is on disk during inference and gone afterwards
    #[tokio::test]
    async fn test_upload_staged_then_removed() {
        let dir = TempDir::new().unwrap();
        let observer = StagingObserver::new(dir.path().to_path_buf());
        let app = app_with(Some(observer.clone()), &dir);

        let png = palm_png();
        let body = file_part_body("image", "palm.png", &png);
        let (status, _) = send(app, multipart_request(body)).await;
        assert_eq!(status, StatusCode::OK);

        let seen = observer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1, "expected exactly one staged file");

        let (path, content) = &seen[0];
        assert_eq!(path.parent().unwrap(), dir.path());
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("palm-"), "unexpected name {}", name);
        assert!(name.ends_with(".png"), "unexpected name {}", name);
        assert_eq!(content, &png);

        assert!(!path.exists());
        assert_dir_empty(&dir);
    }
}
