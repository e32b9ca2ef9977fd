// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction API endpoint module
//!
//! Provides POST /predict for classifying an uploaded palm image.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{predict_handler, run_prediction};
pub use request::{read_image_field, ImageUpload, IMAGE_FIELD};
pub use response::PredictResponse;
