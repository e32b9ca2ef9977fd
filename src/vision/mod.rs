// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for palm image classification
//!
//! This module provides:
//! - Image decoding and format sniffing
//! - Preprocessing into the classifier's input tensor
//! - The ONNX classifier and its start-up manager
//! - The threshold rule producing a diagnosis
//!
//! Inference runs on CPU only.

pub mod classifier;
pub mod decision;
pub mod image_utils;
pub mod model_manager;
pub mod preprocessing;

pub use classifier::{Classifier, OnnxAnemiaClassifier};
pub use decision::{format_confidence, truncate_confidence, Diagnosis, ANEMIA_THRESHOLD};
pub use image_utils::{decode_image_bytes, detect_format, load_image_file, ImageError, ImageInfo};
pub use model_manager::{ClassifierConfig, ClassifierModelInfo, ClassifierModelManager};
pub use preprocessing::{preprocess_image, INPUT_SHAPE, INPUT_SIZE};
