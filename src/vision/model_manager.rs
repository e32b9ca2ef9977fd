// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Classifier model manager for start-up loading

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::vision::classifier::{Classifier, OnnxAnemiaClassifier};

/// Default location of the exported classifier
pub const DEFAULT_MODEL_PATH: &str = "./models/anemia_classifier.onnx";

/// Configuration for loading the classifier
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Path to the ONNX model file (optional)
    pub model_path: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: Some(DEFAULT_MODEL_PATH.to_string()),
        }
    }
}

/// Information about the classifier slot, reported by /health
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierModelInfo {
    /// Model name
    pub name: String,
    /// Model type
    pub model_type: String,
    /// Whether the model is available
    pub available: bool,
}

/// Holds the process-wide, read-only classifier
///
/// Loaded once at start-up. A missing or broken artifact leaves the slot
/// empty so the service keeps running and reports "model not loaded".
pub struct ClassifierModelManager {
    classifier: Option<Arc<dyn Classifier>>,
}

impl ClassifierModelManager {
    /// Load the classifier described by `config`
    ///
    /// Load failures are logged and degrade to an empty slot.
    pub fn new(config: ClassifierConfig) -> Self {
        let classifier = if let Some(ref path) = config.model_path {
            match OnnxAnemiaClassifier::new(path) {
                Ok(model) => {
                    tracing::info!("✅ Anemia classifier loaded from {}", path);
                    Some(Arc::new(model) as Arc<dyn Classifier>)
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to load classifier from {}: {:#}", path, e);
                    None
                }
            }
        } else {
            None
        };

        Self { classifier }
    }

    /// Manager with no classifier loaded
    pub fn empty() -> Self {
        Self { classifier: None }
    }

    /// Manager wrapping an already constructed classifier
    pub fn with_classifier(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier: Some(classifier),
        }
    }

    /// Get the classifier if available
    pub fn get_classifier(&self) -> Option<Arc<dyn Classifier>> {
        self.classifier.clone()
    }

    /// Check if the classifier is available
    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// List the classifier slot
    pub fn list_models(&self) -> Vec<ClassifierModelInfo> {
        vec![ClassifierModelInfo {
            name: self
                .classifier
                .as_ref()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "anemia_classifier".to_string()),
            model_type: "image-classification".to_string(),
            available: self.classifier.is_some(),
        }]
    }
}
