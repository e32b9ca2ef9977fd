// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Palm image classifier
//!
//! Wraps the ONNX export of the pretrained anemia classifier. The model takes
//! a preprocessed `[1, 224, 224, 3]` tensor and emits a single sigmoid
//! probability for the anemic class.

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::INPUT_SHAPE;

/// A binary image classifier returning the positive-class probability
pub trait Classifier: Send + Sync {
    /// Run the forward pass on a preprocessed image tensor
    fn predict(&self, input: &Array4<f32>) -> Result<f32>;

    /// Model name for logging and health reporting
    fn name(&self) -> &str;
}

/// ONNX Runtime backed anemia classifier
///
/// Runs on CPU only. The session is shared behind a mutex since a run
/// needs exclusive access.
#[derive(Clone)]
pub struct OnnxAnemiaClassifier {
    session: Arc<Mutex<Session>>,
    input_name: String,
    model_name: String,
}

impl std::fmt::Debug for OnnxAnemiaClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxAnemiaClassifier")
            .field("input_name", &self.input_name)
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl OnnxAnemiaClassifier {
    /// Load the classifier from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - Model declares no inputs
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Classifier model not found: {}", model_path.display());
        }

        info!("Loading anemia classifier from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load classifier model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("Classifier model declares no inputs")?;

        if let Some(input) = session.inputs.first() {
            debug!("Classifier input {}: {:?}", input_name, input.input_type);
        }
        if let Some(output) = session.outputs.first() {
            debug!("Classifier output {}: {:?}", output.name, output.output_type);
        }

        let model_name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "anemia_classifier".to_string());

        info!("✅ Anemia classifier loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            model_name,
        })
    }
}

impl Classifier for OnnxAnemiaClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<f32> {
        if input.shape() != INPUT_SHAPE {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected {:?}",
                input.shape(),
                INPUT_SHAPE
            );
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Classifier session lock poisoned"))?;

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Classifier inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Classifier output shape: {:?}", output_tensor.shape());

        // Sigmoid head: first element of the first row is the anemic probability
        let probability = output_tensor
            .iter()
            .next()
            .copied()
            .context("Classifier returned an empty output")?;

        Ok(probability)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
