// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Threshold rule turning a classifier probability into a diagnosis

use anyhow::Result;

/// Probability above which an image is reported as anemic
pub const ANEMIA_THRESHOLD: f32 = 0.75;

/// Outcome of classifying a single palm image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnosis {
    /// Whether the positive (anemic) class was reported
    pub is_anemic: bool,
    /// Confidence in the reported class, as a percentage (0-100)
    pub confidence_level: f64,
}

impl Diagnosis {
    /// Apply the threshold rule to the positive-class probability
    ///
    /// Strictly above `threshold` reports positive with `p * 100`;
    /// anything else reports negative with `(1 - p) * 100`.
    pub fn from_probability(probability: f32, threshold: f32) -> Result<Self> {
        if !probability.is_finite() {
            anyhow::bail!("Classifier returned a non-finite probability: {}", probability);
        }

        // Percentages are computed in f32, the precision the model emits
        let diagnosis = if probability > threshold {
            Self {
                is_anemic: true,
                confidence_level: (probability * 100.0) as f64,
            }
        } else {
            Self {
                is_anemic: false,
                confidence_level: ((1.0 - probability) * 100.0) as f64,
            }
        };

        Ok(diagnosis)
    }

    /// Label as the integer flag used on the wire
    pub fn flag(&self) -> u8 {
        u8::from(self.is_anemic)
    }

    /// Confidence truncated and rendered with two decimals
    pub fn formatted_confidence(&self) -> String {
        format_confidence(self.confidence_level)
    }
}

/// Truncate (never round) a percentage to two decimal places
pub fn truncate_confidence(confidence: f64) -> f64 {
    (confidence * 100.0).trunc() / 100.0
}

/// Render a percentage with exactly two decimals after truncation
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}", truncate_confidence(confidence))
}
