// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction response types

use serde::{Deserialize, Serialize};

use crate::vision::Diagnosis;

/// Response from a successful prediction
///
/// Field names are fixed by the web client: `isAnemic` is an integer flag
/// and `confidence_level` a percentage string with two decimals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    /// 1 when the image is classified as anemic, otherwise 0
    #[serde(rename = "isAnemic")]
    pub is_anemic: u8,
    /// Confidence in the reported class, e.g. "87.50"
    pub confidence_level: String,
}

impl From<Diagnosis> for PredictResponse {
    fn from(diagnosis: Diagnosis) -> Self {
        Self {
            is_anemic: diagnosis.flag(),
            confidence_level: diagnosis.formatted_confidence(),
        }
    }
}
