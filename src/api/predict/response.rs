// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction response body

use serde::{Deserialize, Serialize};

/// JSON body returned by `POST /predict` on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Annotated result image as base64-encoded JPEG
    pub result_image: String,
    /// Detected class labels in detection order
    pub labels: Vec<String>,
    /// Uppercased first character of each label, concatenated in
    /// detection order
    pub summary: String,
    /// Path the annotated image was persisted to, when persistence
    /// is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    /// End-to-end handler time in milliseconds
    pub processing_time_ms: u64,
}
