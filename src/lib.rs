// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod detection;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{build_router, ApiError, AppState, PredictResponse};
pub use config::ServiceConfig;
pub use detection::{
    BoundingBox, Detection, DetectionResult, Detector, DetectorHandle, YoloDetector,
};
pub use vision::{decode_image_bytes, Annotator, ImageError};
