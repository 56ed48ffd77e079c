// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Braille object detection
//!
//! This module provides:
//! - The ONNX-backed YOLO detector and its pre/post-processing
//! - The shared load-once detector handle
//! - Detection result types and label aggregation
//!
//! Inference runs on CPU only.

pub mod handle;
pub mod labels;
pub mod model;
pub mod result;

use image::RgbImage;

pub use handle::{DetectorHandle, ModelUnavailable};
pub use labels::load_class_names;
pub use model::{
    YoloDetector, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_SIZE, DEFAULT_IOU_THRESHOLD,
};
pub use result::{BoundingBox, Detection, DetectionResult};

/// Seam between the request pipeline and the model backend. The HTTP
/// layer only ever sees this trait, so tests can swap in a stub.
pub trait Detector: std::fmt::Debug + Send + Sync {
    /// Run detection over one decoded image. Deterministic for a fixed
    /// input and threshold; may take an input-size-dependent while.
    fn detect(&self, image: &RgbImage) -> anyhow::Result<DetectionResult>;
}
