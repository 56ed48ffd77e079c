// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection result types and label aggregation

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in original image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection-over-union with another box, 0.0 when disjoint
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// One identified object instance. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Index into the detector's class-name table
    pub class_id: usize,
    /// Resolved class name
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Box location in original image coordinates
    pub bbox: BoundingBox,
}

/// Ordered detections for one request, plus the class-name table they
/// were resolved against. Order is the order the model produced them
/// (confidence-descending after suppression), never re-sorted here.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
    class_names: Arc<Vec<String>>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>, class_names: Arc<Vec<String>>) -> Self {
        Self {
            detections,
            class_names,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Label of each detection, in detection order
    pub fn labels(&self) -> Vec<String> {
        self.detections.iter().map(|d| d.label.clone()).collect()
    }

    /// Derived transcription: the uppercased first character of each
    /// label, in detection order, no separators. Empty string for zero
    /// detections. Clients depend on this exact rule.
    pub fn summary(&self) -> String {
        self.detections
            .iter()
            .filter_map(|d| d.label.chars().next())
            .flat_map(|c| c.to_uppercase())
            .collect()
    }
}
