// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO braille detection model
//!
//! Wraps an exported Ultralytics ONNX model. The raw output head is
//! `[1, 4 + num_classes, num_anchors]` with xywh boxes in letterboxed
//! input coordinates; decoding and non-maximum suppression happen here.

use anyhow::{Context, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayViewD, IxDyn};
use ort::ep::CPU as CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

use super::result::{BoundingBox, Detection, DetectionResult};
use super::Detector;

/// Default confidence threshold applied by the detector
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Default IoU threshold for non-maximum suppression
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Default model input size (square)
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Gray padding value used when letterboxing, normalized
const PAD_VALUE: f32 = 114.0 / 255.0;

/// A candidate box in letterboxed input coordinates, before rescaling
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// YOLO braille detection model
///
/// Inference runs on CPU only. The ort session is held behind a mutex,
/// so concurrent requests serialize at `run()`; `Session::run` needs
/// exclusive access and correctness wins over throughput here.
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Closed class-name table, fixed at load time
    class_names: Arc<Vec<String>>,
    /// Confidence threshold for detections
    confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression
    iou_threshold: f32,
    /// Square input size the model was exported with
    input_size: u32,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("num_classes", &self.class_names.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detection model from an ONNX file
    ///
    /// # Errors
    /// Returns error if the model file is missing, ONNX Runtime fails to
    /// initialize, or the class-name table is empty.
    pub fn load<P: AsRef<Path>>(model_path: P, class_names: Vec<String>) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }
        if class_names.is_empty() {
            anyhow::bail!("Class-name table is empty");
        }

        info!("Loading braille detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .unwrap_or_else(|| "images".to_string());

        debug!(
            "Detection model loaded - input: {}, classes: {}",
            input_name,
            class_names.len()
        );

        info!("✅ Braille detection model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            class_names: Arc::new(class_names),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            input_size: DEFAULT_INPUT_SIZE,
        })
    }

    /// Set the confidence threshold for detections
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the IoU threshold for non-maximum suppression
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the square input size the model expects
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size.max(32);
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn class_names(&self) -> Arc<Vec<String>> {
        self.class_names.clone()
    }

    fn run_model(&self, input: Array4<f32>) -> Result<Vec<Candidate>> {
        let mut session = self.session.lock().unwrap();

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        decode_output(
            output.view(),
            self.class_names.len(),
            self.confidence_threshold,
        )
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &RgbImage) -> Result<DetectionResult> {
        let t = Instant::now();

        let (input, scale) = letterbox(image, self.input_size);
        let candidates = self.run_model(input)?;
        let kept = non_max_suppression(candidates, self.iou_threshold);

        let (orig_w, orig_h) = (image.width() as f32, image.height() as f32);
        let detections: Vec<Detection> = kept
            .into_iter()
            .map(|c| {
                let label = self
                    .class_names
                    .get(c.class_id)
                    .cloned()
                    .unwrap_or_else(|| c.class_id.to_string());
                Detection {
                    class_id: c.class_id,
                    label,
                    confidence: c.confidence,
                    bbox: BoundingBox {
                        x1: (c.bbox.x1 / scale).clamp(0.0, orig_w),
                        y1: (c.bbox.y1 / scale).clamp(0.0, orig_h),
                        x2: (c.bbox.x2 / scale).clamp(0.0, orig_w),
                        y2: (c.bbox.y2 / scale).clamp(0.0, orig_h),
                    },
                }
            })
            .collect();

        debug!(
            "Detection complete: {} objects in {:?} ({}x{} input)",
            detections.len(),
            t.elapsed(),
            image.width(),
            image.height()
        );

        Ok(DetectionResult::new(detections, self.class_names.clone()))
    }
}

/// Resize with preserved aspect ratio onto a gray square canvas,
/// anchored top-left, and normalize into an NCHW tensor.
///
/// Returns the tensor and the scale that maps original coordinates into
/// letterbox coordinates (divide model output by it to undo).
pub(crate) fn letterbox(image: &RgbImage, size: u32) -> (Array4<f32>, f32) {
    let (w, h) = (image.width(), image.height());
    let scale = (size as f32 / w as f32).min(size as f32 / h as f32);
    let nw = ((w as f32 * scale).round() as u32).clamp(1, size);
    let nh = ((h as f32 * scale).round() as u32).clamp(1, size);

    let resized = image::imageops::resize(image, nw, nh, FilterType::Triangle);

    let s = size as usize;
    let mut input = Array4::<f32>::from_elem((1, 3, s, s), PAD_VALUE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        input[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }

    (input, scale)
}

/// Decode the raw `[1, 4 + nc, anchors]` output head into candidates
/// above the confidence threshold. Boxes stay in letterbox coordinates.
pub(crate) fn decode_output(
    output: ArrayViewD<f32>,
    num_classes: usize,
    confidence_threshold: f32,
) -> Result<Vec<Candidate>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] != 4 + num_classes {
        anyhow::bail!(
            "Unexpected output shape {:?}, expected [1, {}, N]",
            shape,
            4 + num_classes
        );
    }

    let anchors = shape[2];
    let mut candidates = Vec::new();

    for a in 0..anchors {
        let mut class_id = 0usize;
        let mut confidence = 0f32;
        for c in 0..num_classes {
            let score = output[IxDyn(&[0, 4 + c, a])];
            if score > confidence {
                confidence = score;
                class_id = c;
            }
        }

        if confidence < confidence_threshold {
            continue;
        }

        let cx = output[IxDyn(&[0, 0, a])];
        let cy = output[IxDyn(&[0, 1, a])];
        let w = output[IxDyn(&[0, 2, a])];
        let h = output[IxDyn(&[0, 3, a])];

        candidates.push(Candidate {
            class_id,
            confidence,
            bbox: BoundingBox {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
            },
        });
    }

    Ok(candidates)
}

/// Class-aware non-maximum suppression. Output is ordered by descending
/// confidence; downstream aggregation treats that as detection order.
pub(crate) fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut suppressed = vec![false; candidates.len()];
    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            if suppressed[j] || candidates[i].class_id != candidates[j].class_id {
                continue;
            }
            if candidates[i].bbox.iou(&candidates[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    let mut keep = suppressed.iter();
    candidates.retain(|_| !keep.next().unwrap());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    const MODEL_PATH: &str = "./models/best.onnx";

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox { x1, y1, x2, y2 }
    }

    #[test]
    fn test_letterbox_landscape() {
        let image = RgbImage::new(200, 100);
        let (input, scale) = letterbox(&image, 640);
        assert_eq!(input.shape(), &[1, 3, 640, 640]);
        assert!((scale - 3.2).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_pads_with_gray() {
        let image = RgbImage::new(100, 50);
        let (input, _) = letterbox(&image, 640);
        // bottom half of the canvas is padding
        assert!((input[[0, 0, 639, 639]] - PAD_VALUE).abs() < 1e-6);
        // top-left is covered by the (black) image
        assert!(input[[0, 0, 0, 0]].abs() < 1e-6);
    }

    #[test]
    fn test_decode_output_filters_by_confidence() {
        // 2 classes, 2 anchors: one confident hit, one below threshold
        let data = vec![
            100.0, 300.0, // cx
            100.0, 300.0, // cy
            20.0, 20.0, // w
            20.0, 20.0, // h
            0.9, 0.1, // class 0 scores
            0.2, 0.05, // class 1 scores
        ];
        let output = ArrayD::from_shape_vec(IxDyn(&[1, 6, 2]), data).unwrap();

        let candidates = decode_output(output.view(), 2, 0.25).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].class_id, 0);
        assert!((candidates[0].confidence - 0.9).abs() < 1e-6);
        assert!((candidates[0].bbox.x1 - 90.0).abs() < 1e-6);
        assert!((candidates[0].bbox.x2 - 110.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_output_picks_best_class() {
        let data = vec![
            50.0, // cx
            50.0, // cy
            10.0, // w
            10.0, // h
            0.3,  // class 0
            0.8,  // class 1
        ];
        let output = ArrayD::from_shape_vec(IxDyn(&[1, 6, 1]), data).unwrap();

        let candidates = decode_output(output.view(), 2, 0.25).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].class_id, 1);
    }

    #[test]
    fn test_decode_output_rejects_bad_shape() {
        let output = ArrayD::from_shape_vec(IxDyn(&[1, 5]), vec![0.0; 5]).unwrap();
        assert!(decode_output(output.view(), 2, 0.25).is_err());
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let candidates = vec![
            Candidate {
                class_id: 0,
                confidence: 0.9,
                bbox: bbox(0.0, 0.0, 10.0, 10.0),
            },
            Candidate {
                class_id: 0,
                confidence: 0.8,
                bbox: bbox(1.0, 1.0, 11.0, 11.0),
            },
        ];
        let kept = non_max_suppression(candidates, 0.45);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_class() {
        let candidates = vec![
            Candidate {
                class_id: 0,
                confidence: 0.9,
                bbox: bbox(0.0, 0.0, 10.0, 10.0),
            },
            Candidate {
                class_id: 1,
                confidence: 0.8,
                bbox: bbox(1.0, 1.0, 11.0, 11.0),
            },
        ];
        let kept = non_max_suppression(candidates, 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_orders_by_confidence() {
        let candidates = vec![
            Candidate {
                class_id: 0,
                confidence: 0.5,
                bbox: bbox(0.0, 0.0, 10.0, 10.0),
            },
            Candidate {
                class_id: 1,
                confidence: 0.9,
                bbox: bbox(100.0, 100.0, 110.0, 110.0),
            },
        ];
        let kept = non_max_suppression(candidates, 0.45);
        assert_eq!(kept[0].class_id, 1);
        assert_eq!(kept[1].class_id, 0);
    }

    #[test]
    fn test_load_model_not_found() {
        let result = YoloDetector::load("/nonexistent/best.onnx", vec!["a".to_string()]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    #[ignore] // Only run if model weights are downloaded
    fn test_detect_on_real_model() {
        let class_names: Vec<String> = (b'a'..=b'z').map(|c| (c as char).to_string()).collect();
        let detector = match YoloDetector::load(MODEL_PATH, class_names) {
            Ok(d) => d,
            Err(_) => return, // Skip if weights not available
        };

        let image = RgbImage::new(640, 640);
        let result = detector.detect(&image).unwrap();
        // A blank image should produce no confident detections
        assert!(result.is_empty() || result.detections.iter().all(|d| d.confidence < 0.5));
    }
}
