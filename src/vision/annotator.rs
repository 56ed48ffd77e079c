// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Renders detection boxes and labels onto a copy of the input image

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

use anyhow::Context;

use crate::detection::DetectionResult;

/// Box outline thickness in pixels
const BOX_THICKNESS: i32 = 2;

/// Label text size
const LABEL_FONT_SIZE: f32 = 16.0;

/// Label background height
const LABEL_HEIGHT: i32 = 18;

/// Rough average label character width, for sizing the background
const LABEL_CHAR_WIDTH: f32 = 9.0;

/// Per-class box colors, cycled by class id
const PALETTE: [[u8; 3]; 6] = [
    [255, 56, 56],
    [50, 205, 50],
    [0, 128, 255],
    [255, 159, 0],
    [186, 85, 211],
    [0, 206, 209],
];

/// Draws detections for visual confirmation. Label text is rendered
/// only when a font file was configured; box outlines always are.
pub struct Annotator {
    font: Option<FontVec>,
    font_scale: PxScale,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator {
    /// Annotator without label text (boxes only)
    pub fn new() -> Self {
        Self {
            font: None,
            font_scale: PxScale::from(LABEL_FONT_SIZE),
        }
    }

    /// Annotator that also renders `label confidence` text, using a
    /// TrueType font loaded from disk.
    pub fn with_font_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font file {}", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .with_context(|| format!("Invalid font file {}", path.display()))?;

        Ok(Self {
            font: Some(font),
            font_scale: PxScale::from(LABEL_FONT_SIZE),
        })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every detection, in detection order, onto a fresh copy of
    /// the input. The input buffer is never touched.
    pub fn annotate(&self, image: &RgbImage, result: &DetectionResult) -> RgbImage {
        let mut canvas = image.clone();

        for detection in &result.detections {
            let color = Rgb(PALETTE[detection.class_id % PALETTE.len()]);
            self.draw_box(&mut canvas, detection.bbox.x1, detection.bbox.y1, detection.bbox.x2, detection.bbox.y2, color);

            if self.font.is_some() {
                let text = format!("{} {:.2}", detection.label, detection.confidence);
                self.draw_label(&mut canvas, detection.bbox.x1, detection.bbox.y1, &text, color);
            }
        }

        canvas
    }

    fn draw_box(&self, canvas: &mut RgbImage, x1: f32, y1: f32, x2: f32, y2: f32, color: Rgb<u8>) {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);

        let x1 = (x1.floor() as i32).clamp(0, w - 1);
        let y1 = (y1.floor() as i32).clamp(0, h - 1);
        let x2 = (x2.ceil() as i32).clamp(0, w - 1);
        let y2 = (y2.ceil() as i32).clamp(0, h - 1);
        if x1 >= x2 || y1 >= y2 {
            return;
        }

        for t in 0..BOX_THICKNESS {
            let (ix1, iy1) = ((x1 + t).min(w - 1), (y1 + t).min(h - 1));
            let (ix2, iy2) = ((x2 - t).max(0), (y2 - t).max(0));
            if ix1 >= ix2 || iy1 >= iy2 {
                break;
            }
            let rect = Rect::at(ix1, iy1).of_size((ix2 - ix1) as u32, (iy2 - iy1) as u32);
            imageproc::drawing::draw_hollow_rect_mut(canvas, rect, color);
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, x: f32, y: f32, text: &str, color: Rgb<u8>) {
        let font = match &self.font {
            Some(font) => font,
            None => return,
        };

        let (w, _h) = (canvas.width() as i32, canvas.height() as i32);
        let label_x = (x.floor() as i32).clamp(0, w - 1);
        // above the box when there is room, inside it otherwise
        let label_y = ((y.floor() as i32) - LABEL_HEIGHT).max(0);

        let text_width = (text.len() as f32 * LABEL_CHAR_WIDTH) as i32;
        let label_width = text_width.min(w - label_x);
        if label_width <= 0 {
            return;
        }

        let rect = Rect::at(label_x, label_y).of_size(label_width as u32, LABEL_HEIGHT as u32);
        draw_filled_rect_mut(canvas, rect, color);
        draw_text_mut(
            canvas,
            Rgb([255u8, 255u8, 255u8]),
            label_x,
            label_y + 1,
            self.font_scale,
            font,
            text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BoundingBox, Detection};
    use std::sync::Arc;

    fn result_with(detections: Vec<Detection>) -> DetectionResult {
        DetectionResult::new(detections, Arc::new(vec!["a".to_string()]))
    }

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            class_id: 0,
            label: "a".to_string(),
            confidence: 0.9,
            bbox: BoundingBox { x1, y1, x2, y2 },
        }
    }

    #[test]
    fn test_annotate_preserves_dimensions() {
        let image = RgbImage::new(64, 48);
        let annotated = Annotator::new().annotate(&image, &result_with(vec![detection(5.0, 5.0, 20.0, 20.0)]));
        assert_eq!((annotated.width(), annotated.height()), (64, 48));
    }

    #[test]
    fn test_annotate_does_not_mutate_input() {
        let image = RgbImage::from_pixel(32, 32, Rgb([7, 7, 7]));
        let before = image.clone();
        let _ = Annotator::new().annotate(&image, &result_with(vec![detection(2.0, 2.0, 30.0, 30.0)]));
        assert_eq!(image, before);
    }

    #[test]
    fn test_annotate_draws_box() {
        let image = RgbImage::new(32, 32);
        let annotated = Annotator::new().annotate(&image, &result_with(vec![detection(2.0, 2.0, 30.0, 30.0)]));
        assert_ne!(annotated, image);
    }

    #[test]
    fn test_annotate_no_detections_is_plain_copy() {
        let image = RgbImage::from_pixel(16, 16, Rgb([1, 2, 3]));
        let annotated = Annotator::new().annotate(&image, &result_with(vec![]));
        assert_eq!(annotated, image);
    }

    #[test]
    fn test_annotate_is_deterministic() {
        let image = RgbImage::new(32, 32);
        let result = result_with(vec![detection(2.0, 2.0, 30.0, 30.0), detection(8.0, 8.0, 16.0, 16.0)]);
        let annotator = Annotator::new();
        assert_eq!(annotator.annotate(&image, &result), annotator.annotate(&image, &result));
    }

    #[test]
    fn test_annotate_clamps_out_of_bounds_boxes() {
        let image = RgbImage::new(16, 16);
        // must not panic
        let _ = Annotator::new().annotate(&image, &result_with(vec![detection(-10.0, -10.0, 100.0, 100.0)]));
    }

    #[test]
    fn test_with_font_file_missing() {
        assert!(Annotator::with_font_file("/nonexistent/font.ttf").is_err());
    }
}
