// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotated-image encoding for the wire response
//!
//! The annotated image always travels embedded as base64 JPEG. When a
//! results directory is configured it is additionally written to
//! `<dir>/<uuid>/result.jpg` so callers can fetch it by path.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// File name used for persisted annotated images
pub const RESULT_FILE_NAME: &str = "result.jpg";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Failed to encode result image: {0}")]
    Encode(String),

    #[error("Failed to persist result image: {0}")]
    Persist(#[from] std::io::Error),
}

/// Encode the annotated image as base64 JPEG for embedding in JSON
pub fn encode_jpeg_base64(image: &RgbImage) -> Result<String, EncodeError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| EncodeError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(buf.into_inner()))
}

/// Write the annotated image under a fresh per-request directory and
/// return the full path of the written file.
pub fn persist_result(image: &RgbImage, results_dir: &Path) -> Result<PathBuf, EncodeError> {
    let dir = results_dir.join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&dir)?;

    let path = dir.join(RESULT_FILE_NAME);
    image
        .save_with_format(&path, ImageFormat::Jpeg)
        .map_err(|e| EncodeError::Encode(e.to_string()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_jpeg() {
        let image = RgbImage::new(8, 8);
        let encoded = encode_jpeg_base64(&image).unwrap();

        let bytes = STANDARD.decode(encoded).unwrap();
        // JPEG magic: FF D8 FF
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let image = RgbImage::new(8, 8);
        assert_eq!(
            encode_jpeg_base64(&image).unwrap(),
            encode_jpeg_base64(&image).unwrap()
        );
    }

    #[test]
    fn test_persist_writes_result_jpg() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::new(8, 8);

        let path = persist_result(&image, dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap(), RESULT_FILE_NAME);
        assert_eq!(path.parent().unwrap().parent().unwrap(), dir.path());
    }

    #[test]
    fn test_persist_uses_fresh_directories() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::new(8, 8);

        let a = persist_result(&image, dir.path()).unwrap();
        let b = persist_result(&image, dir.path()).unwrap();
        assert_ne!(a, b);
    }
}
