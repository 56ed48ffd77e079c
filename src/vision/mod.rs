// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image ingestion, annotation and output encoding
//!
//! This module provides:
//! - Decoding of uploaded bytes into canonical RGB buffers
//! - Rendering of detection boxes/labels for visual confirmation
//! - Encoding of the annotated image for the wire response

pub mod annotator;
pub mod encoder;
pub mod image_utils;

pub use annotator::Annotator;
pub use encoder::{encode_jpeg_base64, persist_result, EncodeError, RESULT_FILE_NAME};
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo};
