// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request-level error taxonomy
//!
//! Every pipeline stage failure is converted here into the wire shape
//! `{"error": "<message>"}` with the appropriate status. Messages never
//! carry backtraces or internal paths.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detection::handle::ModelUnavailable;
use crate::vision::{EncodeError, ImageError};

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    /// No accepted file field was present in the upload
    MissingInput,
    /// Uploaded bytes could not be decoded as an image
    InvalidImageFormat(String),
    /// Bearer token mismatched or absent while auth is enabled
    Unauthorized,
    /// Detector is failed or could not be loaded
    ModelUnavailable(String),
    /// The underlying detection call raised
    InferenceFailure(String),
    /// Annotation or response encoding raised
    EncodingFailure(String),
    /// Anything unclassified; surfaced as a generic 500
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingInput | ApiError::InvalidImageFormat(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::ModelUnavailable(_)
            | ApiError::InferenceFailure(_)
            | ApiError::EncodingFailure(_)
            | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MissingInput => write!(f, "No image uploaded"),
            ApiError::InvalidImageFormat(msg) => write!(f, "Invalid image format: {}", msg),
            ApiError::Unauthorized => write!(f, "Invalid or missing bearer token"),
            ApiError::ModelUnavailable(msg) => {
                write!(f, "Detection model is not available: {}", msg)
            }
            ApiError::InferenceFailure(msg) => write!(f, "Detection failed: {}", msg),
            ApiError::EncodingFailure(msg) => {
                write!(f, "Failed to encode result image: {}", msg)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            // an empty upload is treated the same as a missing one
            ImageError::EmptyData => ApiError::MissingInput,
            other => ApiError::InvalidImageFormat(other.to_string()),
        }
    }
}

impl From<ModelUnavailable> for ApiError {
    fn from(err: ModelUnavailable) -> Self {
        ApiError::ModelUnavailable(err.0)
    }
}

impl From<EncodeError> for ApiError {
    fn from(err: EncodeError) -> Self {
        ApiError::EncodingFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::MissingInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidImageFormat("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::ModelUnavailable("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::InferenceFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::EncodingFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_input_wire_message() {
        // clients match on this exact string
        assert_eq!(ApiError::MissingInput.to_string(), "No image uploaded");
    }

    #[test]
    fn test_error_body_shape() {
        let body = ApiError::MissingInput.to_response();
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"No image uploaded"}"#);
    }

    #[test]
    fn test_empty_upload_maps_to_missing_input() {
        let err: ApiError = ImageError::EmptyData.into();
        assert!(matches!(err, ApiError::MissingInput));
    }

    #[test]
    fn test_bad_bytes_map_to_invalid_format() {
        let err: ApiError = ImageError::UnsupportedFormat.into();
        assert!(matches!(err, ApiError::InvalidImageFormat(_)));
    }
}
