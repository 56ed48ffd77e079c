// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! All knobs come from environment variables with working defaults, so
//! a bare `cargo run` next to the model files starts a usable service.

use std::env;
use std::path::PathBuf;

use crate::detection::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_SIZE, DEFAULT_IOU_THRESHOLD};
use crate::vision::image_utils::DEFAULT_MAX_IMAGE_SIZE;

/// Runtime configuration for the detection service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Path to the exported ONNX detection model
    pub model_path: PathBuf,
    /// Path to the class-name file (one label per line)
    pub labels_path: PathBuf,
    /// Minimum confidence for a detection to survive
    pub confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression
    pub iou_threshold: f32,
    /// Square model input size
    pub input_size: u32,
    /// Shared-secret bearer token; `None` disables authentication
    pub auth_token: Option<String>,
    /// CORS origins; `*` allows any
    pub cors_allowed_origins: Vec<String>,
    /// Directory for persisted annotated images; `None` disables persistence
    pub results_dir: Option<PathBuf>,
    /// TrueType font for label text; `None` draws boxes only
    pub font_path: Option<PathBuf>,
    /// Maximum accepted upload size in bytes
    pub max_upload_size: usize,
    /// Accepted multipart field names, in precedence order
    pub upload_fields: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            model_path: PathBuf::from("./models/best.onnx"),
            labels_path: PathBuf::from("./models/labels.txt"),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            input_size: DEFAULT_INPUT_SIZE,
            auth_token: None,
            cors_allowed_origins: vec!["*".to_string()],
            results_dir: None,
            font_path: None,
            max_upload_size: DEFAULT_MAX_IMAGE_SIZE,
            upload_fields: vec!["image".to_string(), "file".to_string()],
        }
    }
}

impl ServiceConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("API_PORT").unwrap_or_else(|_| "5000".to_string());

        Self {
            listen_addr: format!("0.0.0.0:{}", port),
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            labels_path: env::var("LABELS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.labels_path),
            confidence_threshold: env::var("CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.confidence_threshold),
            iou_threshold: env::var("IOU_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.iou_threshold),
            input_size: env::var("MODEL_INPUT_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.input_size),
            auth_token: env::var("PREDICT_AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_allowed_origins),
            results_dir: env::var("RESULTS_DIR").ok().filter(|d| !d.is_empty()).map(PathBuf::from),
            font_path: env::var("FONT_PATH").ok().filter(|p| !p.is_empty()).map(PathBuf::from),
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_size),
            upload_fields: defaults.upload_fields,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(format!(
                "IoU threshold must be within [0, 1], got {}",
                self.iou_threshold
            ));
        }
        if self.max_upload_size == 0 {
            return Err("max upload size must be greater than 0".to_string());
        }
        if self.upload_fields.is_empty() {
            return Err("at least one upload field name is required".to_string());
        }
        Ok(())
    }

    /// Whether bearer authentication is enabled
    pub fn auth_enabled(&self) -> bool {
        self.auth_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:5000");
        assert_eq!(config.confidence_threshold, 0.25);
        assert_eq!(config.upload_fields, vec!["image", "file"]);
        assert!(!config.auth_enabled());
        assert!(config.results_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_threshold() {
        let config = ServiceConfig {
            confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_no_upload_fields() {
        let config = ServiceConfig {
            upload_fields: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auth_enabled() {
        let config = ServiceConfig {
            auth_token: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(config.auth_enabled());
    }
}
