// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use braille_yolo_api::api::http_server::{start_server, AppState};
use braille_yolo_api::config::ServiceConfig;
use braille_yolo_api::detection::labels::load_class_names;
use braille_yolo_api::detection::{Detector, DetectorHandle, YoloDetector};
use braille_yolo_api::version;
use braille_yolo_api::vision::Annotator;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting {}", version::get_version_string());

    let config = ServiceConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    info!(
        "Model: {}, labels: {}, confidence threshold: {}",
        config.model_path.display(),
        config.labels_path.display(),
        config.confidence_threshold
    );

    let annotator = match &config.font_path {
        Some(path) => Annotator::with_font_file(path)
            .with_context(|| format!("Failed to load font from {}", path.display()))?,
        None => Annotator::new(),
    };

    // Model loading is deferred to first use; the loader closure
    // captures everything it needs from the config.
    let model_path = config.model_path.clone();
    let labels_path = config.labels_path.clone();
    let confidence_threshold = config.confidence_threshold;
    let iou_threshold = config.iou_threshold;
    let input_size = config.input_size;
    let detector = DetectorHandle::new(move || {
        let class_names = load_class_names(&labels_path)?;
        info!("Loaded {} class names", class_names.len());
        let detector = YoloDetector::load(&model_path, class_names)?
            .with_confidence_threshold(confidence_threshold)
            .with_iou_threshold(iou_threshold)
            .with_input_size(input_size);
        Ok(Arc::new(detector) as Arc<dyn Detector>)
    });

    let state = AppState {
        config: Arc::new(config),
        detector: Arc::new(detector),
        annotator: Arc::new(annotator),
    };

    // Eager warm-up so the first request does not pay the load cost.
    // A failure here is terminal for /predict but the liveness
    // endpoint should still come up.
    if let Err(e) = state.detector.warm_up().await {
        warn!("Model warm-up failed: {}", e);
    }

    start_server(state).await
}
