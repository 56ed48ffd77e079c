// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction endpoint handler

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::{debug, info, warn};

use super::response::PredictResponse;
use crate::api::auth::authorize;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::encoder::{encode_jpeg_base64, persist_result};
use crate::vision::image_utils::decode_image_bytes;

/// POST /predict - Detect braille cells in an uploaded image
///
/// Accepts a multipart form with the image under an `image` (or `file`)
/// field and returns the annotated image, the detected labels in
/// detection order, and the summary string built from them.
///
/// # Errors
/// - 400 Bad Request: no image field, empty upload, or undecodable image
/// - 401 Unauthorized: bearer token required but missing or wrong
/// - 500 Internal Server Error: model load, inference, or encoding failure
pub async fn predict_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let started = Instant::now();

    // 1. Authenticate before touching the payload
    authorize(&headers, state.config.auth_token.as_deref())?;

    // 2. Pull the image bytes out of the multipart form. Accepted
    //    field names come from config; when a form carries more than
    //    one accepted field, the configured precedence order decides,
    //    not the order the fields appear in the form.
    let mut uploads: Vec<(String, Bytes)> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidImageFormat(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if state.config.upload_fields.iter().any(|f| f == &name)
            && !uploads.iter().any(|(n, _)| n == &name)
        {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidImageFormat(e.to_string()))?;
            debug!("Received {} bytes in field '{}'", data.len(), name);
            uploads.push((name, data));
        }
    }
    let image_bytes = state
        .config
        .upload_fields
        .iter()
        .find_map(|accepted| {
            uploads
                .iter()
                .find(|(name, _)| name == accepted)
                .map(|(_, data)| data.clone())
        })
        .ok_or(ApiError::MissingInput)?;

    // 3. Decode and validate the upload
    let (image, image_info) = decode_image_bytes(&image_bytes, state.config.max_upload_size)?;
    debug!(
        "Decoded image: {}x{} {:?}, {} bytes",
        image_info.width, image_info.height, image_info.format, image_info.size_bytes
    );

    // 4. Get the detector, loading it on first use
    let detector = state.detector.acquire().await?;

    // 5. Run detection
    let result = detector.detect(&image).map_err(|e| {
        warn!("Inference failed: {}", e);
        ApiError::InferenceFailure(e.to_string())
    })?;

    // 6. Annotate and summarize
    let annotated = state.annotator.annotate(&image, &result);
    let labels = result.labels();
    let summary = result.summary();

    // 7. Encode the annotated image, persisting a copy when configured
    let result_image = encode_jpeg_base64(&annotated)?;
    let result_path = match &state.config.results_dir {
        Some(dir) => {
            let path = persist_result(&annotated, dir)?;
            Some(path.to_string_lossy().into_owned())
        }
        None => None,
    };

    let processing_time_ms = started.elapsed().as_millis() as u64;
    info!(
        "Prediction complete: {} detections, summary '{}', {}ms",
        labels.len(),
        summary,
        processing_time_ms
    );

    Ok(Json(PredictResponse {
        result_image,
        labels,
        summary,
        result_path,
        processing_time_ms,
    }))
}
