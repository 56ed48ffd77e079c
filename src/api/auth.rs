// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared-secret bearer authentication
//!
//! Checked before any decoding or inference work. When no token is
//! configured, every request passes.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use super::errors::ApiError;

/// Verify the `Authorization: Bearer <token>` header against the
/// configured shared secret, if one is set.
pub fn authorize(headers: &HeaderMap, expected_token: Option<&str>) -> Result<(), ApiError> {
    let expected = match expected_token {
        Some(token) => token,
        None => return Ok(()),
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    if provided != expected {
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}
