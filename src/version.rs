// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Braille YOLO API

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2026-08-31";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Braille YOLO API {} ({})", VERSION_NUMBER, BUILD_DATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        let version = get_version_string();
        assert!(version.contains(VERSION_NUMBER));
        assert!(version.contains(BUILD_DATE));
    }
}
