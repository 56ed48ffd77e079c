// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class-name table loading
//!
//! The label set is closed at model-load time: one class name per line,
//! line number = class id.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

/// Read the class-name file into a vector so the numeric ids coming out
/// of the inference session can be given meaning.
pub fn load_class_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open class-name file {}", path.display()))?;

    let names: Vec<String> = BufReader::new(file)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read class-name file {}", path.display()))?
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if names.is_empty() {
        anyhow::bail!("Class-name file {} contains no labels", path.display());
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_class_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a\nb\nc").unwrap();

        let names = load_class_names(file.path()).unwrap();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_skips_blank_lines_and_trims() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  a  \n\nb\n   ").unwrap();

        let names = load_class_names(file.path()).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_class_names("/nonexistent/labels.txt");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = load_class_names(file.path());
        assert!(result.is_err());
    }
}
