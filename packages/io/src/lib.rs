#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! File I/O for polling-station geocoding: reading casilla records and
//! the section → municipality table, writing GeoJSON, and the prepare
//! step that enriches the nested JSON export.

pub mod output;
pub mod paths;
pub mod prepare;
pub mod records;
pub mod sections;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from reading or writing data files.
#[derive(Debug, Error)]
pub enum DataError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A required input file does not exist.
    #[error("Input file not found: {}", path.display())]
    MissingInput {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The file parsed but does not have the expected shape.
    #[error("Invalid data in {}: {message}", path.display())]
    Invalid {
        /// File being read.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },
}

/// Fails with [`DataError::MissingInput`] unless `path` is an existing file.
///
/// # Errors
///
/// Returns [`DataError::MissingInput`] if the file does not exist.
pub fn require_file(path: &Path) -> Result<(), DataError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DataError::MissingInput {
            path: path.to_path_buf(),
        })
    }
}

/// Text of a JSON scalar: strings as-is, numbers and booleans formatted,
/// anything else empty.
pub(crate) fn value_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
