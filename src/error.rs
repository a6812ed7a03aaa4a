use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the detection pipeline and its collaborators.
///
/// Only genuinely fatal conditions live here. Expected outcomes are plain
/// values instead: zero detections is an empty result list, an unreadable
/// text region is simply excluded, and a malformed catalog record is
/// skipped during loading.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not a valid image path: {}", .0.display())]
    InvalidImagePath(PathBuf),

    #[error("unsupported image extension: {} (expected one of {})", .0.display(), .1)]
    UnsupportedExtension(PathBuf, &'static str),

    #[error("OCR models not found in {}: expected {detection} and {recognition}", .dir.display())]
    OcrModelsMissing {
        dir: PathBuf,
        detection: String,
        recognition: String,
    },

    #[error("failed to load OCR model: {0}")]
    OcrModelLoad(String),

    #[error("catalog file not found: {}", .0.display())]
    CatalogMissing(PathBuf),

    #[error("catalog has no usable entries: {}", .0.display())]
    CatalogEmpty(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog parse error: {0}")]
    CatalogFormat(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
