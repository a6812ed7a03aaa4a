pub mod annotate;
pub mod catalog;
pub mod config;
pub mod detection;
pub mod downloader;
pub mod error;
pub mod matching;
pub mod models;
pub mod trace;

pub use catalog::{Catalog, CatalogEntry};
pub use config::DetectorConfig;
pub use detection::ocr::{OcrsRecognizer, TextRecognizer};
pub use detection::{CardDetector, Detection};
pub use error::{Error, Result};
pub use models::{Annotation, BoundingBox, CardMatch, Quad};
pub use trace::StageTrace;
