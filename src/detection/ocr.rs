//! Text recognition over the prepared name-plate canvas.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use image::RgbImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tracing::warn;

use crate::error::{Error, Result};

const DETECTION_MODEL: &str = "text-detection.rten";
const RECOGNITION_MODEL: &str = "text-recognition.rten";

/// Reads the printed text off a name-plate canvas.
///
/// The pipeline depends only on this seam, so the engine backing can be
/// swapped and tests can substitute a canned recognizer.
pub trait TextRecognizer: Send + Sync {
    /// Extract the single printed line from the region.
    ///
    /// An unreadable region is an empty string, not an error; the caller
    /// drops the candidate and moves on.
    fn recognize_line(&self, region: &RgbImage) -> String;
}

/// Default model cache (`~/.cache/ocrs`), shared with the ocrs CLI tools.
pub fn default_models_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| Error::OcrModelLoad("no home directory to locate the model cache".into()))?;
    Ok(Path::new(&home).join(".cache").join("ocrs"))
}

/// `TextRecognizer` backed by the ocrs engine with rten models.
pub struct OcrsRecognizer {
    engine: Arc<OcrEngine>,
    timeout: Duration,
}

impl OcrsRecognizer {
    /// Load the detection and recognition models from `dir`.
    ///
    /// Both model files must be present; pipelines cannot run partially
    /// without recognition, so a missing file is fatal here rather than a
    /// silent no-text result later.
    pub fn load(dir: &Path, timeout: Duration) -> Result<Self> {
        let detection_path = dir.join(DETECTION_MODEL);
        let recognition_path = dir.join(RECOGNITION_MODEL);
        if !detection_path.exists() || !recognition_path.exists() {
            return Err(Error::OcrModelsMissing {
                dir: dir.to_path_buf(),
                detection: DETECTION_MODEL.to_string(),
                recognition: RECOGNITION_MODEL.to_string(),
            });
        }

        let detection_model =
            Model::load_file(&detection_path).map_err(|e| Error::OcrModelLoad(e.to_string()))?;
        let recognition_model =
            Model::load_file(&recognition_path).map_err(|e| Error::OcrModelLoad(e.to_string()))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| Error::OcrModelLoad(e.to_string()))?;

        Ok(Self {
            engine: Arc::new(engine),
            timeout,
        })
    }
}

impl std::fmt::Debug for OcrsRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // OcrEngine has no Debug impl, so only the timeout is shown.
        f.debug_struct("OcrsRecognizer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TextRecognizer for OcrsRecognizer {
    fn recognize_line(&self, region: &RgbImage) -> String {
        // The engine runs on a worker so a stuck inference cannot wedge
        // the whole run. A timed-out worker finishes in the background and
        // its result is discarded.
        let engine = Arc::clone(&self.engine);
        let image = region.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(run_engine(&engine, &image));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(text) => text,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.timeout, "OCR timed out, treating region as unreadable");
                String::new()
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!("OCR worker died, treating region as unreadable");
                String::new()
            }
        }
    }
}

fn run_engine(engine: &OcrEngine, img: &RgbImage) -> String {
    let source = match ImageSource::from_bytes(img.as_raw(), img.dimensions()) {
        Ok(source) => source,
        Err(err) => {
            warn!(%err, "could not build OCR input");
            return String::new();
        }
    };
    let input = match engine.prepare_input(source) {
        Ok(input) => input,
        Err(err) => {
            warn!(%err, "could not prepare OCR input");
            return String::new();
        }
    };
    match engine.get_text(&input) {
        Ok(text) => collapse_to_line(&text),
        Err(err) => {
            warn!(%err, "OCR failed");
            String::new()
        }
    }
}

/// The name plate holds one printed line; whatever the engine split into
/// fragments is stitched back together with single spaces.
fn collapse_to_line(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
