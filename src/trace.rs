//! Stage snapshot dumps for inspecting intermediate pipeline images.
//! Each save writes a numbered PNG (`00_working.png`, `01_edges.png`, ...)
//! into the trace directory; failures are logged and never abort a run.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use image::{GrayImage, RgbImage};
use tracing::{debug, warn};

use crate::error::Result;

pub struct StageTrace {
    dir: PathBuf,
    counter: AtomicU32,
}

impl StageTrace {
    /// Create the trace directory (and parents) and start numbering at 00.
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            counter: AtomicU32::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self, stage: &str) -> PathBuf {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("{seq:02}_{stage}.png"))
    }

    pub fn save_gray(&self, stage: &str, image: &GrayImage) {
        let path = self.next_path(stage);
        match image.save(&path) {
            Ok(()) => debug!(path = %path.display(), "saved stage snapshot"),
            Err(err) => warn!(path = %path.display(), %err, "failed to save stage snapshot"),
        }
    }

    pub fn save_rgb(&self, stage: &str, image: &RgbImage) {
        let path = self.next_path(stage);
        match image.save(&path) {
            Ok(()) => debug!(path = %path.display(), "saved stage snapshot"),
            Err(err) => warn!(path = %path.display(), %err, "failed to save stage snapshot"),
        }
    }
}
