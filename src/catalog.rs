//! Card catalog loading.
//!
//! Parses the top-level `data` array of the catalog JSON; records missing
//! `id` or `name` are skipped with a warning rather than failing the load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One known card. `name` is the fuzzy-match key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: u64,
    pub name: String,
    /// Reference artwork URL, if the record carried one.
    pub image_url: Option<String>,
}

/// The full reference list of known cards.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct RawCatalog {
    data: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawEntry {
    id: u64,
    name: String,
    #[serde(default)]
    card_images: Vec<RawImage>,
}

#[derive(Deserialize)]
struct RawImage {
    image_url: Option<String>,
}

impl Catalog {
    /// Load a catalog document from disk.
    ///
    /// A missing file or an unparseable document is fatal; individual
    /// malformed records are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::CatalogMissing(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let parsed: RawCatalog = serde_json::from_str(&raw)?;

        let total = parsed.data.len();
        let mut entries = Vec::with_capacity(total);
        for (idx, value) in parsed.data.into_iter().enumerate() {
            match serde_json::from_value::<RawEntry>(value) {
                Ok(rec) => entries.push(CatalogEntry {
                    id: rec.id,
                    name: rec.name,
                    image_url: rec.card_images.into_iter().find_map(|i| i.image_url),
                }),
                Err(err) => {
                    warn!(record = idx, %err, "skipping malformed catalog record");
                }
            }
        }

        if entries.is_empty() {
            return Err(Error::CatalogEmpty(path.to_path_buf()));
        }
        debug!(usable = entries.len(), total, "catalog loaded");
        Ok(Self { entries })
    }

    /// Build a catalog directly from entries (used by tests and embedders).
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
