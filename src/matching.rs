//! Fuzzy matching of OCR output against catalog names.
//!
//! Uses bigram Dice similarity over normalized text, scored 0..=100;
//! candidates below the configured threshold are rejected.

use strsim::sorensen_dice;
use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry};

/// Lowercase the text and replace every non-alphanumeric character with a
/// space. The similarity metric ignores whitespace, so this makes scoring
/// insensitive to case, punctuation, and spacing.
fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect()
}

/// Bigram Dice similarity between OCR text and a catalog name, 0..=100.
pub(crate) fn score(ocr_text: &str, name: &str) -> f64 {
    sorensen_dice(&normalize(ocr_text), &normalize(name)) * 100.0
}

/// Scores OCR text against every catalog name.
pub struct FuzzyMatcher<'a> {
    catalog: &'a Catalog,
    min_similarity: f64,
}

impl<'a> FuzzyMatcher<'a> {
    pub fn new(catalog: &'a Catalog, min_similarity: f64) -> Self {
        Self {
            catalog,
            min_similarity,
        }
    }

    /// Best-scoring catalog entry at or above the similarity threshold.
    ///
    /// Returns `None` for blank text or when nothing clears the threshold.
    /// Ties are broken by name, ascending, so identical inputs always pick
    /// the same entry regardless of catalog order.
    pub fn best_match(&self, ocr_text: &str) -> Option<(&'a CatalogEntry, f64)> {
        if normalize(ocr_text).trim().is_empty() {
            return None;
        }

        let mut best: Option<(&CatalogEntry, f64)> = None;
        for entry in self.catalog.entries() {
            let candidate = score(ocr_text, &entry.name);
            if candidate < self.min_similarity {
                continue;
            }
            let better = match best {
                None => true,
                Some((cur, cur_score)) => {
                    candidate > cur_score || (candidate == cur_score && entry.name < cur.name)
                }
            };
            if better {
                best = Some((entry, candidate));
            }
        }

        if let Some((entry, s)) = best {
            debug!(text = ocr_text, name = %entry.name, score = s, "matched catalog entry");
        } else {
            debug!(text = ocr_text, "no catalog entry above threshold");
        }
        best
    }
}
