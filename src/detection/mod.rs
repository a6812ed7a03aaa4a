//! Card detection pipeline: working-scale preprocessing, quad candidates,
//! then per candidate warp, deskew, name-plate OCR, and catalog lookup.
//! Candidates drop out quietly; only broken inputs are errors.

pub mod contours;
pub mod ocr;
pub mod preprocessing;
pub mod rectify;

use std::path::Path;
use std::sync::Arc;

use image::RgbImage;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::DetectorConfig;
use crate::error::Result;
use crate::matching::FuzzyMatcher;
use crate::models::{CardMatch, Quad};
use crate::trace::StageTrace;
use ocr::TextRecognizer;

/// Everything recognized in one photo, with the coefficients needed to
/// map working-space quads back onto the original image.
#[derive(Debug)]
pub struct Detection {
    pub matches: Vec<CardMatch>,
    pub coef_x: f32,
    pub coef_y: f32,
}

/// Detection pipeline orchestrator.
///
/// Holds the tunables, the card catalog, and the text recognizer; one
/// instance serves any number of photos.
pub struct CardDetector {
    config: DetectorConfig,
    catalog: Catalog,
    recognizer: Arc<dyn TextRecognizer>,
}

impl CardDetector {
    pub fn new(
        config: DetectorConfig,
        catalog: Catalog,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            catalog,
            recognizer,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Load a photo from disk and run detection on it.
    pub fn detect_path(&self, path: &Path, trace: Option<&StageTrace>) -> Result<Detection> {
        let img = preprocessing::load_image(path)?;
        info!(path = %path.display(), width = img.width(), height = img.height(), "loaded photo");
        Ok(self.detect(&img, trace))
    }

    /// Run detection on an already loaded photo.
    pub fn detect(&self, img: &RgbImage, trace: Option<&StageTrace>) -> Detection {
        let working = preprocessing::resize_to_working(img, self.config.working_size);
        if let Some(trace) = trace {
            trace.save_rgb("working", &working.image);
        }

        let edges = preprocessing::edge_map(&working.image, &self.config);
        if let Some(trace) = trace {
            trace.save_gray("edges", &edges);
        }

        let candidates = contours::quad_candidates(
            &edges,
            self.config.max_candidates,
            self.config.approx_tolerance,
        );
        info!(candidates = candidates.len(), "quadrilateral candidates");

        let matcher = FuzzyMatcher::new(&self.catalog, self.config.min_similarity);
        let mut matches = Vec::new();
        for (idx, quad) in candidates.into_iter().enumerate() {
            if let Some(card_match) = self.process_candidate(idx, quad, &working.image, &matcher, trace)
            {
                matches.push(card_match);
            }
        }

        info!(matches = matches.len(), "detection finished");
        Detection {
            matches,
            coef_x: working.coef_x,
            coef_y: working.coef_y,
        }
    }

    /// Take one candidate quad through rectification, OCR, and catalog
    /// lookup. Any stage may disqualify the candidate.
    fn process_candidate(
        &self,
        idx: usize,
        quad: Quad,
        working: &RgbImage,
        matcher: &FuzzyMatcher<'_>,
        trace: Option<&StageTrace>,
    ) -> Option<CardMatch> {
        let bbox = quad.bounding_box();
        if bbox.width <= self.config.min_box_size || bbox.height <= self.config.min_box_size {
            debug!(idx, ?bbox, "candidate below minimum size");
            return None;
        }

        let upright = match rectify::rectify_quad(working, &quad) {
            Some(img) => img,
            None => {
                debug!(idx, "candidate has no perspective transform");
                return None;
            }
        };
        if let Some(trace) = trace {
            trace.save_rgb(&format!("card{idx}_rectified"), &upright);
        }

        let card = rectify::deskew(upright);
        if card.skew_angle != 0.0 {
            debug!(idx, angle = card.skew_angle, "applied skew correction");
            if let Some(trace) = trace {
                trace.save_rgb(&format!("card{idx}_deskewed"), &card.image);
            }
        }

        let plate = match rectify::extract_name_plate(&card.image, &self.config) {
            Some(plate) => plate,
            None => {
                debug!(idx, "candidate too small for a name plate");
                return None;
            }
        };
        if let Some(trace) = trace {
            trace.save_rgb(&format!("card{idx}_name_plate"), &plate.image);
        }

        let text = self.recognizer.recognize_line(&plate.image);
        if text.is_empty() {
            debug!(idx, "no text read from name plate");
            return None;
        }
        debug!(idx, text, "name plate text");

        let (entry, score) = matcher.best_match(&text)?;
        info!(idx, name = %entry.name, score, "card identified");
        Some(CardMatch {
            quad,
            entry: entry.clone(),
            score,
        })
    }
}
