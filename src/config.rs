use std::time::Duration;

use crate::error::{Error, Result};

/// Tunables for the detection pipeline.
///
/// The reference constants were measured against sample photos taken at
/// arm's length under indoor lighting; two calibration sets were in
/// circulation (750px working size with a 750x90 OCR canvas and
/// similarity floor 70, versus 1000px with 1000x70 and floor 80). The
/// defaults here are the 750px set; every field can be overridden
/// independently.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Side length of the square working image the input is resized to.
    pub working_size: u32,
    /// Odd Gaussian kernel size used before edge detection.
    pub blur_kernel: u32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// L-inf radius of the square dilation closing edge gaps
    /// (radius 4 = 9x9 kernel).
    pub dilate_radius: u8,
    /// How many of the largest contours are considered as candidates.
    pub max_candidates: usize,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub approx_tolerance: f64,
    /// Minimum bounding-box side (working-image pixels) for a quad to be
    /// rectified; smaller detections are treated as noise.
    pub min_box_size: u32,
    /// Vertical band of the rectified card holding the printed name,
    /// as fractions of card height.
    pub name_band_top: f32,
    pub name_band_bottom: f32,
    /// Horizontal span of the name plate, as fractions of card width.
    pub name_span_left: f32,
    pub name_span_right: f32,
    /// Canvas the name plate is resized to before OCR.
    pub ocr_canvas_w: u32,
    pub ocr_canvas_h: u32,
    /// Similarity floor (0-100) below which a catalog candidate is ignored.
    pub min_similarity: f64,
    /// Upper bound on a single OCR invocation.
    pub ocr_timeout: Duration,
}

impl DetectorConfig {
    pub fn new() -> Self {
        Self {
            working_size: 750,
            blur_kernel: 9,
            canny_low: 50.0,
            canny_high: 100.0,
            dilate_radius: 4,
            max_candidates: 5,
            approx_tolerance: 0.05,
            min_box_size: 100,
            name_band_top: 1.0 / 15.0,
            name_band_bottom: 1.0 / 7.7,
            name_span_left: 0.05,
            name_span_right: 0.75,
            ocr_canvas_w: 750,
            ocr_canvas_h: 90,
            min_similarity: 70.0,
            ocr_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_working_size(mut self, size: u32) -> Self {
        self.working_size = size;
        self
    }

    pub fn with_min_similarity(mut self, floor: f64) -> Self {
        self.min_similarity = floor;
        self
    }

    pub fn with_min_box_size(mut self, size: u32) -> Self {
        self.min_box_size = size;
        self
    }

    pub fn with_ocr_canvas(mut self, w: u32, h: u32) -> Self {
        self.ocr_canvas_w = w;
        self.ocr_canvas_h = h;
        self
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.working_size == 0 {
            return Err(Error::InvalidConfig("working_size must be non-zero".into()));
        }
        if self.blur_kernel % 2 == 0 || self.blur_kernel == 0 {
            return Err(Error::InvalidConfig(format!(
                "blur_kernel must be odd, got {}",
                self.blur_kernel
            )));
        }
        if self.canny_low >= self.canny_high {
            return Err(Error::InvalidConfig(format!(
                "canny_low ({}) must be below canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if !(0.0..1.0).contains(&self.approx_tolerance) || self.approx_tolerance == 0.0 {
            return Err(Error::InvalidConfig(format!(
                "approx_tolerance must be in (0, 1), got {}",
                self.approx_tolerance
            )));
        }
        if self.name_band_top >= self.name_band_bottom {
            return Err(Error::InvalidConfig(format!(
                "name band is inverted: top {} >= bottom {}",
                self.name_band_top, self.name_band_bottom
            )));
        }
        if self.name_span_left >= self.name_span_right {
            return Err(Error::InvalidConfig(format!(
                "name span is inverted: left {} >= right {}",
                self.name_span_left, self.name_span_right
            )));
        }
        if self.name_band_bottom > 1.0 || self.name_span_right > 1.0 {
            return Err(Error::InvalidConfig(
                "name plate ratios must not exceed 1.0".into(),
            ));
        }
        if self.ocr_canvas_w == 0 || self.ocr_canvas_h == 0 {
            return Err(Error::InvalidConfig("OCR canvas must be non-empty".into()));
        }
        if !(0.0..=100.0).contains(&self.min_similarity) {
            return Err(Error::InvalidConfig(format!(
                "min_similarity must be within 0-100, got {}",
                self.min_similarity
            )));
        }
        Ok(())
    }

    /// Gaussian sigma matching an OpenCV-style odd kernel of this size.
    pub(crate) fn blur_sigma(&self) -> f32 {
        let k = self.blur_kernel as f32;
        0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}
