use image::RgbImage;
use imageproc::point::Point;
use serde::Serialize;

use crate::catalog::CatalogEntry;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Image resized to the canonical working resolution, plus the per-axis
/// coefficients mapping working coordinates back to the original image.
///
/// Every quadrilateral produced by the pipeline is in working-image space
/// until explicitly rescaled by `(coef_x, coef_y)`.
pub struct WorkingImage {
    pub image: RgbImage,
    /// original_width / working_width
    pub coef_x: f32,
    /// original_height / working_height
    pub coef_y: f32,
}

/// A contour approximated to exactly four vertices, in working-image space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quad {
    pub points: [Point<i32>; 4],
}

impl Quad {
    pub fn new(points: [Point<i32>; 4]) -> Self {
        Self { points }
    }

    /// Representative point used for the nesting test (first vertex).
    pub fn anchor(&self) -> Point<i32> {
        self.points[0]
    }

    /// Axis-aligned bounding box of the four vertices.
    pub fn bounding_box(&self) -> BoundingBox {
        let min_x = self.points.iter().map(|p| p.x).min().unwrap_or(0).max(0);
        let min_y = self.points.iter().map(|p| p.y).min().unwrap_or(0).max(0);
        let max_x = self.points.iter().map(|p| p.x).max().unwrap_or(0).max(0);
        let max_y = self.points.iter().map(|p| p.y).max().unwrap_or(0).max(0);
        BoundingBox {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        }
    }

    /// Strict point-in-polygon test by ray casting. Points on the boundary
    /// do not count as inside.
    pub fn contains(&self, p: Point<i32>) -> bool {
        let (px, py) = (p.x as f64, p.y as f64);
        let mut inside = false;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            let (ax, ay) = (a.x as f64, a.y as f64);
            let (bx, by) = (b.x as f64, b.y as f64);

            // A point sitting on edge a-b is outside by definition.
            let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
            if cross.abs() < 1e-9
                && px >= ax.min(bx)
                && px <= ax.max(bx)
                && py >= ay.min(by)
                && py <= ay.max(by)
            {
                return false;
            }

            if (ay > py) != (by > py) {
                let x_cross = ax + (py - ay) / (by - ay) * (bx - ax);
                if px < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Rescale every vertex from working-image space to original-image space.
    pub fn rescale(&self, coef_x: f32, coef_y: f32) -> Quad {
        let points = self.points.map(|p| Point {
            x: (p.x as f32 * coef_x).round() as i32,
            y: (p.y as f32 * coef_y).round() as i32,
        });
        Quad { points }
    }
}

/// Card region warped to an upright rectangle, with the residual skew
/// rotation that was applied afterwards (0.0 when none was needed).
pub struct RectifiedCard {
    pub image: RgbImage,
    pub skew_angle: f32,
}

/// Name-plate crop of a rectified card, resized to the canonical OCR canvas.
pub struct TextRegion {
    pub image: RgbImage,
}

/// A quadrilateral successfully resolved against the catalog.
#[derive(Debug, Clone)]
pub struct CardMatch {
    /// Detected quad, still in working-image space.
    pub quad: Quad,
    pub entry: CatalogEntry,
    /// Similarity between OCR text and the entry name, 0-100.
    pub score: f64,
}

/// Original-scale bounding box plus label, ready for rendering or
/// serialization. Produced from a `CardMatch` by the annotator.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub bbox: BoundingBox,
    pub label: String,
    pub card_id: u64,
    pub score: f64,
}
