//! Perspective rectification, skew correction, and name-plate cropping.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::edges::canny;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::hough::{detect_lines, LineDetectionOptions};
use tracing::{debug, warn};

use crate::config::DetectorConfig;
use crate::models::{Quad, RectifiedCard, TextRegion};

/// Rotations smaller than this are not worth resampling for.
const MIN_DESKEW_ANGLE_DEG: f32 = 0.1;

const SKEW_CANNY_LOW: f32 = 50.0;
const SKEW_CANNY_HIGH: f32 = 100.0;

/// Order the vertices of a convex quad as top-left, top-right,
/// bottom-right, bottom-left.
///
/// The top-left corner minimizes x+y and the bottom-right maximizes it;
/// the top-right minimizes y-x and the bottom-left maximizes it.
fn order_corners(quad: &Quad) -> [(f32, f32); 4] {
    let pts = quad.points.map(|p| (p.x as f32, p.y as f32));
    let mut tl = pts[0];
    let mut tr = pts[0];
    let mut br = pts[0];
    let mut bl = pts[0];
    for &p in &pts[1..] {
        if p.0 + p.1 < tl.0 + tl.1 {
            tl = p;
        }
        if p.0 + p.1 > br.0 + br.1 {
            br = p;
        }
        if p.1 - p.0 < tr.1 - tr.0 {
            tr = p;
        }
        if p.1 - p.0 > bl.1 - bl.0 {
            bl = p;
        }
    }
    [tl, tr, br, bl]
}

fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Warp the region enclosed by `quad` to an upright rectangle.
///
/// The destination size follows the longer of each opposing edge pair, so
/// a card seen at an angle keeps its apparent proportions. Returns `None`
/// when the corners are degenerate (collinear or coincident) and no
/// perspective transform exists.
pub fn rectify_quad(working: &RgbImage, quad: &Quad) -> Option<RgbImage> {
    let [tl, tr, br, bl] = order_corners(quad);

    let width = dist(br, bl).max(dist(tr, tl)).round().max(1.0);
    let height = dist(tr, br).max(dist(tl, bl)).round().max(1.0);
    let dst = [
        (0.0, 0.0),
        (width - 1.0, 0.0),
        (width - 1.0, height - 1.0),
        (0.0, height - 1.0),
    ];

    let projection = match Projection::from_control_points([tl, tr, br, bl], dst) {
        Some(p) => p,
        None => {
            warn!(corners = ?quad.points, "degenerate quad, no perspective transform");
            return None;
        }
    };

    let mut out = RgbImage::new(width as u32, height as u32);
    warp_into(
        working,
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut out,
    );
    Some(out)
}

/// Fold a Hough line angle into its deviation from the nearest image
/// axis, in degrees within [-45, 45).
fn axis_deviation(angle_in_degrees: u32) -> f32 {
    let dev = (angle_in_degrees % 90) as f32;
    if dev >= 45.0 {
        dev - 90.0
    } else {
        dev
    }
}

fn median(mut values: Vec<f32>) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Estimate the residual rotation of a rectified card, in degrees.
/// Positive values mean the content leans clockwise.
///
/// Line segments (text baselines, frame borders) are detected on an edge
/// map and their angles folded against the nearest axis; the median keeps
/// outlier segments from dragging the estimate. Returns 0.0 when no lines
/// are found.
pub fn estimate_skew(card: &RgbImage) -> f32 {
    let gray = imageops::grayscale(card);
    let edges = canny(&gray, SKEW_CANNY_LOW, SKEW_CANNY_HIGH);

    let (w, h) = card.dimensions();
    let options = LineDetectionOptions {
        vote_threshold: (w.min(h) / 6).max(40),
        suppression_radius: 8,
    };
    let lines = detect_lines(&edges, options);
    let deviations: Vec<f32> = lines
        .iter()
        .map(|line| axis_deviation(line.angle_in_degrees))
        .collect();

    let angle = median(deviations).unwrap_or(0.0);
    debug!(lines = lines.len(), angle, "estimated skew");
    angle
}

/// Rotate by `angle_deg` (positive is clockwise), growing the canvas so
/// no content is clipped. Exposed corners are filled with black.
pub fn rotate_with_growth(img: &RgbImage, angle_deg: f32) -> RgbImage {
    let (w, h) = img.dimensions();
    let theta = angle_deg.to_radians();
    let (sin, cos) = theta.sin_cos();

    let new_w = (w as f32 * cos.abs() + h as f32 * sin.abs()).ceil() as u32;
    let new_h = (w as f32 * sin.abs() + h as f32 * cos.abs()).ceil() as u32;

    let projection = Projection::translate(new_w as f32 / 2.0, new_h as f32 / 2.0)
        * Projection::rotate(theta)
        * Projection::translate(-(w as f32) / 2.0, -(h as f32) / 2.0);

    let mut out = RgbImage::new(new_w, new_h);
    warp_into(
        img,
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut out,
    );
    out
}

/// Straighten a rectified card by the estimated skew angle.
///
/// Angles at or below the resampling floor leave the image untouched and
/// record an applied rotation of zero.
pub fn deskew(card: RgbImage) -> RectifiedCard {
    let estimated = estimate_skew(&card);
    if estimated.abs() <= MIN_DESKEW_ANGLE_DEG {
        return RectifiedCard {
            image: card,
            skew_angle: 0.0,
        };
    }
    let image = rotate_with_growth(&card, -estimated);
    RectifiedCard {
        image,
        skew_angle: -estimated,
    }
}

/// Crop the printed-name band of a rectified card and resize it to the
/// fixed OCR canvas.
///
/// Returns `None` when the card is too small for the band ratios to
/// produce a non-empty crop.
pub fn extract_name_plate(card: &RgbImage, config: &DetectorConfig) -> Option<TextRegion> {
    let (w, h) = card.dimensions();
    let top = (h as f32 * config.name_band_top) as u32;
    let bottom = (h as f32 * config.name_band_bottom) as u32;
    let left = (w as f32 * config.name_span_left) as u32;
    let right = (w as f32 * config.name_span_right) as u32;
    if bottom <= top || right <= left {
        return None;
    }

    let crop = imageops::crop_imm(card, left, top, right - left, bottom - top).to_image();
    let image = imageops::resize(
        &crop,
        config.ocr_canvas_w,
        config.ocr_canvas_h,
        FilterType::Triangle,
    );
    Some(TextRegion { image })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn quad(coords: [(i32, i32); 4]) -> Quad {
        Quad::new(coords.map(|(x, y)| Point::new(x, y)))
    }

    fn striped_image(w: u32, h: u32) -> RgbImage {
        let mut img = RgbImage::new(w, h);
        for y in (12..h.saturating_sub(12)).step_by(24) {
            for row in y..(y + 3).min(h) {
                for x in 8..w - 8 {
                    img.put_pixel(x, row, Rgb([255, 255, 255]));
                }
            }
        }
        img
    }

    #[test]
    fn corners_order_regardless_of_input_order() {
        let q = quad([(90, 110), (12, 10), (88, 8), (10, 112)]);
        let [tl, tr, br, bl] = order_corners(&q);
        assert_eq!(tl, (12.0, 10.0));
        assert_eq!(tr, (88.0, 8.0));
        assert_eq!(br, (90.0, 110.0));
        assert_eq!(bl, (10.0, 112.0));
    }

    #[test]
    fn rectifies_an_axis_aligned_region() {
        let mut working = RgbImage::new(300, 300);
        for y in 60..220 {
            for x in 40..140 {
                working.put_pixel(x, y, Rgb([200, 30, 30]));
            }
        }
        let q = quad([(40, 60), (139, 60), (139, 219), (40, 219)]);
        let card = rectify_quad(&working, &q).expect("transform exists");

        let (w, h) = card.dimensions();
        assert!((w as i32 - 100).abs() <= 2, "width {w}");
        assert!((h as i32 - 160).abs() <= 2, "height {h}");
        assert_eq!(*card.get_pixel(w / 2, h / 2), Rgb([200, 30, 30]));
    }

    #[test]
    fn collinear_corners_have_no_transform() {
        let working = RgbImage::new(100, 100);
        let q = quad([(0, 0), (10, 0), (20, 0), (30, 0)]);
        assert!(rectify_quad(&working, &q).is_none());
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let img = striped_image(300, 100);
        let turned = rotate_with_growth(&img, 90.0);
        let (w, h) = turned.dimensions();
        assert!(w.abs_diff(100) <= 1);
        assert!(h.abs_diff(300) <= 1);
    }

    #[test]
    fn straight_content_estimates_near_zero() {
        let img = striped_image(320, 240);
        assert!(estimate_skew(&img).abs() <= 1.0);
    }

    #[test]
    fn blank_image_estimates_zero() {
        let img = RgbImage::new(200, 200);
        assert_eq!(estimate_skew(&img), 0.0);
    }

    #[test]
    fn estimate_recovers_a_known_rotation() {
        // The estimate and the rotation share the clockwise-positive
        // convention, which is what lets deskew undo what it measures.
        let img = striped_image(320, 240);
        let leaned = rotate_with_growth(&img, 5.0);
        let estimated = estimate_skew(&leaned);
        assert!(
            (estimated - 5.0).abs() <= 2.0,
            "estimated {estimated}, expected about 5"
        );
    }

    #[test]
    fn deskew_leaves_straight_cards_alone() {
        let img = striped_image(320, 240);
        let dims = img.dimensions();
        let rectified = deskew(img);
        assert_eq!(rectified.skew_angle, 0.0);
        assert_eq!(rectified.image.dimensions(), dims);
    }

    #[test]
    fn name_plate_lands_on_the_ocr_canvas() {
        let config = DetectorConfig::default();
        let mut card = RgbImage::new(744, 1080);
        // Paint the name band white; everything else stays black.
        for y in 72..140 {
            for x in 0..744 {
                card.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let plate = extract_name_plate(&card, &config).expect("band is croppable");
        assert_eq!(plate.image.dimensions(), (750, 90));
        assert_eq!(*plate.image.get_pixel(375, 45), Rgb([255, 255, 255]));
    }

    #[test]
    fn tiny_card_has_no_name_plate() {
        let config = DetectorConfig::default();
        let card = RgbImage::new(10, 5);
        assert!(extract_name_plate(&card, &config).is_none());
    }
}
