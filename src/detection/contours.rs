//! Contour tracing and quadrilateral candidate extraction.

use image::GrayImage;
use imageproc::contours::{find_contours, Contour};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use tracing::debug;

use crate::models::Quad;

/// Unsigned shoelace area enclosed by a closed contour.
fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        acc += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    acc.unsigned_abs() as f64 / 2.0
}

/// Trace contours in an edge map and keep the card-shaped candidates.
///
/// The `max_candidates` largest contours by enclosed area are simplified
/// with Douglas-Peucker at `approx_tolerance` of their perimeter; only
/// those that reduce to exactly four vertices survive. A dilated card
/// outline traces as two nested borders, so nested duplicates are dropped
/// afterwards.
pub fn quad_candidates(
    edges: &GrayImage,
    max_candidates: usize,
    approx_tolerance: f64,
) -> Vec<Quad> {
    let contours: Vec<Contour<i32>> = find_contours(edges);
    debug!(total = contours.len(), "traced contours");

    let mut ranked: Vec<(f64, &Contour<i32>)> = contours
        .iter()
        .map(|c| (contour_area(&c.points), c))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut quads = Vec::new();
    for (area, contour) in ranked.into_iter().take(max_candidates) {
        if contour.points.len() < 4 {
            continue;
        }
        let perimeter = arc_length(&contour.points, true);
        if perimeter <= f64::EPSILON {
            continue;
        }
        let approx = approximate_polygon_dp(&contour.points, approx_tolerance * perimeter, true);
        if approx.len() != 4 {
            debug!(vertices = approx.len(), area, "candidate is not a quadrilateral");
            continue;
        }
        quads.push(Quad::new([approx[0], approx[1], approx[2], approx[3]]));
    }

    merge_nested(quads)
}

/// Drop every quad whose anchor vertex lies strictly inside an already
/// kept quad. Candidates arrive largest first, so the outer border of a
/// card survives and its inner twin goes. Anchors exactly on a boundary
/// count as outside and keep their quad.
fn merge_nested(candidates: Vec<Quad>) -> Vec<Quad> {
    let mut kept: Vec<Quad> = Vec::with_capacity(candidates.len());
    for quad in candidates {
        if kept.iter().any(|k| k.contains(quad.anchor())) {
            debug!(anchor = ?quad.anchor(), "dropping nested duplicate");
            continue;
        }
        kept.push(quad);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
    use imageproc::rect::Rect;

    fn quad(coords: [(i32, i32); 4]) -> Quad {
        Quad::new(coords.map(|(x, y)| Point::new(x, y)))
    }

    #[test]
    fn area_of_axis_aligned_square() {
        let points = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(contour_area(&points), 100.0);
    }

    #[test]
    fn filled_rectangle_yields_one_quad() {
        let mut edges = GrayImage::new(200, 200);
        draw_filled_rect_mut(&mut edges, Rect::at(10, 10).of_size(81, 81), Luma([255u8]));

        let quads = quad_candidates(&edges, 5, 0.05);
        assert_eq!(quads.len(), 1);
        let bbox = quads[0].bounding_box();
        assert!(bbox.x.abs_diff(10) <= 2 && bbox.y.abs_diff(10) <= 2);
        assert!(bbox.width.abs_diff(80) <= 3 && bbox.height.abs_diff(80) <= 3);
    }

    #[test]
    fn triangle_is_rejected() {
        let mut edges = GrayImage::new(220, 120);
        let vertices = [
            Point::new(110i32, 20),
            Point::new(190, 20),
            Point::new(150, 90),
        ];
        draw_polygon_mut(&mut edges, &vertices, Luma([255u8]));
        assert!(quad_candidates(&edges, 5, 0.05).is_empty());
    }

    #[test]
    fn pentagon_is_rejected() {
        // Regular-ish pentagon, corners far enough apart that none of them
        // collapses under the approximation tolerance.
        let mut edges = GrayImage::new(240, 240);
        let vertices = [
            Point::new(120i32, 20),
            Point::new(215, 90),
            Point::new(179, 202),
            Point::new(61, 202),
            Point::new(25, 90),
        ];
        draw_polygon_mut(&mut edges, &vertices, Luma([255u8]));
        assert!(quad_candidates(&edges, 5, 0.05).is_empty());
    }

    #[test]
    fn candidate_limit_keeps_only_the_largest() {
        let mut edges = GrayImage::new(220, 220);
        draw_filled_rect_mut(&mut edges, Rect::at(10, 10).of_size(131, 131), Luma([255u8]));
        draw_filled_rect_mut(&mut edges, Rect::at(160, 20).of_size(41, 41), Luma([255u8]));

        let all = quad_candidates(&edges, 5, 0.05);
        assert_eq!(all.len(), 2);

        let only_largest = quad_candidates(&edges, 1, 0.05);
        assert_eq!(only_largest.len(), 1);
        assert!(only_largest[0].bounding_box().width > 100);
    }

    #[test]
    fn hollow_outline_collapses_to_its_outer_border() {
        // A thick band traces as an outer border plus a hole border.
        let mut edges = GrayImage::new(220, 220);
        draw_filled_rect_mut(&mut edges, Rect::at(20, 20).of_size(161, 161), Luma([255u8]));
        draw_filled_rect_mut(&mut edges, Rect::at(40, 40).of_size(121, 121), Luma([0u8]));

        let quads = quad_candidates(&edges, 5, 0.05);
        assert_eq!(quads.len(), 1);
        assert!(quads[0].bounding_box().width > 150);
    }

    #[test]
    fn nested_merge_keeps_outer_drops_inner() {
        let outer = quad([(10, 10), (100, 10), (100, 100), (10, 100)]);
        let inner = quad([(20, 20), (90, 20), (90, 90), (20, 90)]);
        let kept = merge_nested(vec![outer.clone(), inner]);
        assert_eq!(kept, vec![outer]);
    }

    #[test]
    fn disjoint_quads_are_all_kept() {
        let left = quad([(10, 10), (50, 10), (50, 50), (10, 50)]);
        let right = quad([(60, 10), (100, 10), (100, 50), (60, 50)]);
        assert_eq!(merge_nested(vec![left, right]).len(), 2);
    }

    #[test]
    fn anchor_on_boundary_is_not_nested() {
        let outer = quad([(10, 10), (100, 10), (100, 100), (10, 100)]);
        // Anchor sits exactly on the outer quad's left edge.
        let touching = quad([(10, 50), (150, 50), (150, 90), (10, 90)]);
        assert_eq!(merge_nested(vec![outer, touching]).len(), 2);
    }
}
