//! Mapping matches back to the original photo and drawing them.

use ab_glyph::FontRef;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detection::Detection;
use crate::models::{Annotation, BoundingBox};

const BOX_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const BOX_THICKNESS: u32 = 3;
const LABEL_SCALE: f32 = 28.0;
const LABEL_OFFSET: u32 = 34;

/// Rescale every match out of working space and reduce it to an
/// axis-aligned box with its label.
pub fn to_annotations(detection: &Detection) -> Vec<Annotation> {
    detection
        .matches
        .iter()
        .map(|m| {
            let bbox = m
                .quad
                .rescale(detection.coef_x, detection.coef_y)
                .bounding_box();
            Annotation {
                bbox,
                label: m.entry.name.clone(),
                card_id: m.entry.id,
                score: m.score,
            }
        })
        .collect()
}

/// Draw annotation frames (and labels, when a font is given) onto the
/// original-scale photo.
pub fn render(img: &mut RgbImage, annotations: &[Annotation], font: Option<&FontRef<'_>>) {
    for ann in annotations {
        draw_frame(img, &ann.bbox);
        if let Some(font) = font {
            let y = ann.bbox.y.saturating_sub(LABEL_OFFSET);
            draw_text_mut(
                img,
                BOX_COLOR,
                ann.bbox.x as i32,
                y as i32,
                LABEL_SCALE,
                font,
                &ann.label,
            );
        }
    }
}

/// Hollow rectangle thickened by concentric rings growing outward; pixels
/// inside the box are never painted.
fn draw_frame(img: &mut RgbImage, bbox: &BoundingBox) {
    if bbox.width == 0 || bbox.height == 0 {
        return;
    }
    for i in 0..BOX_THICKNESS {
        let x = bbox.x.saturating_sub(i);
        let y = bbox.y.saturating_sub(i);
        let rect = Rect::at(x as i32, y as i32).of_size(bbox.width + 2 * i, bbox.height + 2 * i);
        draw_hollow_rect_mut(img, rect, BOX_COLOR);
    }
}
