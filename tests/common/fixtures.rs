use cardlens::{Catalog, CatalogEntry, TextRecognizer};
use image::{Rgb, RgbImage};

/// Photo-like scene: a bright card-shaped rectangle lying on a dark
/// tabletop. `card` is (x, y, width, height) in original pixels.
pub fn card_scene(width: u32, height: u32, card: (u32, u32, u32, u32)) -> RgbImage {
    let (cx, cy, cw, ch) = card;
    let mut img = RgbImage::from_pixel(width, height, Rgb([28, 26, 30]));
    for y in cy..(cy + ch).min(height) {
        for x in cx..(cx + cw).min(width) {
            img.put_pixel(x, y, Rgb([235, 235, 235]));
        }
    }
    img
}

/// Recognizer that always reads the same canned line, standing in for the
/// real OCR engine so pipelines run without model files.
pub struct StubRecognizer {
    text: String,
}

impl StubRecognizer {
    pub fn reading(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    /// Recognizer that never reads anything.
    pub fn silent() -> Self {
        Self::reading("")
    }
}

impl TextRecognizer for StubRecognizer {
    fn recognize_line(&self, _region: &RgbImage) -> String {
        self.text.clone()
    }
}

fn entry(id: u64, name: &str) -> CatalogEntry {
    CatalogEntry {
        id,
        name: name.to_string(),
        image_url: None,
    }
}

/// Five well-known cards, enough for every lookup scenario.
pub fn sample_catalog() -> Catalog {
    Catalog::from_entries(vec![
        entry(46986414, "Dark Magician"),
        entry(38033121, "Dark Magician Girl"),
        entry(89631139, "Blue-Eyes White Dragon"),
        entry(74677422, "Red-Eyes Black Dragon"),
        entry(40640057, "Kuriboh"),
    ])
}
