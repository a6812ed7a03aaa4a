use std::io::Write;

use cardlens::matching::FuzzyMatcher;
use cardlens::{Catalog, Error};

/// Catalog document in the upstream API shape, including one record too
/// damaged to use.
const CATALOG_DOCUMENT: &str = r#"{"data": [
    {"id": 46986414, "name": "Dark Magician",
     "card_images": [{"image_url": "https://cards.example/46986414.jpg"}]},
    {"id": 38033121, "name": "Dark Magician Girl",
     "card_images": [{"image_url": "https://cards.example/38033121.jpg"}]},
    {"id": 89631139, "name": "Blue-Eyes White Dragon", "card_images": []},
    {"name": "torn record"},
    {"id": 74677422, "name": "Red-Eyes Black Dragon"},
    {"id": 40640057, "name": "Kuriboh"}
]}"#;

fn write_document(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp catalog");
    file.write_all(json.as_bytes()).expect("write catalog");
    file
}

#[test]
fn loads_the_document_and_skips_damaged_records() {
    let file = write_document(CATALOG_DOCUMENT);
    let catalog = Catalog::load(file.path()).expect("load");
    assert_eq!(catalog.len(), 5);
    assert!(catalog.entries().iter().all(|e| e.name != "torn record"));
}

#[test]
fn typo_tolerant_lookup_against_a_loaded_catalog() {
    let file = write_document(CATALOG_DOCUMENT);
    let catalog = Catalog::load(file.path()).expect("load");

    let matcher = FuzzyMatcher::new(&catalog, 70.0);
    let (entry, score) = matcher
        .best_match("Blue-Eyes Wite Dragon")
        .expect("typo should match");
    assert_eq!(entry.id, 89631139);
    assert!((70.0..95.0).contains(&score));

    let strict = FuzzyMatcher::new(&catalog, 95.0);
    assert!(strict.best_match("Blue-Eyes Wite Dragon").is_none());
}

#[test]
fn lookup_ignores_case_and_punctuation() {
    let file = write_document(CATALOG_DOCUMENT);
    let catalog = Catalog::load(file.path()).expect("load");

    let matcher = FuzzyMatcher::new(&catalog, 70.0);
    let (entry, score) = matcher.best_match("DARK, MAGICIAN!").expect("match");
    assert_eq!(entry.id, 46986414);
    assert_eq!(score, 100.0);
}

#[test]
fn unreadable_document_is_fatal() {
    let file = write_document("{not json");
    assert!(matches!(
        Catalog::load(file.path()),
        Err(Error::CatalogFormat(_))
    ));
}
