//! Core types for the cardsnap pipeline
//!
//! Defines the intermediate representations passed between pipeline
//! stages: the extraction output, the catalog record shape, and the
//! lookup query tuple.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for one scan attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(pub Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

/// Output of one extraction attempt.
///
/// All fields are independently optional; an empty result is a valid
/// state, not an error. A result is created once per attempt and never
/// mutated afterwards; a new scan produces a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Card name as read from the image
    pub name: Option<String>,
    /// Health value as printed (kept as text, OCR may garble digits)
    pub hp: Option<String>,
    /// Printed collector number, e.g. "25/102"
    pub number: Option<String>,
    /// Path to the captured image this result was read from
    pub image_ref: Option<PathBuf>,
}

impl ScanResult {
    /// True when no field was extracted at all
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.hp.is_none() && self.number.is_none()
    }
}

/// Edition (set) a card belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardEdition {
    pub name: String,
    /// URL or path of the set symbol image
    #[serde(default)]
    pub symbol: Option<String>,
}

/// A catalog entry, consumed read-only by the matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    /// Catalog identifier, unique within one catalog
    pub id: String,
    /// Display name
    pub name: String,
    /// Printed health value
    #[serde(default)]
    pub hp: Option<String>,
    /// Printed collector number
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub edition: Option<CardEdition>,
    #[serde(default)]
    pub rarity: Option<String>,
    /// Type tags (e.g. "Lightning")
    #[serde(default)]
    pub types: Vec<String>,
    /// Thumbnail image URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Full-size image URL
    #[serde(default)]
    pub image: Option<String>,
}

/// Filter tuple sent to the card lookup collaborator.
///
/// `None` means unconstrained. The pipeline never issues a query with
/// all fields unset, except the explicit hp-only last resort; the
/// number field is never used as a filter (OCR misreads the small
/// collector-number cell too often).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub name: Option<String>,
    pub hp: Option<String>,
    pub number: Option<String>,
}

impl MatchQuery {
    pub fn is_unconstrained(&self) -> bool {
        self.name.is_none() && self.hp.is_none() && self.number.is_none()
    }
}

/// A still frame captured from the camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    /// Path of the temporary image file written by the capture
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// A transmission-ready image: bounded width, JPEG, base64.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Base64 of the JPEG bytes, without any URI prefix
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Render as a data URI for services that take embedded images
    pub fn data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.base64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_id_unique() {
        assert_ne!(ScanId::new(), ScanId::new());
    }

    #[test]
    fn test_scan_result_empty() {
        let result = ScanResult::default();
        assert!(result.is_empty());

        let result = ScanResult {
            hp: Some("70".to_string()),
            ..Default::default()
        };
        assert!(!result.is_empty());
    }

    #[test]
    fn test_card_record_deserializes_camel_case() {
        let json = r#"{
            "id": "base1-58",
            "name": "Pikachu",
            "hp": "40",
            "number": "58/102",
            "edition": {"name": "Base Set", "symbol": null},
            "types": ["Lightning"]
        }"#;
        let record: CardRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "Pikachu");
        assert_eq!(record.edition.unwrap().name, "Base Set");
        assert!(record.rarity.is_none());
    }

    #[test]
    fn test_match_query_unconstrained() {
        assert!(MatchQuery::default().is_unconstrained());
        let query = MatchQuery {
            hp: Some("70".to_string()),
            ..Default::default()
        };
        assert!(!query.is_unconstrained());
    }

    #[test]
    fn test_encoded_image_data_uri() {
        let image = EncodedImage {
            base64: "aGVsbG8=".to_string(),
            width: 10,
            height: 10,
        };
        assert_eq!(image.data_uri(), "data:image/jpeg;base64,aGVsbG8=");
    }
}
