//! Text extraction
//!
//! Turns an image into structured card fields using a two-tier
//! strategy, tried in strict order with first success winning:
//!
//! 1. Remote vision extraction: submit the encoded image plus a fixed
//!    instruction prompt to a vision-capable LLM service and parse the
//!    first JSON object embedded in the free-text reply. Malformed or
//!    missing JSON is not fatal, it just fails the tier.
//! 2. Local OCR fallback: run on-device text recognition over the
//!    original captured image and apply a fixed-order list of pattern
//!    rules ("Name ... NN HP", then "NN/NN").
//!
//! Only when both tiers come up empty does extraction report failure.

use crate::error::ScanError;
use crate::types::{EncodedImage, ScanResult};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Failure of a single remote vision call
#[derive(Debug, Error)]
#[error("vision service call failed: {0}")]
pub struct VisionCallError(pub String);

/// Failure of a single local OCR run
#[derive(Debug, Error)]
#[error("ocr failed: {0}")]
pub struct OcrError(pub String);

/// Remote vision-capable text generation service.
///
/// Returns the service's free-text reply; the caller is responsible
/// for digging any structure out of it.
#[async_trait]
pub trait VisionService: Send + Sync {
    async fn submit(&self, image: &EncodedImage, prompt: &str) -> Result<String, VisionCallError>;
}

/// On-device text recognition over an image file.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError>;
}

/// Instruction prompt sent with every vision request
pub const VISION_PROMPT: &str = r#"You are reading a photographed Pokemon trading card.
Extract these fields from the card image:
- pokemonName: the card name printed at the top (include suffixes like ex, GX, V, VMAX, VSTAR)
- healthPoints: the HP number, digits only
- cardNumber: the collector number, usually printed as digits/digits

Return only JSON: {"pokemonName": "...", "healthPoints": "...", "cardNumber": "..."}
Use null for any field you cannot read."#;

/// Extraction settings.
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    /// Demo-only: results to hand out when both tiers find nothing.
    /// Empty (the default) means extraction honestly reports failure;
    /// populate it only for demos without a camera or service.
    pub demo_samples: Vec<ScanResult>,
}

/// Two-tier field extractor.
pub struct TextExtractor {
    vision: Option<Arc<dyn VisionService>>,
    ocr: Option<Arc<dyn OcrEngine>>,
    config: ExtractorConfig,
    name_hp_rule: Regex,
    number_rule: Regex,
    demo_cursor: AtomicUsize,
}

impl TextExtractor {
    pub fn new(
        vision: Option<Arc<dyn VisionService>>,
        ocr: Option<Arc<dyn OcrEngine>>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            vision,
            ocr,
            config,
            // Card name followed by the HP cell, e.g. "Pikachu ex 70 HP"
            name_hp_rule: Regex::new(r"(?i)([A-Za-z][A-Za-z.'\- ]*?)\s+(\d{1,3})\s*HP")
                .expect("name/hp rule is valid"),
            // Collector number cell, e.g. "25/102"
            number_rule: Regex::new(r"(\d{1,3})\s*/\s*(\d{1,3})").expect("number rule is valid"),
            demo_cursor: AtomicUsize::new(0),
        }
    }

    /// Run both tiers against one captured image.
    ///
    /// `encoded` feeds the remote tier; the OCR tier reads the
    /// original file at `image_path` untouched.
    pub async fn extract(
        &self,
        encoded: &EncodedImage,
        image_path: &Path,
    ) -> Result<ScanResult, ScanError> {
        if let Some(result) = self.try_vision_tier(encoded, image_path).await {
            return Ok(result);
        }
        if let Some(result) = self.try_ocr_tier(image_path).await {
            return Ok(result);
        }
        if let Some(sample) = self.next_demo_sample() {
            tracing::warn!("extraction exhausted, serving demo sample result");
            return Ok(sample);
        }
        Err(ScanError::ExtractionUnavailable)
    }

    async fn try_vision_tier(
        &self,
        encoded: &EncodedImage,
        image_path: &Path,
    ) -> Option<ScanResult> {
        let vision = self.vision.as_ref()?;
        let reply = match vision.submit(encoded, VISION_PROMPT).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "vision tier failed, falling back to OCR");
                return None;
            }
        };

        let Some(fields) = parse_embedded_json(&reply) else {
            tracing::debug!("vision reply carried no parsable JSON object");
            return None;
        };

        // Accept only when the reply pinned down a name or a number;
        // an hp-only reply is worse than letting OCR have a go.
        if fields.name.is_none() && fields.number.is_none() {
            tracing::debug!("vision reply had neither name nor number, trying OCR");
            return None;
        }

        Some(ScanResult {
            image_ref: Some(image_path.to_path_buf()),
            ..fields
        })
    }

    async fn try_ocr_tier(&self, image_path: &Path) -> Option<ScanResult> {
        let ocr = self.ocr.as_ref()?;
        let text = match ocr.recognize(image_path).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "ocr tier failed");
                return None;
            }
        };

        let result = self.apply_pattern_rules(&text, image_path);
        if result.is_empty() {
            tracing::debug!("no pattern rule matched OCR text");
            return None;
        }
        Some(result)
    }

    /// Fixed-order pattern rules over recognized text.
    fn apply_pattern_rules(&self, text: &str, image_path: &Path) -> ScanResult {
        let mut result = ScanResult {
            image_ref: Some(image_path.to_path_buf()),
            ..Default::default()
        };

        if let Some(captures) = self.name_hp_rule.captures(text) {
            let name = captures[1].trim().to_string();
            if !name.is_empty() {
                result.name = Some(name);
            }
            result.hp = Some(captures[2].to_string());
        }
        if let Some(captures) = self.number_rule.captures(text) {
            result.number = Some(format!("{}/{}", &captures[1], &captures[2]));
        }
        result
    }

    fn next_demo_sample(&self) -> Option<ScanResult> {
        if self.config.demo_samples.is_empty() {
            return None;
        }
        let index = self.demo_cursor.fetch_add(1, Ordering::Relaxed);
        Some(self.config.demo_samples[index % self.config.demo_samples.len()].clone())
    }
}

/// Pull the first balanced JSON object out of free text and read the
/// card fields from it. Anything unparsable yields `None`.
pub fn parse_embedded_json(text: &str) -> Option<ScanResult> {
    let object = first_json_object(text)?;
    let value: serde_json::Value = serde_json::from_str(object).ok()?;
    Some(ScanResult {
        name: field_as_string(&value, "pokemonName"),
        hp: field_as_string(&value, "healthPoints"),
        number: field_as_string(&value, "cardNumber"),
        image_ref: None,
    })
}

/// Slice of the first balanced `{...}` in the text, string-aware.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Read a field as text; services return numbers for hp often enough
/// that both string and number shapes are accepted.
fn field_as_string(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
