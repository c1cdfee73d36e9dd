//! Local OCR tier
//!
//! Tesseract (via leptess) backing for the [`OcrEngine`] trait. This
//! is the on-device fallback when the remote vision tier yields
//! nothing; it reads the original captured file, not the downscaled
//! transmission copy.

use crate::extract::{OcrEngine, OcrError};
use async_trait::async_trait;
use leptess::LepTess;
use std::path::Path;

/// Tesseract-backed text recognition.
pub struct TesseractOcr {
    language: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let language = self.language.clone();
        let path = image_path.to_path_buf();
        // Tesseract is blocking; keep it off the async workers
        let text = tokio::task::spawn_blocking(move || -> Result<String, OcrError> {
            let mut tesseract = LepTess::new(None, &language).map_err(|e| {
                OcrError(format!("failed to initialize Tesseract ({language}): {e}"))
            })?;
            let bytes = std::fs::read(&path)
                .map_err(|e| OcrError(format!("failed to read {}: {e}", path.display())))?;
            tesseract
                .set_image_from_mem(&bytes)
                .map_err(|e| OcrError(format!("failed to load {}: {e}", path.display())))?;
            tesseract
                .get_utf8_text()
                .map_err(|e| OcrError(format!("text extraction failed: {e}")))
        })
        .await
        .map_err(|e| OcrError(format!("ocr task panicked: {e}")))??;

        tracing::debug!(chars = text.len(), "ocr recognized text");
        Ok(text)
    }
}
