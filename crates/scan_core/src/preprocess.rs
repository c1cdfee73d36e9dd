//! Image preprocessing
//!
//! Turns a captured photo into a transmission-ready representation for
//! the remote vision call: decoded, downscaled to a bounded width, and
//! re-encoded as base64 JPEG at a fixed quality. If the source cannot
//! be read or decoded the whole scan attempt aborts; there is no
//! fallback to sending the unoptimized original.

use crate::error::ScanError;
use crate::types::EncodedImage;
use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;

/// Preprocessing parameters.
///
/// Defaults keep the encoded payload well under typical vision-API
/// request limits.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Maximum output width in pixels; larger images are downscaled
    /// preserving aspect ratio
    pub max_width: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_width: 1024,
            jpeg_quality: 70,
        }
    }
}

/// Read an image file and encode it for transmission.
pub fn encode_for_transmission(
    path: &Path,
    config: &PreprocessConfig,
) -> Result<EncodedImage, ScanError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ScanError::ImageDecode(format!("{}: {e}", path.display())))?;
    encode_image_bytes(&bytes, config)
}

/// Encode in-memory image bytes for transmission.
pub fn encode_image_bytes(
    bytes: &[u8],
    config: &PreprocessConfig,
) -> Result<EncodedImage, ScanError> {
    let decoded = image::load_from_memory(bytes)?;
    encode_decoded(&decoded, config)
}

fn encode_decoded(
    decoded: &DynamicImage,
    config: &PreprocessConfig,
) -> Result<EncodedImage, ScanError> {
    let resized = if decoded.width() > config.max_width {
        let scale = config.max_width as f64 / decoded.width() as f64;
        let height = (decoded.height() as f64 * scale).round().max(1.0) as u32;
        decoded.resize_exact(config.max_width, height, FilterType::Triangle)
    } else {
        decoded.clone()
    };

    // JPEG encoder rejects alpha channels
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut jpeg_bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_bytes, config.jpeg_quality);
    rgb.write_with_encoder(encoder)?;

    tracing::debug!(
        width = rgb.width(),
        height = rgb.height(),
        bytes = jpeg_bytes.len(),
        "encoded image for transmission"
    );

    Ok(EncodedImage {
        base64: general_purpose::STANDARD.encode(&jpeg_bytes),
        width: rgb.width(),
        height: rgb.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Write;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb([128u8, 64u8, 32u8]));
        let mut bytes = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut bytes);
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_encode_small_image_keeps_dimensions() {
        let config = PreprocessConfig::default();
        let encoded = encode_image_bytes(&png_bytes(100, 60), &config).unwrap();
        assert_eq!(encoded.width, 100);
        assert_eq!(encoded.height, 60);
        assert!(!encoded.base64.is_empty());
    }

    #[test]
    fn test_encode_large_image_downscaled_to_max_width() {
        let config = PreprocessConfig {
            max_width: 512,
            jpeg_quality: 70,
        };
        let encoded = encode_image_bytes(&png_bytes(2048, 1024), &config).unwrap();
        assert_eq!(encoded.width, 512);
        // Aspect ratio preserved: 1024 * (512/2048)
        assert_eq!(encoded.height, 256);
    }

    #[test]
    fn test_encode_garbage_bytes_is_decode_error() {
        let config = PreprocessConfig::default();
        let result = encode_image_bytes(b"not an image at all", &config);
        assert!(matches!(result, Err(ScanError::ImageDecode(_))));
    }

    #[test]
    fn test_encode_missing_file_is_decode_error() {
        let config = PreprocessConfig::default();
        let result = encode_for_transmission(Path::new("/nonexistent/card.jpg"), &config);
        assert!(matches!(result, Err(ScanError::ImageDecode(_))));
    }

    #[test]
    fn test_encode_from_file() {
        let config = PreprocessConfig::default();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png_bytes(64, 64)).unwrap();
        let encoded = encode_for_transmission(file.path(), &config).unwrap();
        assert_eq!(encoded.width, 64);
        assert!(encoded.data_uri().starts_with("data:image/jpeg;base64,"));
    }
}
