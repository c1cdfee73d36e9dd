//! Image capture
//!
//! The camera itself lives outside this crate (a device API on mobile,
//! a file source in the CLI); the pipeline only needs the contract:
//! ask for permission, then capture exactly one still frame into a
//! temporary file and hand back its path.

use crate::error::ScanError;
use crate::types::CapturedPhoto;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a camera permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Options for a single capture
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Capture quality hint (0.0-1.0), forwarded to the device
    pub quality: f32,
    /// Skip shutter animation/sound where the device supports it
    pub skip_processing: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: 0.8,
            skip_processing: true,
        }
    }
}

/// A camera device the pipeline can capture from.
///
/// `capture_photo` writes one temporary image file per call; the
/// caller owns the file until the scan is discarded.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    async fn capture_photo(&self, options: &CaptureOptions) -> Result<CapturedPhoto, ScanError>;
}

/// Timing policy for automatic capture.
///
/// Stand-in trigger: on each interval tick, pretend card alignment was
/// detected, wait the settle delay, then capture. Real edge detection
/// would replace the tick, not the surrounding guard logic.
#[derive(Debug, Clone)]
pub struct AutoCaptureConfig {
    /// How often to check for an "aligned" card
    pub interval: Duration,
    /// Delay between detection and capture, lets the user hold still
    pub settle_delay: Duration,
}

impl Default for AutoCaptureConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// File-backed camera: "captures" by copying a fixed source image to a
/// fresh temp file. Used by the CLI and by tests; the mobile device
/// camera satisfies the same contract.
pub struct FileCamera {
    source: PathBuf,
}

impl FileCamera {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl CameraDevice for FileCamera {
    async fn request_permission(&self) -> PermissionStatus {
        // Reading a local file needs no runtime permission
        PermissionStatus::Granted
    }

    async fn capture_photo(&self, _options: &CaptureOptions) -> Result<CapturedPhoto, ScanError> {
        if !self.source.exists() {
            return Err(ScanError::DeviceUnavailable);
        }
        let destination = std::env::temp_dir().join(format!("cardsnap-{}.jpg", Uuid::new_v4()));
        tokio::fs::copy(&self.source, &destination).await?;

        let (width, height) = image::image_dimensions(&destination)
            .map_err(|e| ScanError::ImageDecode(e.to_string()))?;

        tracing::debug!(path = %destination.display(), width, height, "captured frame");

        Ok(CapturedPhoto {
            path: destination,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::io::Write;

    fn temp_png() -> tempfile::NamedTempFile {
        let img = ImageBuffer::from_pixel(32, 48, Rgb([10u8, 20u8, 30u8]));
        let mut bytes = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut bytes);
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file
    }

    #[tokio::test]
    async fn test_file_camera_capture_writes_temp_file() {
        let source = temp_png();
        let camera = FileCamera::new(source.path());
        assert_eq!(camera.request_permission().await, PermissionStatus::Granted);

        let photo = camera
            .capture_photo(&CaptureOptions::default())
            .await
            .unwrap();
        assert!(photo.path.exists());
        assert_ne!(photo.path, source.path());
        assert_eq!((photo.width, photo.height), (32, 48));

        std::fs::remove_file(&photo.path).ok();
    }

    #[tokio::test]
    async fn test_file_camera_missing_source_is_device_unavailable() {
        let camera = FileCamera::new("/nonexistent/frame.jpg");
        let result = camera.capture_photo(&CaptureOptions::default()).await;
        assert!(matches!(result, Err(ScanError::DeviceUnavailable)));
    }

    #[tokio::test]
    async fn test_two_captures_use_distinct_temp_files() {
        let source = temp_png();
        let camera = FileCamera::new(source.path());
        let options = CaptureOptions::default();
        let first = camera.capture_photo(&options).await.unwrap();
        let second = camera.capture_photo(&options).await.unwrap();
        assert_ne!(first.path, second.path);
        std::fs::remove_file(&first.path).ok();
        std::fs::remove_file(&second.path).ok();
    }
}
