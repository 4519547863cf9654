use crate::error::ClassifierError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Pixel format of a captured still image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StillFormat {
    /// JPEG-compressed image data
    Jpeg,
    /// RGB24 format - uncompressed RGB data, row-major from the top-left
    Rgb24,
}

impl StillFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            StillFormat::Jpeg => 0, // Variable size, compressed
            StillFormat::Rgb24 => 3,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, StillFormat::Jpeg)
    }
}

/// A single captured still image with its metadata.
///
/// The payload is shared via `Arc` so the image can move between the
/// capture event stream and the classification pipeline without copying.
#[derive(Debug, Clone)]
pub struct StillImage {
    /// Timestamp when the image was captured
    pub timestamp: SystemTime,
    /// Raw image data
    pub data: Arc<Vec<u8>>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Pixel format
    pub format: StillFormat,
}

impl StillImage {
    /// Create a new still image instance
    pub fn new(
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: StillFormat,
    ) -> Self {
        Self {
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Get the expected payload size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate payload size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true, // Compressed formats have variable size
        }
    }

    /// Decode the image into an RGB pixel buffer.
    ///
    /// Fails with `UnsupportedImageFormat` when the payload cannot be
    /// decoded to RGB.
    pub fn decode_rgb(&self) -> Result<RgbImage, ClassifierError> {
        match self.format {
            StillFormat::Jpeg => {
                let decoded = image::load_from_memory(&self.data).map_err(|e| {
                    ClassifierError::UnsupportedImageFormat {
                        details: format!("JPEG decode failed: {}", e),
                    }
                })?;
                Ok(decoded.to_rgb8())
            }
            StillFormat::Rgb24 => {
                RgbImage::from_raw(self.width, self.height, self.data.as_ref().clone()).ok_or_else(
                    || ClassifierError::UnsupportedImageFormat {
                        details: format!(
                            "RGB24 payload of {} bytes does not match {}x{}",
                            self.data.len(),
                            self.width,
                            self.height
                        ),
                    },
                )
            }
        }
    }
}
