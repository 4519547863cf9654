use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::frame::StillImage;
use image::imageops::{self, FilterType};
use tracing::trace;

/// Network input tensor of shape `[1, S, S, 3]`.
///
/// Values are stored row-major from the top-left pixel, channels R,G,B per
/// pixel. That layout is what the inference collaborator expects; getting
/// it wrong corrupts classifications silently rather than failing, so it is
/// pinned by tests instead of checked at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Vec<f32>,
    size: u32,
}

impl InputTensor {
    pub fn shape(&self) -> [usize; 4] {
        [1, self.size as usize, self.size as usize, 3]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Converts a captured still into the fixed-size, fixed-format tensor the
/// network consumes: center-crop to a square, resize to `size`, then
/// normalize each 8-bit channel as `(value - mean) / std`.
#[derive(Debug, Clone)]
pub struct FramePreprocessor {
    size: u32,
    mean: f32,
    std: f32,
}

impl FramePreprocessor {
    pub fn new(size: u32, mean: f32, std: f32) -> Self {
        Self { size, mean, std }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            config.input_size,
            config.channel_mean,
            config.channel_std,
        )
    }

    /// Prepare one image for inference.
    ///
    /// Fails with `UnsupportedImageFormat` when the source cannot be
    /// decoded to RGB.
    pub fn prepare(&self, image: &StillImage) -> Result<InputTensor, ClassifierError> {
        let rgb = image.decode_rgb()?;
        let (width, height) = rgb.dimensions();

        let min_dim = width.min(height);
        if min_dim == 0 {
            return Err(ClassifierError::UnsupportedImageFormat {
                details: format!("image has degenerate dimensions {}x{}", width, height),
            });
        }

        // Only the center square of the original rectangle.
        let crop_x = (width - min_dim) / 2;
        let crop_y = (height - min_dim) / 2;
        let cropped = imageops::crop_imm(&rgb, crop_x, crop_y, min_dim, min_dim).to_image();

        let scaled = if min_dim == self.size {
            cropped
        } else {
            imageops::resize(&cropped, self.size, self.size, FilterType::Triangle)
        };

        let mut data = Vec::with_capacity((self.size * self.size * 3) as usize);
        for pixel in scaled.pixels() {
            for channel in pixel.0 {
                data.push((channel as f32 - self.mean) / self.std);
            }
        }

        trace!(
            "Prepared {}x{} source into [1, {}, {}, 3] tensor",
            width,
            height,
            self.size,
            self.size
        );
        Ok(InputTensor {
            data,
            size: self.size,
        })
    }
}
