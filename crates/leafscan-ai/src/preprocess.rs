//! Decode uploads into the fixed-size NHWC tensor the classifier expects.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use thiserror::Error;

/// MIME type reported when the upload's format cannot be sniffed.
const FALLBACK_MIME: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("empty upload")]
    Empty,
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// How raw 8-bit channel values are mapped into the model's input range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelScale {
    /// Keep 0-255 (EfficientNet models rescale internally).
    #[default]
    Raw,
    /// Divide by 255 into 0-1.
    Unit,
}

/// Dense `f32` input tensor in `[batch, height, width, channels]` order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

/// A decoded upload: the model tensor plus the MIME type of the original bytes.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub tensor: ImageTensor,
    pub mime_type: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    size: u32,
    scale: PixelScale,
}

impl Preprocessor {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            scale: PixelScale::default(),
        }
    }

    pub fn with_scale(mut self, scale: PixelScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decode, convert to RGB, resize to `size × size` and scale pixels.
    pub fn prepare(&self, bytes: &[u8]) -> Result<PreparedImage, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let mime_type = image::guess_format(bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or(FALLBACK_MIME);

        let rgb = self.to_rgb(image::load_from_memory(bytes)?);

        let divisor = match self.scale {
            PixelScale::Raw => 1.0,
            PixelScale::Unit => 255.0,
        };
        // RgbImage's raw buffer is already row-major HWC.
        let data: Vec<f32> = rgb.into_raw().into_iter().map(|v| v as f32 / divisor).collect();

        let side = self.size as usize;
        Ok(PreparedImage {
            tensor: ImageTensor {
                shape: [1, side, side, 3],
                data,
            },
            mime_type,
        })
    }

    /// Drop alpha and palette first, then resize the RGB image.
    fn to_rgb(&self, img: DynamicImage) -> RgbImage {
        imageops::resize(&img.into_rgb8(), self.size, self.size, FilterType::CatmullRom)
    }
}
