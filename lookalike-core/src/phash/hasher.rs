//! Image decoding and hash computation.

use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageReader, Limits, Luma};

use super::{dct, HasherConfig, PerceptualHash};
use crate::error::{LookalikeError, Result};

/// ITU-R 601-2 luma in 16.16 fixed point, rounded to nearest.
fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    let l = (r as u32 * 19_595 + g as u32 * 38_470 + b as u32 * 7_471 + 0x8000) >> 16;
    l as u8
}

fn to_luminance(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma_601(r, g, b)])
    })
}

/// Perceptual hasher configuration and computation.
#[derive(Debug, Clone)]
pub struct PerceptualHasher {
    config: HasherConfig,
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self {
            config: HasherConfig::default(),
        }
    }
}

impl PerceptualHasher {
    /// Create a hasher, rejecting configurations that cannot produce a
    /// canonical hex form.
    pub fn new(config: HasherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    /// Number of bits in every hash this hasher produces.
    pub fn bit_len(&self) -> usize {
        self.config.bit_len()
    }

    /// Compute the perceptual hash of a decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> Result<PerceptualHash> {
        if image.width() == 0 || image.height() == 0 {
            return Err(LookalikeError::DecodeFailure(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let side = self.config.resize_side();
        let gray = to_luminance(image);
        let resized = imageops::resize(&gray, side, side, FilterType::Lanczos3);
        let pixels: Vec<f64> = resized.as_raw().iter().map(|&p| f64::from(p)).collect();

        dct::hash_luma(&pixels, side as usize, self.config.hash_size as usize)
    }

    /// Decode in-memory image bytes (format sniffed from content) and hash them.
    ///
    /// Supports JPEG, PNG, GIF, BMP and TIFF.
    pub fn hash_bytes(&self, image_data: &[u8]) -> Result<PerceptualHash> {
        let mut reader = ImageReader::new(Cursor::new(image_data)).with_guessed_format()?;
        reader.limits(self.limits());
        let image = reader
            .decode()
            .map_err(|e| LookalikeError::DecodeFailure(e.to_string()))?;

        self.hash_image(&image)
    }

    /// Open, decode and hash an image file.
    ///
    /// The format is sniffed from content first, then from the extension.
    pub fn hash_path(&self, path: &Path) -> Result<PerceptualHash> {
        let mut reader = ImageReader::open(path)?.with_guessed_format()?;
        reader.limits(self.limits());
        let image = reader.decode().map_err(|e| {
            LookalikeError::DecodeFailure(format!("{}: {}", path.display(), e))
        })?;

        self.hash_image(&image)
    }

    /// Check if the provided bytes appear to be a supported image format.
    pub fn is_supported_format(data: &[u8]) -> bool {
        image::guess_format(data).is_ok()
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.config.max_dimension);
        limits.max_image_height = Some(self.config.max_dimension);
        limits
    }
}
