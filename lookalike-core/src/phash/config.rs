//! Hasher configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LookalikeError, Result};

/// Side of the retained low-frequency block (8 gives a 64-bit hash).
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Resize side is `hash_size * highfreq_factor` (32 by default).
pub const DEFAULT_HIGHFREQ_FACTOR: u32 = 4;

/// Largest accepted `hash_size` (a 4096-bit hash).
pub const MAX_HASH_SIZE: u32 = 64;

/// Largest accepted resize side.
pub const MAX_RESIZE_SIDE: u32 = 1024;

/// Largest accepted width or height of a decoded image, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 16_384;

/// Parameters of the DCT hash.
///
/// Changing `hash_size` or `highfreq_factor` changes every fingerprint, so a
/// store built with one configuration can only be queried with the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HasherConfig {
    /// Side of the retained DCT block; must be a non-zero multiple of 4
    pub hash_size: u32,
    /// Multiplier applied to `hash_size` to get the resize side
    pub highfreq_factor: u32,
    /// Decode limit for image width and height
    pub max_dimension: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            hash_size: DEFAULT_HASH_SIZE,
            highfreq_factor: DEFAULT_HIGHFREQ_FACTOR,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl HasherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hash_size == 0 || self.hash_size % 4 != 0 {
            return Err(LookalikeError::InvalidConfig(format!(
                "hash_size must be a non-zero multiple of 4, got {}",
                self.hash_size
            )));
        }
        if self.hash_size > MAX_HASH_SIZE {
            return Err(LookalikeError::InvalidConfig(format!(
                "hash_size must be at most {MAX_HASH_SIZE}, got {}",
                self.hash_size
            )));
        }
        if self.highfreq_factor == 0 {
            return Err(LookalikeError::InvalidConfig(
                "highfreq_factor must be at least 1".into(),
            ));
        }
        match self.hash_size.checked_mul(self.highfreq_factor) {
            Some(side) if side <= MAX_RESIZE_SIDE => {}
            _ => {
                return Err(LookalikeError::InvalidConfig(format!(
                    "hash_size * highfreq_factor must be at most {MAX_RESIZE_SIDE}, got {} * {}",
                    self.hash_size, self.highfreq_factor
                )));
            }
        }
        if self.max_dimension == 0 {
            return Err(LookalikeError::InvalidConfig(
                "max_dimension must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Number of bits in a produced hash.
    pub fn bit_len(&self) -> usize {
        let side = self.hash_size as usize;
        side.saturating_mul(side)
    }

    /// Side of the square the luminance plane is resized to.
    pub fn resize_side(&self) -> u32 {
        self.hash_size.saturating_mul(self.highfreq_factor)
    }
}
