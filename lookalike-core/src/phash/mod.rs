//! Perceptual hashing for images.
//!
//! This module computes DCT-based perceptual hashes ("pHash") that stay
//! identical or close for the same picture after resizing and recompression,
//! and defines their canonical text form.
//!
//! # Algorithm
//!
//! 1. Convert to 8-bit luminance with ITU-R 601-2 weights (alpha ignored).
//! 2. Resize to `hash_size * highfreq_factor` square (32x32 by default) with
//!    a Lanczos3 filter, ignoring the aspect ratio.
//! 3. Apply an unnormalized 2D DCT-II.
//! 4. Keep the top-left `hash_size x hash_size` block, DC term included.
//! 5. Set each bit when its coefficient is strictly above the block median.
//!
//! Bits are row-major over the retained block and packed MSB first, so the
//! default 64-bit hash prints as 16 lowercase hex digits.
//!
//! # Usage
//!
//! ```no_run
//! use lookalike_core::phash::{PerceptualHash, PerceptualHasher};
//!
//! let hasher = PerceptualHasher::default();
//! let hash1 = hasher.hash_path("reference.jpg".as_ref()).unwrap();
//! let hash2 = PerceptualHash::from_hex("c3a5f0e1d2b49687").unwrap();
//! let distance = hash1.hamming_distance(&hash2).unwrap();
//! let same_picture = distance == 0;
//! ```

mod config;
#[cfg_attr(not(feature = "perceptual-hash"), allow(dead_code))]
mod dct;
#[cfg(feature = "perceptual-hash")]
mod hasher;

use std::fmt;
use std::str::FromStr;

use crate::error::{LookalikeError, Result};

pub use config::{
    HasherConfig, DEFAULT_HASH_SIZE, DEFAULT_HIGHFREQ_FACTOR, DEFAULT_MAX_DIMENSION,
    MAX_HASH_SIZE, MAX_RESIZE_SIDE,
};
#[cfg(feature = "perceptual-hash")]
pub use hasher::PerceptualHasher;

/// Bit length of a hash produced with the default configuration.
pub const DEFAULT_HASH_BITS: usize = (DEFAULT_HASH_SIZE * DEFAULT_HASH_SIZE) as usize;

/// A fixed-length perceptual fingerprint.
///
/// Bit `i` of the row-major grid is stored in byte `i / 8`, most significant
/// bit first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PerceptualHash {
    bytes: Vec<u8>,
}

impl PerceptualHash {
    /// Wrap already packed hash bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Pack a row-major bit sequence. The length must be a multiple of 8.
    pub fn from_bits(bits: &[bool]) -> Result<Self> {
        if bits.len() % 8 != 0 {
            return Err(LookalikeError::MalformedHash(format!(
                "bit count {} is not a whole number of bytes",
                bits.len()
            )));
        }

        let bytes = bits
            .chunks(8)
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(0u8, |byte, &bit| (byte << 1) | u8::from(bit))
            })
            .collect();

        Ok(Self { bytes })
    }

    /// Parse the canonical hex form of a default-length (64-bit) hash.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Self::from_hex_with_bits(hex_str, DEFAULT_HASH_BITS)
    }

    /// Parse the canonical hex form of a hash of `bit_len` bits.
    ///
    /// The string must be exactly `bit_len / 4` hex digits. Uppercase digits
    /// are accepted.
    pub fn from_hex_with_bits(hex_str: &str, bit_len: usize) -> Result<Self> {
        if bit_len == 0 || bit_len % 8 != 0 {
            return Err(LookalikeError::MalformedHash(format!(
                "unsupported hash length of {bit_len} bits"
            )));
        }

        let expected = bit_len / 4;
        if hex_str.len() != expected {
            return Err(LookalikeError::MalformedHash(format!(
                "expected {expected} hex digits, got {}",
                hex_str.len()
            )));
        }

        let bytes = hex::decode(hex_str)
            .map_err(|e| LookalikeError::MalformedHash(format!("invalid hex string: {e}")))?;
        Ok(Self { bytes })
    }

    /// Canonical form: lowercase hex, `bit_len / 4` digits.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Bit at a row-major grid position, `None` past the end.
    pub fn bit(&self, index: usize) -> Option<bool> {
        let byte = self.bytes.get(index / 8)?;
        Some(byte & (0x80 >> (index % 8)) != 0)
    }

    /// Iterate over all bits in row-major order.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        self.bytes
            .iter()
            .flat_map(|byte| (0..8).map(move |shift| byte & (0x80 >> shift) != 0))
    }

    /// Number of differing bit positions.
    ///
    /// Fails with [`LookalikeError::LengthMismatch`] when the hashes were
    /// produced with different hash sizes.
    pub fn hamming_distance(&self, other: &Self) -> Result<u32> {
        hamming_distance(&self.bytes, &other.bytes)
    }

    /// Check whether two hashes are within `threshold` differing bits.
    pub fn is_similar(&self, other: &Self, threshold: u32) -> Result<bool> {
        Ok(self.hamming_distance(other)? <= threshold)
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PerceptualHash {
    type Err = LookalikeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// Compute the Hamming distance between two packed hashes of equal length.
pub fn hamming_distance(hash1: &[u8], hash2: &[u8]) -> Result<u32> {
    if hash1.len() != hash2.len() {
        return Err(LookalikeError::LengthMismatch {
            left: hash1.len() * 8,
            right: hash2.len() * 8,
        });
    }

    Ok(hash1
        .iter()
        .zip(hash2.iter())
        .map(|(a, b)| (a ^ b).count_ones())
        .sum())
}
