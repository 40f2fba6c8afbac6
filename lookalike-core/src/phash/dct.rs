//! Low-frequency DCT block and median thresholding.

use std::f64::consts::PI;

use super::PerceptualHash;
use crate::error::Result;

/// Rows `0..keep` of the unnormalized DCT-II basis for length `len`:
/// `2 * cos(pi * k * (2n + 1) / (2 * len))`.
fn basis(len: usize, keep: usize) -> Vec<f64> {
    let mut table = Vec::with_capacity(keep * len);
    for k in 0..keep {
        for n in 0..len {
            let angle = PI * k as f64 * (2 * n + 1) as f64 / (2 * len) as f64;
            table.push(2.0 * angle.cos());
        }
    }
    table
}

/// Top-left `keep x keep` block of the 2D DCT-II of a square `side x side`
/// row-major matrix. The transform runs along columns first, then rows.
pub(crate) fn low_frequency_block(pixels: &[f64], side: usize, keep: usize) -> Vec<f64> {
    debug_assert_eq!(pixels.len(), side * side);
    debug_assert!(keep <= side);

    let basis = basis(side, keep);

    // columns: partial[k][n] = sum_m basis[k][m] * x[m][n]
    let mut partial = vec![0.0f64; keep * side];
    for k in 0..keep {
        let coeffs = &basis[k * side..(k + 1) * side];
        let out = &mut partial[k * side..(k + 1) * side];
        for (m, &c) in coeffs.iter().enumerate() {
            let row = &pixels[m * side..(m + 1) * side];
            for (acc, &x) in out.iter_mut().zip(row) {
                *acc += c * x;
            }
        }
    }

    // rows: block[k][l] = sum_n basis[l][n] * partial[k][n]
    let mut block = Vec::with_capacity(keep * keep);
    for k in 0..keep {
        let row = &partial[k * side..(k + 1) * side];
        for l in 0..keep {
            let coeffs = &basis[l * side..(l + 1) * side];
            block.push(coeffs.iter().zip(row).map(|(c, x)| c * x).sum());
        }
    }
    block
}

/// Median of a non-empty slice; the mean of the two middle values when the
/// length is even.
pub(crate) fn median(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// One bit per coefficient, set when strictly above the median of the
/// whole block (DC included). Coefficients equal to the median stay clear.
pub(crate) fn threshold_bits(block: &[f64]) -> Vec<bool> {
    let threshold = median(block);
    block.iter().map(|&c| c > threshold).collect()
}

/// Hash a resized `side x side` luminance plane.
pub(crate) fn hash_luma(pixels: &[f64], side: usize, hash_size: usize) -> Result<PerceptualHash> {
    let block = low_frequency_block(pixels, side, hash_size);
    PerceptualHash::from_bits(&threshold_bits(&block))
}
