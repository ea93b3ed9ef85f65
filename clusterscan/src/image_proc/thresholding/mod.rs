//! Thresholding and background suppression.
//!
//! These helpers produce derived images for display and inspection. The
//! detector itself compares pixel values against the threshold directly and
//! does not need a precomputed mask.

use ndarray::Array2;

use super::grid::PixelGrid;

/// Apply thresholding to a grid and return a binary mask
///
/// # Arguments
///
/// * `grid` - Input luminosity grid
/// * `threshold` - Threshold value
///
/// # Returns
///
/// A binary mask where true indicates a pixel at or above threshold
pub fn apply_threshold(grid: &PixelGrid, threshold: f64) -> Array2<bool> {
    grid.view().mapv(|value| value >= threshold)
}

/// Subtract the background level from pixels that reach `threshold`.
///
/// Pixels below the threshold are set to zero, so only candidate cluster
/// members keep a (background-relative) luminosity.
pub fn remove_background(grid: &PixelGrid, background: f64, threshold: f64) -> Array2<f64> {
    grid.view().mapv(|value| {
        if value >= threshold {
            value - background
        } else {
            0.0
        }
    })
}

/// Number of pixels at or above `threshold`.
pub fn count_above(grid: &PixelGrid, threshold: f64) -> usize {
    grid.view().iter().filter(|&&value| value >= threshold).count()
}
