//! Cluster geometry: pixel extent, overlay bounding box and centroid.
//!
//! Three related shapes describe where a cluster sits in the image:
//!
//! - [`PixelBounds`]: inclusive integer extent over `(row, col)` indices.
//! - [`BoundingBox`]: the rectangle drawn around the cluster in overlay
//!   space. Pixel centers sit on integer coordinates, so the box corner is
//!   shifted by half a pixel to enclose whole pixels.
//! - [`PixelPosition`]: the cluster centroid, defined as the midpoint of the
//!   pixel extent. It is deliberately not luminosity weighted; see
//!   `Cluster::weighted_centroid` for that metric.
//!
//! # Coordinate System
//! - **x** follows columns, increasing to the right
//! - **y** follows rows, increasing downward
//!
//! # Examples
//!
//! ```rust
//! use clusterscan::image_proc::geometry::ClusterGeometry;
//!
//! let geometry = ClusterGeometry::from_pixels(&[(1, 1), (1, 2), (2, 1), (2, 2)]).unwrap();
//! assert_eq!(geometry.bounding_box.x, 0.5);
//! assert_eq!(geometry.bounding_box.y, 0.5);
//! assert_eq!(geometry.bounding_box.width, 2);
//! assert_eq!(geometry.centroid.x, 1.5);
//! ```

use serde::{Deserialize, Serialize};

/// Inclusive pixel extent of a cluster in `(row, col)` indices.
///
/// # Examples
///
/// ```rust
/// use clusterscan::image_proc::geometry::PixelBounds;
///
/// let mut bounds = PixelBounds::new();
/// assert!(!bounds.is_valid());
///
/// bounds.expand_to_include(50, 100);
/// bounds.expand_to_include(55, 95);
/// assert_eq!(bounds.width(), 6);
/// assert_eq!(bounds.height(), 6);
/// assert!(bounds.contains_pixel(52, 97));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBounds {
    /// Minimum row (y) coordinate (inclusive)
    pub min_row: usize,
    /// Minimum column (x) coordinate (inclusive)
    pub min_col: usize,
    /// Maximum row (y) coordinate (inclusive)
    pub max_row: usize,
    /// Maximum column (x) coordinate (inclusive)
    pub max_col: usize,
}

impl PixelBounds {
    /// Empty bounds, invalid until a pixel is added with
    /// [`expand_to_include`](Self::expand_to_include).
    pub fn new() -> Self {
        Self {
            min_row: usize::MAX,
            min_col: usize::MAX,
            max_row: 0,
            max_col: 0,
        }
    }

    pub fn from_coords(min_row: usize, min_col: usize, max_row: usize, max_col: usize) -> Self {
        Self {
            min_row,
            min_col,
            max_row,
            max_col,
        }
    }

    /// Tightest bounds around `pixels`, or `None` when the slice is empty.
    pub fn from_pixels(pixels: &[(usize, usize)]) -> Option<Self> {
        if pixels.is_empty() {
            return None;
        }
        let mut bounds = Self::new();
        for &(row, col) in pixels {
            bounds.expand_to_include(row, col);
        }
        Some(bounds)
    }

    pub fn expand_to_include(&mut self, row: usize, col: usize) {
        self.min_row = self.min_row.min(row);
        self.min_col = self.min_col.min(col);
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }

    pub fn is_valid(&self) -> bool {
        self.min_row <= self.max_row && self.min_col <= self.max_col
    }

    /// Width in pixels (`max_col - min_col + 1`).
    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    /// Height in pixels (`max_row - min_row + 1`).
    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn contains_pixel(&self, row: usize, col: usize) -> bool {
        row >= self.min_row && row <= self.max_row && col >= self.min_col && col <= self.max_col
    }

    /// Midpoint of the extent as an `(x, y)` position.
    pub fn center(&self) -> PixelPosition {
        PixelPosition {
            x: (self.min_col + self.max_col) as f64 / 2.0,
            y: (self.min_row + self.max_row) as f64 / 2.0,
        }
    }
}

impl Default for PixelBounds {
    fn default() -> Self {
        Self::new()
    }
}

/// Sub-pixel position in image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPosition {
    /// Column coordinate
    pub x: f64,
    /// Row coordinate
    pub y: f64,
}

impl PixelPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Overlay rectangle around a cluster: corner `(x, y)` plus size in pixels.
///
/// The corner is the outer edge of the top-left pixel, half a pixel before
/// its center, so the rectangle drawn over an image covers the member pixels
/// entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (`min_col - 0.5`)
    pub x: f64,
    /// Top edge (`min_row - 0.5`)
    pub y: f64,
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl BoundingBox {
    pub fn from_bounds(bounds: &PixelBounds) -> Self {
        Self {
            x: bounds.min_col as f64 - 0.5,
            y: bounds.min_row as f64 - 0.5,
            width: bounds.width(),
            height: bounds.height(),
        }
    }

    /// Right edge.
    pub fn x_max(&self) -> f64 {
        self.x + self.width as f64
    }

    /// Bottom edge.
    pub fn y_max(&self) -> f64 {
        self.y + self.height as f64
    }

    /// Picking test for a pointer position.
    ///
    /// The position is truncated toward zero before the comparison and all
    /// edges are inclusive. Neighboring boxes can therefore both report a
    /// hit for the same position.
    ///
    /// ```rust
    /// use clusterscan::image_proc::geometry::{BoundingBox, PixelBounds};
    ///
    /// let bbox = BoundingBox::from_bounds(&PixelBounds::from_coords(2, 3, 4, 5));
    /// assert!(bbox.contains(3.9, 2.2));
    /// assert!(bbox.contains(5.7, 4.9));
    /// assert!(!bbox.contains(2.9, 3.0));
    /// ```
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let x = x.trunc();
        let y = y.trunc();
        x >= self.x && x <= self.x_max() && y >= self.y && y <= self.y_max()
    }
}

/// Finalized geometry of a cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterGeometry {
    pub bounds: PixelBounds,
    pub bounding_box: BoundingBox,
    pub centroid: PixelPosition,
}

impl ClusterGeometry {
    /// Compute geometry from member pixels; `None` for an empty list.
    pub fn from_pixels(pixels: &[(usize, usize)]) -> Option<Self> {
        let bounds = PixelBounds::from_pixels(pixels)?;
        Some(Self {
            bounds,
            bounding_box: BoundingBox::from_bounds(&bounds),
            centroid: bounds.center(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_geometry() {
        let geometry = ClusterGeometry::from_pixels(&[(7, 3)]).unwrap();

        assert_eq!(geometry.bounds, PixelBounds::from_coords(7, 3, 7, 3));
        assert_eq!(geometry.centroid, PixelPosition::new(3.0, 7.0));
        assert_eq!(
            geometry.bounding_box,
            BoundingBox {
                x: 2.5,
                y: 6.5,
                width: 1,
                height: 1
            }
        );
    }

    #[test]
    fn test_centroid_is_extent_midpoint() {
        // Heavily unbalanced membership: the centroid ignores pixel counts
        let pixels = [(0, 0), (0, 1), (0, 2), (0, 3), (1, 3), (2, 3), (3, 3), (4, 1)];
        let geometry = ClusterGeometry::from_pixels(&pixels).unwrap();

        assert_eq!(geometry.centroid, PixelPosition::new(1.5, 2.0));
        assert_eq!(geometry.bounding_box.width, 4);
        assert_eq!(geometry.bounding_box.height, 5);
        assert_eq!(geometry.bounding_box.x, -0.5);
        assert_eq!(geometry.bounding_box.y, -0.5);
    }

    #[test]
    fn test_empty_pixels_have_no_geometry() {
        assert!(ClusterGeometry::from_pixels(&[]).is_none());
        assert!(PixelBounds::from_pixels(&[]).is_none());
        assert!(!PixelBounds::new().is_valid());
        assert_eq!(PixelBounds::default(), PixelBounds::new());
    }

    #[test]
    fn test_bounds_contain_all_members() {
        let pixels = [(5, 9), (6, 9), (6, 10), (7, 8)];
        let geometry = ClusterGeometry::from_pixels(&pixels).unwrap();

        for &(row, col) in &pixels {
            assert!(geometry.bounds.contains_pixel(row, col));
            assert!(geometry.bounding_box.contains(col as f64, row as f64));
        }
        assert_eq!(geometry.bounds.area(), 9);
    }

    #[test]
    fn test_contains_truncates_position() {
        let bbox = BoundingBox::from_bounds(&PixelBounds::from_coords(10, 10, 10, 10));
        // Box spans [9.5, 10.5] on both axes
        assert!(bbox.contains(10.0, 10.0));
        assert!(bbox.contains(10.99, 10.99));
        assert!(!bbox.contains(9.99, 10.0));
        assert!(!bbox.contains(11.0, 10.0));
        assert_eq!(bbox.x_max(), 10.5);
        assert_eq!(bbox.y_max(), 10.5);
    }

    #[test]
    fn test_adjacent_boxes_can_both_match() {
        let left = BoundingBox::from_bounds(&PixelBounds::from_coords(0, 0, 0, 1));
        let right = BoundingBox::from_bounds(&PixelBounds::from_coords(0, 2, 0, 3));
        // Edges meet at x = 1.5; the truncated x = 1 falls in the left box only
        assert!(left.contains(1.2, 0.0));
        assert!(!right.contains(1.2, 0.0));
        // Overlapping extents share a hit
        let wide = BoundingBox::from_bounds(&PixelBounds::from_coords(0, 0, 0, 3));
        assert!(wide.contains(2.0, 0.0) && right.contains(2.0, 0.0));
    }
}
