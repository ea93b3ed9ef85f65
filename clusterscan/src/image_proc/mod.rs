//! Image processing for cluster detection
//!
//! This module turns a luminosity grid into an ordered catalog of 4-connected
//! clusters: background estimation, thresholding, flood-fill segmentation and
//! per-cluster geometry.

pub mod background;
pub mod catalog;
pub mod detection;
pub mod geometry;
pub mod grid;
pub mod segment;
pub mod thresholding;

// Re-export key functionality for easier access
pub use background::{fit_background, BackgroundError, BackgroundModel, Histogram};
pub use catalog::{Cluster, ClusterCatalog};
pub use detection::{ClusterDetector, DetectionError, SegmentationScan};
pub use geometry::{BoundingBox, PixelBounds, PixelPosition};
pub use grid::{GridError, PixelGrid};
pub use segment::{ClusterBuilder, ClusterMembership, VisitedMask};
pub use thresholding::{apply_threshold, remove_background};
