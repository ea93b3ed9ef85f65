//! Cluster detection driver.
//!
//! Scans a [`PixelGrid`] in row-major order, seeding a flood fill at every
//! unvisited pixel that reaches the threshold, and collects the resulting
//! clusters into a [`ClusterCatalog`] in discovery order.
//!
//! Detection is all-or-nothing: if any cluster fails to build, the scan
//! stops and no partial catalog is returned.

use log::{debug, info};
use thiserror::Error;

use super::background::BackgroundModel;
use super::catalog::{Cluster, ClusterCatalog};
use super::grid::PixelGrid;
use super::segment::{ClusterBuilder, VisitedMask};
use crate::config::DetectionConfig;

/// Errors that abort a detection pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("Detection threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),
    #[error("Cluster too large: cluster seeded at {seed:?} exceeded {limit} pixels")]
    ClusterTooLarge { seed: (usize, usize), limit: usize },
}

/// Everything a detection pass produced.
#[derive(Debug, Clone)]
pub struct SegmentationScan {
    /// Clusters in discovery order
    pub catalog: ClusterCatalog,
    /// Final visitation state; complete after a successful scan
    pub mask: VisitedMask,
    /// Pixels that were examined but fell below the threshold
    pub below_threshold: usize,
    /// Threshold the scan ran with
    pub threshold: f64,
}

/// Segments luminosity grids into clusters.
#[derive(Debug, Clone, Default)]
pub struct ClusterDetector {
    config: DetectionConfig,
}

impl ClusterDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect clusters at or above `threshold`.
    pub fn detect(&self, grid: &PixelGrid, threshold: f64) -> Result<ClusterCatalog, DetectionError> {
        self.scan(grid, threshold).map(|scan| scan.catalog)
    }

    /// Detect clusters using `background + threshold_sigma * dispersion`.
    pub fn detect_with_background(
        &self,
        grid: &PixelGrid,
        model: &BackgroundModel,
    ) -> Result<ClusterCatalog, DetectionError> {
        let threshold = model.threshold(self.config.threshold_sigma);
        self.detect(grid, threshold)
    }

    /// Full row-major scan, returning the catalog together with the final
    /// visitation mask and pixel accounting.
    pub fn scan(&self, grid: &PixelGrid, threshold: f64) -> Result<SegmentationScan, DetectionError> {
        if !threshold.is_finite() {
            return Err(DetectionError::NonFiniteThreshold(threshold));
        }

        let (n_rows, n_cols) = grid.dim();
        let builder =
            ClusterBuilder::new(grid, threshold).with_max_pixels(self.config.max_cluster_pixels);
        let mut mask = VisitedMask::for_grid(grid);
        let mut catalog = ClusterCatalog::new();

        for row in 0..n_rows {
            for col in 0..n_cols {
                if !mask.mark_visited(row, col) {
                    continue;
                }
                if grid.value(row, col) < threshold {
                    continue;
                }

                let membership = builder.explore((row, col), &mut mask)?;
                if let Some(cluster) = Cluster::from_membership(membership) {
                    debug!(
                        "Cluster {} seeded at ({row}, {col}): {} px, luminosity {:.1}",
                        catalog.len(),
                        cluster.len(),
                        cluster.integrated_luminosity()
                    );
                    catalog.push(cluster);
                }
            }
        }

        // Every pixel is visited once, so whatever no cluster claimed was dim
        let below_threshold = grid.pixel_count() - catalog.member_pixel_count();

        info!(
            "Found {} clusters above threshold {:.3} in {}x{} grid",
            catalog.len(),
            threshold,
            n_cols,
            n_rows
        );

        Ok(SegmentationScan {
            catalog,
            mask,
            below_threshold,
            threshold,
        })
    }
}
