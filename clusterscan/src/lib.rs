//! Luminous cluster detection for sky images.
//!
//! A [`PixelGrid`] of luminosity values is segmented into 4-connected
//! clusters of pixels at or above a threshold. The threshold normally comes
//! from a Gaussian fit of the image background. Detected clusters can then be
//! projected onto the sky and named through the `skyid` crate.
//!
//! ```rust
//! use clusterscan::{ClusterDetector, PixelGrid};
//!
//! let grid = PixelGrid::from_rows(vec![
//!     vec![0.0, 0.0, 0.0],
//!     vec![0.0, 100.0, 0.0],
//!     vec![0.0, 0.0, 0.0],
//! ])
//! .unwrap();
//!
//! let catalog = ClusterDetector::default().detect(&grid, 50.0).unwrap();
//! assert_eq!(catalog.len(), 1);
//! assert_eq!(catalog.get(0).unwrap().integrated_luminosity(), 100.0);
//! ```

pub mod config;
pub mod enrich;
pub mod image_proc;
pub mod io;

pub use config::{ConfigError, DetectionConfig};
pub use enrich::{identify_clusters, locate_clusters, ClusterEnrichment, EnrichError, EnrichedCatalog};
pub use image_proc::{
    fit_background, BackgroundModel, Cluster, ClusterCatalog, ClusterDetector, DetectionError,
    GridError, PixelGrid,
};
pub use io::{load_grid, LoadError};
