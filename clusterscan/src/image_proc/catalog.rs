//! Completed clusters and the ordered catalog that holds them.

use serde::Serialize;

use super::geometry::{BoundingBox, ClusterGeometry, PixelBounds, PixelPosition};
use super::grid::PixelGrid;
use super::segment::ClusterMembership;

/// A connected group of pixels at or above the detection threshold.
///
/// Built once from its flood-fill membership and read-only afterwards.
/// Anything learned later about the cluster (sky position, catalog name)
/// lives in a separate record keyed by the cluster's catalog index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pixels: Vec<(usize, usize)>,
    integrated_luminosity: f64,
    #[serde(skip)]
    bounds: PixelBounds,
    bounding_box: BoundingBox,
    centroid: PixelPosition,
}

impl Cluster {
    /// Finalize a membership into a cluster; `None` if it has no pixels.
    pub fn from_membership(membership: ClusterMembership) -> Option<Self> {
        let geometry = ClusterGeometry::from_pixels(&membership.pixels)?;
        Some(Self {
            pixels: membership.pixels,
            integrated_luminosity: membership.integrated_luminosity,
            bounds: geometry.bounds,
            bounding_box: geometry.bounding_box,
            centroid: geometry.centroid,
        })
    }

    /// Member pixels as `(row, col)` in discovery order, seed first.
    pub fn pixels(&self) -> &[(usize, usize)] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always false for clusters produced by detection.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The pixel that started the flood fill.
    pub fn seed(&self) -> (usize, usize) {
        self.pixels[0]
    }

    pub fn integrated_luminosity(&self) -> f64 {
        self.integrated_luminosity
    }

    pub fn bounds(&self) -> &PixelBounds {
        &self.bounds
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Midpoint of the pixel extent.
    pub fn centroid(&self) -> PixelPosition {
        self.centroid
    }

    /// Luminosity-weighted center of the member pixels.
    ///
    /// Falls back to [`centroid`](Self::centroid) when the member values sum
    /// to zero, which can happen with a non-positive threshold.
    pub fn weighted_centroid(&self, grid: &PixelGrid) -> PixelPosition {
        let (mut sum, mut sum_x, mut sum_y) = (0.0, 0.0, 0.0);
        for &(row, col) in &self.pixels {
            let value = grid.value(row, col);
            sum += value;
            sum_x += value * col as f64;
            sum_y += value * row as f64;
        }
        if sum == 0.0 {
            return self.centroid;
        }
        PixelPosition::new(sum_x / sum, sum_y / sum)
    }

    /// Whether the pointer position `(x, y)` falls inside the bounding box.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.bounding_box.contains(x, y)
    }
}

/// Clusters in the order the row-major scan discovered them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClusterCatalog {
    clusters: Vec<Cluster>,
}

impl ClusterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clusters(clusters: Vec<Cluster>) -> Self {
        Self { clusters }
    }

    pub fn push(&mut self, cluster: Cluster) {
        self.clusters.push(cluster);
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Cluster> {
        self.clusters.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cluster> {
        self.clusters.iter()
    }

    pub fn as_slice(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Total number of pixels claimed by all clusters.
    pub fn member_pixel_count(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    /// The cluster with the greatest integrated luminosity.
    ///
    /// The running maximum starts at zero and only a strictly greater value
    /// replaces it, so ties go to the earliest cluster and clusters with
    /// non-positive luminosity are never selected.
    pub fn brightest(&self) -> Option<(usize, &Cluster)> {
        let mut best: Option<(usize, &Cluster)> = None;
        let mut greatest = 0.0;
        for (index, cluster) in self.clusters.iter().enumerate() {
            if cluster.integrated_luminosity > greatest {
                greatest = cluster.integrated_luminosity;
                best = Some((index, cluster));
            }
        }
        best
    }

    /// Every cluster whose bounding box contains `(x, y)`, in catalog order.
    ///
    /// Bounding boxes may overlap, so more than one cluster can match.
    pub fn clusters_at(&self, x: f64, y: f64) -> impl Iterator<Item = (usize, &Cluster)> + '_ {
        self.clusters
            .iter()
            .enumerate()
            .filter(move |(_, cluster)| cluster.contains_point(x, y))
    }

    /// The first cluster in catalog order whose bounding box contains `(x, y)`.
    pub fn first_at(&self, x: f64, y: f64) -> Option<(usize, &Cluster)> {
        self.clusters_at(x, y).next()
    }
}

impl<'a> IntoIterator for &'a ClusterCatalog {
    type Item = &'a Cluster;
    type IntoIter = std::slice::Iter<'a, Cluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}
