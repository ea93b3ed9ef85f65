//! Sky positions and catalog names attached to detected clusters.
//!
//! Clusters are immutable once detected. What is learned about them later
//! lives in a parallel [`ClusterEnrichment`] record at the same catalog
//! index, so the detection output stays reproducible no matter which
//! lookups were run afterwards.

use log::{debug, warn};
use serde::Serialize;
use skyid::{select_name, Equatorial, LookupError, ObjectCatalog, PixelToSky, WcsError, UNFOUND_NAME};
use thiserror::Error;

use crate::image_proc::catalog::{Cluster, ClusterCatalog};

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Cluster {index}: sky transform failed: {source}")]
    Wcs {
        index: usize,
        #[source]
        source: WcsError,
    },
    #[error("Cluster {index}: catalog lookup failed: {source}")]
    Lookup {
        index: usize,
        #[source]
        source: LookupError,
    },
    #[error("No cluster at index {0}")]
    UnknownCluster(usize),
}

/// Information attached to one cluster after detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterEnrichment {
    /// Sky position of the cluster centroid
    pub sky: Option<Equatorial>,
    /// Catalog name chosen for the cluster
    pub name: Option<String>,
}

/// One cluster joined with its enrichment, for serialization.
#[derive(Debug, Serialize)]
pub struct EnrichedRecord<'a> {
    pub index: usize,
    #[serde(flatten)]
    pub cluster: &'a Cluster,
    #[serde(flatten)]
    pub enrichment: &'a ClusterEnrichment,
}

/// A cluster catalog with one enrichment record per cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedCatalog {
    catalog: ClusterCatalog,
    enrichments: Vec<ClusterEnrichment>,
}

impl EnrichedCatalog {
    /// Start with an empty record for every cluster.
    pub fn new(catalog: ClusterCatalog) -> Self {
        let enrichments = vec![ClusterEnrichment::default(); catalog.len()];
        Self {
            catalog,
            enrichments,
        }
    }

    pub fn catalog(&self) -> &ClusterCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(&Cluster, &ClusterEnrichment)> {
        Some((self.catalog.get(index)?, self.enrichments.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Cluster, &ClusterEnrichment)> + '_ {
        self.catalog.iter().zip(self.enrichments.iter())
    }

    pub fn records(&self) -> Vec<EnrichedRecord<'_>> {
        self.iter()
            .enumerate()
            .map(|(index, (cluster, enrichment))| EnrichedRecord {
                index,
                cluster,
                enrichment,
            })
            .collect()
    }

    /// Resolve a name for a single located cluster.
    ///
    /// Returns `Ok(None)` when the cluster has no sky position yet.
    pub fn identify_cluster(
        &mut self,
        index: usize,
        objects: &dyn ObjectCatalog,
        radius_deg: f64,
    ) -> Result<Option<&str>, EnrichError> {
        let enrichment = self
            .enrichments
            .get_mut(index)
            .ok_or(EnrichError::UnknownCluster(index))?;
        let Some(sky) = enrichment.sky else {
            return Ok(None);
        };

        let found = objects
            .objects_near(sky.ra_deg, sky.dec_deg, radius_deg)
            .map_err(|source| EnrichError::Lookup { index, source })?;
        let name = select_name(&found);
        if name == UNFOUND_NAME {
            warn!("Cluster {index}: no catalog object within {radius_deg} deg of {sky}");
        } else {
            debug!("Cluster {index}: identified as {name}");
        }

        enrichment.name = Some(name);
        Ok(enrichment.name.as_deref())
    }
}

/// Project every cluster centroid onto the sky.
pub fn locate_clusters(
    catalog: ClusterCatalog,
    wcs: &dyn PixelToSky,
) -> Result<EnrichedCatalog, EnrichError> {
    let mut enriched = EnrichedCatalog::new(catalog);
    for (index, cluster) in enriched.catalog.iter().enumerate() {
        let centroid = cluster.centroid();
        let sky = wcs
            .pixel_to_sky(centroid.x, centroid.y)
            .map_err(|source| EnrichError::Wcs { index, source })?;
        enriched.enrichments[index].sky = Some(sky);
    }
    Ok(enriched)
}

/// Resolve names for every located cluster; unlocated ones are skipped.
pub fn identify_clusters(
    enriched: &mut EnrichedCatalog,
    objects: &dyn ObjectCatalog,
    radius_deg: f64,
) -> Result<(), EnrichError> {
    for index in 0..enriched.len() {
        enriched.identify_cluster(index, objects, radius_deg)?;
    }
    Ok(())
}
