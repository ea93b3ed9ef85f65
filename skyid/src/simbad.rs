//! Object catalog lookups.
//!
//! A cone search returns every catalogued object within a radius of a sky
//! position as a `name -> object type` mapping. [`SimbadClient`] performs the
//! search remotely through the SIMBAD script interface; [`StaticCatalog`]
//! answers from an in-memory list, which is what tests and offline runs use.

use crate::coords::Equatorial;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Default SIMBAD script endpoint.
pub const SIMBAD_SCRIPT_URL: &str = "http://simbad.u-strasbg.fr/simbad/sim-script";

/// Number of `:` characters following `::data` in the SIMBAD data marker.
const DATA_MARKER_COLONS: usize = 74;

/// Errors raised by catalog lookups.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] ureq::Error),
    #[error("Catalog returned HTTP {status} after {attempts} attempts")]
    RetriesExhausted { attempts: usize, status: u16 },
    #[error("Invalid cone search: ra={ra}, dec={dec}, radius={radius}")]
    InvalidQuery { ra: f64, dec: f64, radius: f64 },
}

/// A catalog that can be searched by position.
pub trait ObjectCatalog {
    /// Objects within `radius_deg` of `(ra_deg, dec_deg)`, keyed by name.
    fn objects_near(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        radius_deg: f64,
    ) -> Result<BTreeMap<String, String>, LookupError>;
}

fn check_query(ra: f64, dec: f64, radius: f64) -> Result<(), LookupError> {
    if ra.is_finite() && dec.is_finite() && radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(LookupError::InvalidQuery { ra, dec, radius })
    }
}

/// Blocking client for the SIMBAD script service.
#[derive(Debug, Clone)]
pub struct SimbadClient {
    endpoint: String,
    max_attempts: usize,
    retry_delay: Duration,
}

impl Default for SimbadClient {
    fn default() -> Self {
        Self {
            endpoint: SIMBAD_SCRIPT_URL.to_string(),
            max_attempts: 10,
            retry_delay: Duration::from_millis(200),
        }
    }
}

impl SimbadClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different script endpoint (mirror or local stub).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Retry policy for HTTP status failures. At least one attempt is made.
    pub fn with_retries(mut self, max_attempts: usize, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// SIMBAD script for a cone search around `(ra, dec)`.
    ///
    /// Each result row is formatted as RA, Dec, object type and main
    /// identifier, separated by tabs.
    pub fn build_script(ra_deg: f64, dec_deg: f64, radius_deg: f64) -> String {
        let mut script = String::new();
        script.push_str("format object f1 \"%COO(A)\t%COO(D)\t%OTYPE(S)\t%IDLIST(1)\"\r\n");
        script.push_str(&format!(
            "query coo {:.6} {:.6} radius={:.6}d frame=FK5 epoch=J2000 equinox=2000\r\n",
            ra_deg, dec_deg, radius_deg
        ));
        script
    }

    /// Full request URL for a cone search.
    pub fn request_url(&self, ra_deg: f64, dec_deg: f64, radius_deg: f64) -> String {
        let script = Self::build_script(ra_deg, dec_deg, radius_deg);
        format!("{}?script={}", self.endpoint, urlencoding::encode(&script))
    }

    /// Extract the `name -> type` mapping from a SIMBAD script response.
    ///
    /// Everything before the `::data::::...` marker is the echo of the
    /// script and diagnostics; rows after it are tab separated with the
    /// object type in column 2 and the identifier in column 3.
    pub fn parse_response(text: &str) -> BTreeMap<String, String> {
        let marker = format!("::data{}", ":".repeat(DATA_MARKER_COLONS));
        let mut objects = BTreeMap::new();
        let mut in_data = false;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !in_data {
                in_data = line == marker;
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 4 {
                debug!("Skipping malformed SIMBAD row: {line:?}");
                continue;
            }
            objects.insert(fields[3].trim().to_string(), fields[2].trim().to_string());
        }

        objects
    }

    fn fetch(&self, url: &str) -> Result<String, LookupError> {
        let mut last_status = 0;
        for attempt in 1..=self.max_attempts {
            match ureq::get(url).call() {
                Ok(mut response) => {
                    let body = response.body_mut().read_to_string()?;
                    // HTML-wrapped responses carry the payload before the first break
                    let payload = body.split("<BR>\n").next().unwrap_or_default();
                    return Ok(payload.to_string());
                }
                Err(ureq::Error::StatusCode(status)) => {
                    warn!(
                        "SIMBAD returned HTTP {status} (attempt {attempt}/{})",
                        self.max_attempts
                    );
                    last_status = status;
                    thread::sleep(self.retry_delay);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LookupError::RetriesExhausted {
            attempts: self.max_attempts,
            status: last_status,
        })
    }
}

impl ObjectCatalog for SimbadClient {
    fn objects_near(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        radius_deg: f64,
    ) -> Result<BTreeMap<String, String>, LookupError> {
        check_query(ra_deg, dec_deg, radius_deg)?;
        let url = self.request_url(ra_deg, dec_deg, radius_deg);
        debug!("SIMBAD query: {url}");
        let text = self.fetch(&url)?;
        Ok(Self::parse_response(&text))
    }
}

/// A catalogued object with a known position.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub object_type: String,
    pub position: Equatorial,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, object_type: impl Into<String>, position: Equatorial) -> Self {
        Self {
            name: name.into(),
            object_type: object_type.into(),
            position,
        }
    }
}

/// In-memory catalog answering cone searches by angular separation.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ObjectCatalog for StaticCatalog {
    fn objects_near(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        radius_deg: f64,
    ) -> Result<BTreeMap<String, String>, LookupError> {
        check_query(ra_deg, dec_deg, radius_deg)?;
        let center = Equatorial::from_degrees(ra_deg, dec_deg);
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.position.separation_deg(&center) <= radius_deg)
            .map(|entry| (entry.name.clone(), entry.object_type.clone()))
            .collect())
    }
}
