//! Sky identification collaborators for detected clusters.
//!
//! Everything needed to turn a pixel position into something an astronomer
//! recognises: equatorial coordinates and their sexagesimal text form, a
//! gnomonic (TAN) world coordinate system, and lookups against remote or
//! in-memory object catalogs with a deterministic naming rule.

pub mod coords;
pub mod naming;
pub mod simbad;
pub mod wcs;

pub use coords::{format_dms, format_hms, format_radec, Equatorial};
pub use naming::{select_name, UNFOUND_NAME, UNKNOWN_TYPE};
pub use simbad::{CatalogEntry, LookupError, ObjectCatalog, SimbadClient, StaticCatalog};
pub use wcs::{PixelToSky, TanWcs, WcsError};
