//! Selection of a single display name from a catalog cone search.

use std::collections::BTreeMap;

/// Object type reported by the catalog for unclassified sources.
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Name assigned when the cone search returns nothing.
pub const UNFOUND_NAME: &str = "Unfound";

/// Pick the name to show for a cluster from a `name -> type` mapping.
///
/// Classified objects win over unclassified ones; within each group the
/// alphabetically first name is taken. An empty mapping yields
/// [`UNFOUND_NAME`].
pub fn select_name(objects: &BTreeMap<String, String>) -> String {
    // BTreeMap iterates in key order, so the first match is alphabetical.
    objects
        .iter()
        .find(|(_, object_type)| object_type.as_str() != UNKNOWN_TYPE)
        .or_else(|| objects.iter().next())
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| UNFOUND_NAME.to_string())
}
