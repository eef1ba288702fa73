//! Parameters id derivation.
//!
//! Tiles rendered with different non-coordinate parameters (styles, filters,
//! time dimensions) are kept apart on disk by appending a parameters id to
//! the zoom directory. The id is the SHA-1 digest of the canonical
//! `&key=value` form of the parameter map in lowercase hex, the same id
//! GeoWebCache writes, so it is stable across requests and caches seeded by
//! GeoWebCache itself resolve to the same directories.

use std::collections::BTreeMap;

use sha1::{Digest, Sha1};

/// Canonical string form of a parameter map: `&k1=v1&k2=v2`, keys sorted.
pub fn canonical_parameters(parameters: &BTreeMap<String, String>) -> String {
    let mut canonical = String::new();
    for (key, value) in parameters {
        canonical.push('&');
        canonical.push_str(key);
        canonical.push('=');
        canonical.push_str(value);
    }
    canonical
}

/// Derive the parameters id for a parameter map.
///
/// Returns `None` for an empty map: tiles without parameters live directly
/// in the plain zoom directory.
pub fn parameters_id(parameters: &BTreeMap<String, String>) -> Option<String> {
    if parameters.is_empty() {
        return None;
    }

    let digest = Sha1::digest(canonical_parameters(parameters).as_bytes());
    Some(hex::encode(digest))
}
