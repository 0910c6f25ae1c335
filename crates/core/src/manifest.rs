//! Manifest and layer types.

use serde::{Deserialize, Serialize};

/// One content-addressed unit within a manifest.
///
/// `digest` uniquely identifies the layer's bytes (e.g. `sha256-<hex>`);
/// `size` is the exact byte length of that content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Content hash identifier.
    pub digest: String,
    /// Exact byte length of the content.
    pub size: u64,
}

/// A manifest describing the content set of a push.
///
/// Immutable once committed to storage; unknown top-level fields in the
/// JSON form are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Ordered layer descriptors.
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl Manifest {
    /// Parse a manifest from its JSON bytes.
    pub fn from_slice(data: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(data).map_err(|e| crate::Error::InvalidManifest(e.to_string()))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}
