//! Node location storage used while assembling way and relation geometry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How node locations are held between the node pass and shape assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeIndexKind {
    /// Hash map keyed by node id. Fast lookups, higher memory use.
    #[default]
    Hash,
    /// Sorted vector searched by binary search. Compact for large extracts.
    Sorted,
}

impl NodeIndexKind {
    /// Lowercase strategy name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Sorted => "sorted",
        }
    }
}

impl fmt::Display for NodeIndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a node index name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown node index `{0}` (expected `hash` or `sorted`)")]
pub struct UnknownNodeIndex(pub String);

impl FromStr for NodeIndexKind {
    type Err = UnknownNodeIndex;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "sorted" => Ok(Self::Sorted),
            other => Err(UnknownNodeIndex(other.to_owned())),
        }
    }
}

#[derive(Debug)]
pub(crate) enum NodeLocations {
    Hash(HashMap<i64, Coord<f64>>),
    Sorted(Vec<(i64, Coord<f64>)>),
}

impl NodeLocations {
    pub(crate) fn new(kind: NodeIndexKind, capacity: usize) -> Self {
        match kind {
            NodeIndexKind::Hash => Self::Hash(HashMap::with_capacity(capacity)),
            NodeIndexKind::Sorted => Self::Sorted(Vec::with_capacity(capacity)),
        }
    }

    pub(crate) fn insert(&mut self, id: i64, location: Coord<f64>) {
        match self {
            Self::Hash(map) => {
                map.insert(id, location);
            }
            Self::Sorted(entries) => entries.push((id, location)),
        }
    }

    /// Prepare the index for lookups. Must run after the last insert.
    pub(crate) fn seal(&mut self) {
        if let Self::Sorted(entries) = self {
            entries.sort_unstable_by_key(|(id, _)| *id);
            entries.dedup_by_key(|(id, _)| *id);
        }
    }

    pub(crate) fn get(&self, id: i64) -> Option<Coord<f64>> {
        match self {
            Self::Hash(map) => map.get(&id).copied(),
            Self::Sorted(entries) => entries
                .binary_search_by_key(&id, |(key, _)| *key)
                .ok()
                .and_then(|position| entries.get(position))
                .map(|(_, location)| *location),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Hash(map) => map.len(),
            Self::Sorted(entries) => entries.len(),
        }
    }
}

/// Accept a decoded location only when it lies inside WGS84 bounds.
pub(crate) fn valid_location(lon: f64, lat: f64) -> Option<Coord<f64>> {
    (lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat))
    .then_some(Coord { x: lon, y: lat })
}
