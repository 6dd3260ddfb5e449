use std::collections::{BTreeMap, HashSet};
use std::fmt;

use geo::MultiPolygon;
use polars::prelude::DataFrame;
use serde::Serialize;

/// Position of a feature in the neighborhood boundary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PolygonId(pub usize);

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct NeighborhoodPolygon {
    pub id: PolygonId,
    /// `None` when the name property is JSON `null`; trees inside such a
    /// polygon get a null neighborhood.
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// Boundary features as read from disk, before the CRS name is resolved.
#[derive(Debug, Clone, Default)]
pub struct NeighborhoodLayer {
    pub polygons: Vec<NeighborhoodPolygon>,
    pub crs_name: Option<String>,
    /// Indices of features that had no geometry.
    pub skipped_features: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub rows: usize,
    /// Non-empty numeric cells that failed to parse, keyed by column.
    pub unparseable: BTreeMap<String, usize>,
    /// Rows with fewer fields than the header, padded with nulls.
    pub short_rows: usize,
}

pub struct TreeInventory {
    pub df: DataFrame,
    pub stats: IngestStats,
}

/// Species names used only for membership tests. Names are kept exactly as
/// written in the source list.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSpeciesSet {
    label: String,
    species: HashSet<String>,
}

impl ReferenceSpeciesSet {
    pub fn new<I, S>(label: impl Into<String>, species: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            species: species.into_iter().map(Into::into).collect(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn contains(&self, species: &str) -> bool {
        self.species.contains(species)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}
