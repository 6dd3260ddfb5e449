use std::fmt;

use canopy_parser::schema::{NATIVE, SPECIES_LATIN};
use canopy_parser::ReferenceSpeciesSet;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum NativeStatus {
    #[default]
    NotNative,
    NativeToRegionA,
    NativeToRegionB,
}

impl NativeStatus {
    pub const ALL: [NativeStatus; 3] = [
        NativeStatus::NotNative,
        NativeStatus::NativeToRegionA,
        NativeStatus::NativeToRegionB,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NativeStatus::NotNative => "NotNative",
            NativeStatus::NativeToRegionA => "NativeToRegionA",
            NativeStatus::NativeToRegionB => "NativeToRegionB",
        }
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for NativeStatus {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        NativeStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown native status '{value}'"))
    }
}

/// Exact, case-sensitive membership. Region B is tested after region A and
/// wins when a species is listed in both.
pub fn classify_species(
    species_latin: Option<&str>,
    region_a: &ReferenceSpeciesSet,
    region_b: &ReferenceSpeciesSet,
) -> NativeStatus {
    let mut status = NativeStatus::NotNative;
    let Some(name) = species_latin else {
        return status;
    };
    if region_a.contains(name) {
        status = NativeStatus::NativeToRegionA;
    }
    if region_b.contains(name) {
        status = NativeStatus::NativeToRegionB;
    }
    status
}

pub fn classify_native(
    df: &DataFrame,
    region_a: &ReferenceSpeciesSet,
    region_b: &ReferenceSpeciesSet,
) -> Result<DataFrame> {
    let species = df.column(SPECIES_LATIN)?.as_materialized_series().str()?;

    let statuses: Vec<&str> = species
        .into_iter()
        .map(|name| classify_species(name, region_a, region_b).as_str())
        .collect();

    let mut output = df.clone();
    output.with_column(Series::new(NATIVE.into(), statuses))?;

    info!(
        rows = output.height(),
        region_a = region_a.label(),
        region_a_species = region_a.len(),
        region_b = region_b.label(),
        region_b_species = region_b.len(),
        "classified native species"
    );

    Ok(output)
}
