use std::collections::HashSet;

use canopy_parser::schema::CARETAKER;
use once_cell::sync::Lazy;
use polars::prelude::*;
use tracing::info;

use crate::error::Result;

pub const PUBLIC_OFFICE: &str = "Public Office";
pub const RESIDENTIAL: &str = "Residential";
pub const PRIVATE: &str = "Private";

/// Caretaker names that belong to a public agency.
pub const PUBLIC_CARETAKERS: [&str; 18] = [
    "DPW",
    "Rec/Park",
    "PUC",
    "Port",
    "SFUSD",
    "Dept of Real Estate",
    "Fire Dept",
    "MTA",
    "DPW for City Agency",
    "Public Library",
    "Police Dept",
    "Office of Mayor",
    "Purchasing Dept",
    "Health Dept",
    "Housing Authority",
    "Mayor Office of Housing",
    "Arts Commission",
    "City College",
];

static PUBLIC_LOOKUP: Lazy<HashSet<&'static str>> =
    Lazy::new(|| PUBLIC_CARETAKERS.iter().copied().collect());

pub fn remap_caretaker(raw: &str) -> &str {
    if PUBLIC_LOOKUP.contains(raw) {
        PUBLIC_OFFICE
    } else if raw == PRIVATE {
        RESIDENTIAL
    } else {
        raw
    }
}

/// Collapses public agencies into `Public Office` and `Private` into
/// `Residential`; other values, nulls included, pass through.
pub fn remap_caretakers(df: &DataFrame) -> Result<DataFrame> {
    let caretakers = df.column(CARETAKER)?.as_materialized_series().str()?;

    let mut remapped_rows = 0usize;
    let remapped: Vec<Option<&str>> = caretakers
        .into_iter()
        .map(|value| {
            value.map(|raw| {
                let mapped = remap_caretaker(raw);
                if mapped != raw {
                    remapped_rows += 1;
                }
                mapped
            })
        })
        .collect();

    let mut output = df.clone();
    output.with_column(Series::new(CARETAKER.into(), remapped))?;

    info!(remapped_rows, "remapped caretaker categories");

    Ok(output)
}
