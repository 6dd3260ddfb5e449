use canopy_parser::schema::{
    ADDRESS, DBH, LATITUDE, LEGAL_STATUS, LONGITUDE, PLOT_SIZE, SITE_INFO, SITE_ORDER,
};
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::Result;

/// Bulky columns removed from the schema whatever their values.
pub const LEGACY_COLUMNS: [&str; 3] = [LEGAL_STATUS, ADDRESS, SITE_INFO];

pub const REQUIRED_ATTRIBUTES: [&str; 5] = [DBH, LATITUDE, LONGITUDE, SITE_ORDER, PLOT_SIZE];

/// Removes each of `names` that is present in `df`.
pub fn drop_columns_if_present(df: &DataFrame, names: &[&str]) -> Result<DataFrame> {
    let mut output = df.clone();
    for name in names {
        if output.column(name).is_ok() {
            output = output.drop(name)?;
            debug!(column = *name, "dropped column");
        }
    }
    Ok(output)
}

pub fn drop_legacy_columns(df: &DataFrame) -> Result<DataFrame> {
    drop_columns_if_present(df, &LEGACY_COLUMNS)
}

/// Drops rows missing any of the required measurement or plot attributes.
pub fn filter_incomplete(df: &DataFrame) -> Result<DataFrame> {
    let predicate = REQUIRED_ATTRIBUTES
        .iter()
        .fold(lit(true), |acc, name| acc.and(col(*name).is_not_null()));

    let output = df.clone().lazy().filter(predicate).collect()?;

    info!(
        input_rows = df.height(),
        kept_rows = output.height(),
        "dropped incomplete records"
    );

    Ok(output)
}
