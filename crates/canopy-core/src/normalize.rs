use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use canopy_parser::schema::{DATE, SPECIES, SPECIES_ENGLISH, SPECIES_LATIN, YEAR};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

pub const SPECIES_SEPARATOR: &str = "::";
/// Placeholder used by the inventory for trees whose species was never identified.
pub const UNIDENTIFIED_SPECIES: &str = "Tree(s)";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Inclusive planting-year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearRange {
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            min_year: 2000,
            max_year: 2019,
        }
    }
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_year > self.max_year {
            return Err(PipelineError::Validation(format!(
                "min_year {} is after max_year {}",
                self.min_year, self.max_year
            )));
        }
        Ok(())
    }
}

/// Splits `"<latin> :: <english>"` into trimmed parts. The English name is
/// `None` when the separator is absent or the part after it is blank.
pub fn split_species(composite: &str) -> (String, Option<String>) {
    let mut parts = composite.split(SPECIES_SEPARATOR);
    let latin = parts.next().unwrap_or_default().trim().to_string();
    let english = parts
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    (latin, english)
}

pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.year());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.year());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date.year());
        }
    }
    None
}

/// Splits the composite species field, derives `year` from `date` and drops
/// placeholder species, rows outside `years` and rows without an English name.
/// The composite `species` column is removed.
pub fn normalize_fields(df: &DataFrame, years: YearRange) -> Result<DataFrame> {
    let species = df.column(SPECIES)?.as_materialized_series().str()?;
    let dates = df.column(DATE)?.as_materialized_series().str()?;

    let len = df.height();
    let mut latin_names: Vec<Option<String>> = Vec::with_capacity(len);
    let mut english_names: Vec<Option<String>> = Vec::with_capacity(len);
    let mut year_values: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut keep = Vec::with_capacity(len);
    let mut unparseable_dates = 0usize;

    for idx in 0..len {
        let (latin, english) = match species.get(idx) {
            Some(raw) => {
                let (latin, english) = split_species(raw);
                (Some(latin), english)
            }
            None => (None, None),
        };

        let year = match dates.get(idx) {
            Some(raw) => {
                let parsed = parse_year(raw);
                if parsed.is_none() {
                    unparseable_dates += 1;
                }
                parsed
            }
            None => None,
        };

        let placeholder = latin.as_deref() == Some(UNIDENTIFIED_SPECIES);
        let in_range = year.is_some_and(|value| years.contains(value));
        keep.push(!placeholder && in_range && english.is_some());

        latin_names.push(latin);
        english_names.push(english);
        year_values.push(year);
    }

    if unparseable_dates > 0 {
        warn!(count = unparseable_dates, "dropping rows with unparseable dates");
    }

    let mut output = df.drop(SPECIES)?;
    output.with_column(Series::new(SPECIES_LATIN.into(), latin_names))?;
    output.with_column(Series::new(SPECIES_ENGLISH.into(), english_names))?;
    output.with_column(Series::new(YEAR.into(), year_values))?;

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let output = output.filter(&mask)?;

    info!(
        input_rows = len,
        kept_rows = output.height(),
        min_year = years.min_year,
        max_year = years.max_year,
        "normalized species and year fields"
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_handles_missing_and_blank_english_names() {
        assert_eq!(
            split_species("Quercus agrifolia :: Coast Live Oak"),
            ("Quercus agrifolia".to_string(), Some("Coast Live Oak".to_string()))
        );
        assert_eq!(split_species("Tree(s) ::"), ("Tree(s)".to_string(), None));
        assert_eq!(split_species("Acacia"), ("Acacia".to_string(), None));
    }

    #[test]
    fn parse_year_understands_inventory_date_styles() {
        assert_eq!(parse_year("2015-03-01"), Some(2015));
        assert_eq!(parse_year("03/01/2015 12:00:00 AM"), Some(2015));
        assert_eq!(parse_year("2015-03-01T08:30:00"), Some(2015));
        assert_eq!(parse_year("2015-03-01T08:30:00Z"), Some(2015));
        assert_eq!(parse_year("last spring"), None);
    }

    #[test]
    fn year_range_is_inclusive() {
        let years = YearRange::default();
        assert!(years.contains(2000));
        assert!(years.contains(2019));
        assert!(!years.contains(1999));
        assert!(!years.contains(2020));
    }

    #[test]
    fn inverted_year_range_fails_validation() {
        let years = YearRange {
            min_year: 2020,
            max_year: 2000,
        };
        assert!(years.validate().is_err());
    }
}
