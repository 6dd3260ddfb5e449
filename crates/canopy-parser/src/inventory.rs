use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::*;

use crate::errors::IngestError;
use crate::model::{IngestStats, TreeInventory};
use crate::schema::{is_missing, FLOAT_COLUMNS, INTEGER_COLUMNS, REQUIRED_COLUMNS};

const INPUT: &str = "tree inventory";

enum ColumnValues {
    Text(Vec<Option<String>>),
    Float(Vec<Option<f64>>),
    Integer(Vec<Option<i64>>),
}

struct ColumnBuilder {
    name: String,
    values: ColumnValues,
}

impl ColumnBuilder {
    fn for_column(name: &str) -> Self {
        let values = if FLOAT_COLUMNS.contains(&name) {
            ColumnValues::Float(Vec::new())
        } else if INTEGER_COLUMNS.contains(&name) {
            ColumnValues::Integer(Vec::new())
        } else {
            ColumnValues::Text(Vec::new())
        };
        Self {
            name: name.to_string(),
            values,
        }
    }

    /// Appends one cell. Returns `false` when a non-missing numeric cell could
    /// not be parsed; the cell is stored as null in that case.
    fn push(&mut self, raw: &str) -> bool {
        if is_missing(raw) {
            self.push_null();
            return true;
        }

        match &mut self.values {
            ColumnValues::Text(values) => {
                values.push(Some(raw.to_string()));
                true
            }
            ColumnValues::Float(values) => {
                let parsed = parse_float(raw);
                values.push(parsed);
                parsed.is_some()
            }
            ColumnValues::Integer(values) => {
                let parsed = parse_integer(raw);
                values.push(parsed);
                parsed.is_some()
            }
        }
    }

    fn push_null(&mut self) {
        match &mut self.values {
            ColumnValues::Text(values) => values.push(None),
            ColumnValues::Float(values) => values.push(None),
            ColumnValues::Integer(values) => values.push(None),
        }
    }

    fn finish(self) -> Series {
        let name: PlSmallStr = self.name.into();
        match self.values {
            ColumnValues::Text(values) => Series::new(name, values),
            ColumnValues::Float(values) => Series::new(name, values),
            ColumnValues::Integer(values) => Series::new(name, values),
        }
    }
}

pub(crate) fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Accepts plain integers and integral floats such as `3.0`.
pub(crate) fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

pub fn read_tree_inventory(path: impl AsRef<Path>) -> Result<TreeInventory, IngestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_tree_inventory(&content)
}

/// Reads the tree inventory CSV into a frame, keeping every column of the
/// file. Measurement columns are typed, everything else stays text.
///
/// Rows shorter than the header are padded with nulls and left for the
/// completeness filter; rows longer than the header are an error.
pub fn parse_tree_inventory(content: &str) -> Result<TreeInventory, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(IngestError::csv(INPUT))?.clone();
    let names: Vec<&str> = headers.iter().map(str::trim).collect();

    for required in REQUIRED_COLUMNS {
        if !names.contains(&required) {
            return Err(IngestError::MissingColumn {
                input: INPUT,
                column: required.to_string(),
            });
        }
    }

    let mut builders: Vec<ColumnBuilder> =
        names.iter().map(|name| ColumnBuilder::for_column(name)).collect();
    let mut stats = IngestStats::default();

    for record in reader.records() {
        let record = record.map_err(IngestError::csv(INPUT))?;
        if record.len() > builders.len() {
            return Err(IngestError::ExtraFields {
                input: INPUT,
                row: stats.rows + 1,
                found: record.len(),
                expected: builders.len(),
            });
        }
        if record.len() < builders.len() {
            stats.short_rows += 1;
        }

        for (position, builder) in builders.iter_mut().enumerate() {
            match record.get(position) {
                Some(value) => {
                    if !builder.push(value) {
                        *stats.unparseable.entry(builder.name.clone()).or_default() += 1;
                    }
                }
                None => builder.push_null(),
            }
        }
        stats.rows += 1;
    }

    let columns: Vec<Column> = builders
        .into_iter()
        .map(|builder| builder.finish().into())
        .collect();
    let df = DataFrame::new(columns)?;

    Ok(TreeInventory { df, stats })
}
