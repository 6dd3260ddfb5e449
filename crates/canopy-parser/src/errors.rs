use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{input} CSV error: {source}")]
    Csv {
        input: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{input} row {row} has {found} fields, header has {expected}")]
    ExtraFields {
        input: &'static str,
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("{input} is missing required column '{column}'")]
    MissingColumn { input: &'static str, column: String },

    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("neighborhood boundaries must be a FeatureCollection, found {found}")]
    NotAFeatureCollection { found: &'static str },

    #[error("neighborhood feature {index} invalid: {message}")]
    Feature { index: usize, message: String },

    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl IngestError {
    pub(crate) fn csv(input: &'static str) -> impl FnOnce(csv::Error) -> Self {
        move |source| IngestError::Csv { input, source }
    }
}
