use std::collections::BTreeMap;

use canopy_parser::schema::{NATIVE, NEIGHBORHOOD};
use canopy_parser::{
    read_neighborhoods, read_species_list, read_tree_inventory, IngestStats, ReferenceSpeciesSet,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::caretaker::remap_caretakers;
use crate::completeness::{drop_legacy_columns, filter_incomplete};
use crate::config::CleanerConfig;
use crate::error::Result;
use crate::native::classify_native;
use crate::normalize::normalize_fields;
use crate::spatial::{drop_unmatched, join_neighborhoods, NeighborhoodIndex, PointInPolygonIndex};
use crate::writer::{write_json, write_output};

/// Everything a run reads before any transformation starts.
pub struct PipelineInputs {
    pub trees: DataFrame,
    pub ingest_stats: IngestStats,
    pub neighborhoods: NeighborhoodIndex,
    pub region_a: ReferenceSpeciesSet,
    pub region_b: ReferenceSpeciesSet,
}

impl PipelineInputs {
    /// Reads all four inputs. Any missing or malformed file aborts the run.
    pub fn load(config: &CleanerConfig) -> Result<Self> {
        let inputs = &config.inputs;

        let inventory = read_tree_inventory(&inputs.trees)?;
        info!(
            path = %inputs.trees.display(),
            rows = inventory.stats.rows,
            columns = inventory.df.width(),
            "read tree inventory"
        );
        for (column, count) in &inventory.stats.unparseable {
            warn!(column = %column, count, "numeric cells could not be parsed and were read as null");
        }
        if inventory.stats.short_rows > 0 {
            warn!(
                count = inventory.stats.short_rows,
                "rows shorter than the header were padded with nulls"
            );
        }

        let layer = read_neighborhoods(&inputs.neighborhoods, &inputs.neighborhood_property)?;
        let neighborhoods = NeighborhoodIndex::from_layer(layer)?;
        info!(
            path = %inputs.neighborhoods.display(),
            polygons = neighborhoods.len(),
            crs = %neighborhoods.crs(),
            "read neighborhood boundaries"
        );

        let region_a = read_species_list(&inputs.region_a_species, "region_a")?;
        let region_b = read_species_list(&inputs.region_b_species, "region_b")?;
        info!(
            region_a_species = region_a.len(),
            region_b_species = region_b.len(),
            "read reference species lists"
        );

        Ok(Self {
            trees: inventory.df,
            ingest_stats: inventory.stats,
            neighborhoods,
            region_a,
            region_b,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub input_rows: usize,
    pub after_normalize: usize,
    pub after_completeness: usize,
    pub matched_neighborhood: usize,
    pub output_rows: usize,
    pub native_counts: BTreeMap<String, usize>,
    pub neighborhood_counts: BTreeMap<String, usize>,
    pub unparseable_cells: BTreeMap<String, usize>,
}

pub struct PipelineOutput {
    pub dataframe: DataFrame,
    pub summary: PipelineSummary,
}

/// Runs every cleaning stage in order. Native classification runs before
/// unmatched rows are dropped, so it sees the same rows whether or not they
/// later fall out of the join.
pub fn run_pipeline(inputs: &PipelineInputs, config: &CleanerConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let tree_crs = config.tree_crs()?;

    let normalized = normalize_fields(&inputs.trees, config.filters)?;
    let remapped = remap_caretakers(&normalized)?;
    let narrowed = drop_legacy_columns(&remapped)?;
    let complete = filter_incomplete(&narrowed)?;
    let joined = join_neighborhoods(&complete, &inputs.neighborhoods, tree_crs)?;
    let classified = classify_native(&joined, &inputs.region_a, &inputs.region_b)?;
    let output = drop_unmatched(&classified)?;

    debug!(columns = ?output.get_column_names(), "final schema");

    let summary = PipelineSummary {
        input_rows: inputs.trees.height(),
        after_normalize: normalized.height(),
        after_completeness: complete.height(),
        matched_neighborhood: classified.height() - classified.column(NEIGHBORHOOD)?.null_count(),
        output_rows: output.height(),
        native_counts: count_values(&output, NATIVE)?,
        neighborhood_counts: count_values(&output, NEIGHBORHOOD)?,
        unparseable_cells: inputs.ingest_stats.unparseable.clone(),
    };

    info!(
        input_rows = summary.input_rows,
        output_rows = summary.output_rows,
        "cleaning pipeline complete"
    );

    Ok(PipelineOutput {
        dataframe: output,
        summary,
    })
}

fn count_values(df: &DataFrame, column: &str) -> Result<BTreeMap<String, usize>> {
    let values = df.column(column)?.as_materialized_series().str()?;
    let mut counts = BTreeMap::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value.to_string()).or_default() += 1;
    }
    Ok(counts)
}

/// Loads the inputs, runs the pipeline and writes the output (and the summary
/// when configured). Nothing is written unless every stage succeeds.
pub fn run(config: &CleanerConfig) -> Result<PipelineSummary> {
    let inputs = PipelineInputs::load(config)?;
    let output = run_pipeline(&inputs, config)?;

    write_output(&output.dataframe, &config.output.path, config.output.format)?;
    if let Some(path) = &config.output.summary {
        write_json(&output.summary, path)?;
        info!(path = %path.display(), "wrote run summary");
    }

    Ok(output.summary)
}
