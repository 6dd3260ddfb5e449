use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use canopy_core::config::{CleanerConfig, CONFIG_ENV_VAR};
use canopy_core::pipeline::{self, PipelineSummary};
use canopy_core::spatial::{NeighborhoodIndex, PointInPolygonIndex};
use canopy_core::writer::OutputFormat;
use canopy_parser::read_neighborhoods;
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Street-tree inventory cleaning and neighborhood enrichment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the inventory, join neighborhoods and classify native species
    Run(RunArgs),
    /// List the polygons found in the neighborhood boundary file
    Neighborhoods(NeighborhoodsArgs),
}

#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// TOML configuration file (defaults to $CANOPY_CONFIG, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Tree inventory CSV
    #[arg(long)]
    trees: Option<PathBuf>,
    /// Neighborhood boundaries (GeoJSON FeatureCollection)
    #[arg(long)]
    neighborhoods: Option<PathBuf>,
    /// Destination of the cleaned inventory
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output format: csv or parquet
    #[arg(long)]
    format: Option<OutputFormat>,
    /// Also write the run summary as JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct NeighborhoodsArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Neighborhood boundaries (GeoJSON FeatureCollection)
    #[arg(long)]
    neighborhoods: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Neighborhoods(args) => handle_neighborhoods(args),
    }
}

fn load_config(args: &ConfigArgs) -> Result<CleanerConfig> {
    dotenvy::dotenv().ok();

    let path = args
        .config
        .clone()
        .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

    match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            CleanerConfig::load(&path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))
        }
        None => Ok(CleanerConfig::default()),
    }
}

fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;

    if let Some(trees) = args.trees {
        config.inputs.trees = trees;
    }
    if let Some(neighborhoods) = args.neighborhoods {
        config.inputs.neighborhoods = neighborhoods;
    }
    if let Some(output) = args.output {
        config.output.path = output;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.summary.is_some() {
        config.output.summary = args.summary;
    }

    let summary = pipeline::run(&config).context("tree cleaning run failed")?;

    println!("{}", summary_table(&summary));
    println!("Wrote {} rows to {}", summary.output_rows, config.output.path.display());

    Ok(())
}

fn summary_table(summary: &PipelineSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Stage", "Rows"]);
    table.add_row(vec!["read".to_string(), summary.input_rows.to_string()]);
    table.add_row(vec!["species/year normalized".to_string(), summary.after_normalize.to_string()]);
    table.add_row(vec!["complete records".to_string(), summary.after_completeness.to_string()]);
    table.add_row(vec!["inside a neighborhood".to_string(), summary.matched_neighborhood.to_string()]);
    table.add_row(vec!["written".to_string(), summary.output_rows.to_string()]);
    for (status, count) in &summary.native_counts {
        table.add_row(vec![format!("native: {status}"), count.to_string()]);
    }
    table
}

fn handle_neighborhoods(args: NeighborhoodsArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(neighborhoods) = args.neighborhoods {
        config.inputs.neighborhoods = neighborhoods;
    }

    let path = &config.inputs.neighborhoods;
    let layer = read_neighborhoods(path, &config.inputs.neighborhood_property)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let index = NeighborhoodIndex::from_layer(layer)
        .with_context(|| format!("unusable CRS in {}", path.display()))?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Polygons"]);
    for polygon in index.polygons() {
        table.add_row(vec![
            polygon.id.to_string(),
            polygon.name.clone().unwrap_or_default(),
            polygon.geometry.0.len().to_string(),
        ]);
    }

    println!("{table}");
    println!("{} neighborhoods, CRS {}", index.len(), index.crs());

    Ok(())
}
