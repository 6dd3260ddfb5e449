use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crs::CoordinateSystem;
use crate::error::{PipelineError, Result};
use crate::normalize::YearRange;
use crate::writer::OutputFormat;

/// Environment variable naming a TOML configuration file.
pub const CONFIG_ENV_VAR: &str = "CANOPY_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    pub inputs: InputSettings,
    pub output: OutputSettings,
    pub filters: YearRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub trees: PathBuf,
    pub neighborhoods: PathBuf,
    /// GeoJSON feature property holding the neighborhood name.
    pub neighborhood_property: String,
    pub region_a_species: PathBuf,
    pub region_b_species: PathBuf,
    /// CRS of the inventory's longitude/latitude columns.
    pub tree_crs: String,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            trees: PathBuf::from("sf_trees.csv"),
            neighborhoods: PathBuf::from("SanFrancisco.Neighborhoods.json"),
            neighborhood_property: "neighborhood".to_string(),
            region_a_species: PathBuf::from("native_trees_of_ca.csv"),
            region_b_species: PathBuf::from("native_trees_of_sf.csv"),
            tree_crs: "EPSG:4326".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub summary: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cleaned_trees.csv"),
            format: OutputFormat::Csv,
            summary: None,
        }
    }
}

impl CleanerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CleanerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.filters.validate()?;
        self.tree_crs()?;
        if self.inputs.neighborhood_property.trim().is_empty() {
            return Err(PipelineError::Validation(
                "neighborhood_property must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tree_crs(&self) -> Result<CoordinateSystem> {
        CoordinateSystem::from_name(&self.inputs.tree_crs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = CleanerConfig::from_toml_str("").unwrap();
        assert_eq!(config, CleanerConfig::default());
        assert_eq!(config.filters, YearRange { min_year: 2000, max_year: 2019 });
        assert_eq!(config.output.path, PathBuf::from("cleaned_trees.csv"));
        assert_eq!(config.tree_crs().unwrap(), CoordinateSystem::Wgs84);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = CleanerConfig::from_toml_str(
            r#"
            [inputs]
            trees = "data/trees.csv"
            tree_crs = "EPSG:3857"

            [output]
            format = "parquet"
            summary = "out/summary.json"

            [filters]
            max_year = 2021
            "#,
        )
        .unwrap();

        assert_eq!(config.inputs.trees, PathBuf::from("data/trees.csv"));
        assert_eq!(config.inputs.neighborhood_property, "neighborhood");
        assert_eq!(config.tree_crs().unwrap(), CoordinateSystem::WebMercator);
        assert_eq!(config.output.format, OutputFormat::Parquet);
        assert_eq!(config.output.summary, Some(PathBuf::from("out/summary.json")));
        assert_eq!(config.filters.min_year, 2000);
        assert_eq!(config.filters.max_year, 2021);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let inverted = CleanerConfig::from_toml_str("[filters]\nmin_year = 2019\nmax_year = 2000\n");
        assert!(matches!(inverted, Err(PipelineError::Validation(_))));

        let unknown_crs = CleanerConfig::from_toml_str("[inputs]\ntree_crs = \"EPSG:2227\"\n");
        assert!(matches!(unknown_crs, Err(PipelineError::UnsupportedCrs(_))));

        let bad_format = CleanerConfig::from_toml_str("[output]\nformat = \"xlsx\"\n");
        assert!(matches!(bad_format, Err(PipelineError::Config(_))));
    }
}
