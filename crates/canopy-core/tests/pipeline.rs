use std::fs;
use std::path::Path;

use canopy_core::config::CleanerConfig;
use canopy_core::error::PipelineError;
use canopy_core::caretaker::remap_caretakers;
use canopy_core::completeness::{drop_legacy_columns, filter_incomplete};
use canopy_core::crs::CoordinateSystem;
use canopy_core::native::{classify_native, NativeStatus};
use canopy_core::normalize::{normalize_fields, YearRange};
use canopy_core::pipeline::{self, run_pipeline, PipelineInputs};
use canopy_core::spatial::{drop_unmatched, join_neighborhoods, NeighborhoodIndex};
use canopy_parser::{parse_neighborhoods, parse_species_list, parse_tree_inventory};
use polars::prelude::*;

const TREES: &str = "\
tree_id,legal_status,species,address,site_order,site_info,caretaker,date,dbh,plot_size,latitude,longitude
1,Permitted Site,Quercus agrifolia :: Coast Live Oak,1 Valencia St,1,Sidewalk: Curb side : Cutout,DPW,2015-03-01,12,4x4,37.77,-122.41
2,Permitted Site,Quercus agrifolia :: Coast Live Oak,2 Valencia St,1,Sidewalk,DPW,1999-03-01,12,4x4,37.77,-122.41
3,Undocumented,Aesculus californica :: California Buckeye,3 Valencia St,2,Sidewalk,Private,2012-06-15,8,3x3,37.771,-122.411
4,Undocumented,Pinus radiata :: Monterey Pine,4 Ocean Ave,1,Sidewalk,Private,2012-06-15,20,3x3,37.70,-122.50
5,Undocumented,Tree(s) ::,5 Valencia St,1,Sidewalk,DPW,2012-06-15,5,3x3,37.77,-122.41
6,Undocumented,Tristaniopsis laurina :: Swamp Myrtle,6 Valencia St,1,Sidewalk,Dept of Public Health,2018-01-01,,3x3,37.77,-122.41
7,Undocumented,Arbutus menziesii :: Pacific Madrone,7 Valencia St,3,Sidewalk,Rec/Park,2005-09-09,10,Width 4ft,37.775,-122.405
";

const NEIGHBORHOODS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "neighborhood": "Mission", "id": 0 },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[-122.42, 37.76], [-122.40, 37.76], [-122.40, 37.78], [-122.42, 37.78], [-122.42, 37.76]]]
      }
    }
  ]
}"#;

const REGION_A: &str = "Species\nQuercus agrifolia\nAesculus californica\nPinus radiata\n";
const REGION_B: &str = "Species\nAesculus californica\nArbutus menziesii\n";

fn inputs() -> PipelineInputs {
    let inventory = parse_tree_inventory(TREES).expect("inventory");
    let layer = parse_neighborhoods(NEIGHBORHOODS, "neighborhood").expect("neighborhoods");
    PipelineInputs {
        trees: inventory.df,
        ingest_stats: inventory.stats,
        neighborhoods: NeighborhoodIndex::from_layer(layer).expect("index"),
        region_a: parse_species_list(REGION_A, "region_a").expect("region a"),
        region_b: parse_species_list(REGION_B, "region_b").expect("region b"),
    }
}

fn str_values(df: &DataFrame, column: &str) -> Vec<String> {
    df.column(column)
        .expect(column)
        .as_materialized_series()
        .str()
        .expect("str column")
        .into_iter()
        .map(|value| value.unwrap_or_default().to_string())
        .collect()
}

fn row_index(df: &DataFrame, tree_id: &str) -> Option<usize> {
    str_values(df, "tree_id").iter().position(|id| id == tree_id)
}

#[test]
fn reference_scenario_produces_expected_row() {
    let output = run_pipeline(&inputs(), &CleanerConfig::default()).expect("pipeline");
    let df = &output.dataframe;

    let idx = row_index(df, "1").expect("tree 1 should survive");
    assert_eq!(str_values(df, "species_latin")[idx], "Quercus agrifolia");
    assert_eq!(str_values(df, "species_english")[idx], "Coast Live Oak");
    assert_eq!(str_values(df, "caretaker")[idx], "Public Office");
    assert_eq!(str_values(df, "neighborhood")[idx], "Mission");
    assert_eq!(str_values(df, "native")[idx], NativeStatus::NativeToRegionA.as_str());

    let years = df.column("year").unwrap().as_materialized_series().i32().unwrap();
    assert_eq!(years.get(idx), Some(2015));
}

#[test]
fn dropped_rows_match_each_filter() {
    let output = run_pipeline(&inputs(), &CleanerConfig::default()).expect("pipeline");
    let df = &output.dataframe;

    assert_eq!(str_values(df, "tree_id"), vec!["1", "3", "7"]);
    assert!(row_index(df, "2").is_none(), "1999 planting should be dropped");
    assert!(row_index(df, "4").is_none(), "tree outside every neighborhood should be dropped");
    assert!(row_index(df, "5").is_none(), "placeholder species should be dropped");
    assert!(row_index(df, "6").is_none(), "tree without dbh should be dropped");
}

#[test]
fn private_caretaker_becomes_residential() {
    let output = run_pipeline(&inputs(), &CleanerConfig::default()).expect("pipeline");
    let df = &output.dataframe;
    let idx = row_index(df, "3").unwrap();
    assert_eq!(str_values(df, "caretaker")[idx], "Residential");
}

#[test]
fn species_in_both_lists_is_native_to_region_b() {
    let output = run_pipeline(&inputs(), &CleanerConfig::default()).expect("pipeline");
    let df = &output.dataframe;

    let buckeye = row_index(df, "3").unwrap();
    assert_eq!(str_values(df, "native")[buckeye], "NativeToRegionB");
    let madrone = row_index(df, "7").unwrap();
    assert_eq!(str_values(df, "native")[madrone], "NativeToRegionB");
}

#[test]
fn output_rows_satisfy_cleaning_invariants() {
    let output = run_pipeline(&inputs(), &CleanerConfig::default()).expect("pipeline");
    let df = &output.dataframe;

    let years = df.column("year").unwrap().as_materialized_series().i32().unwrap();
    assert!(years.into_iter().all(|year| year.is_some_and(|y| (2000..=2019).contains(&y))));
    assert!(str_values(df, "species_latin").iter().all(|name| name != "Tree(s)"));
    assert!(str_values(df, "species_english").iter().all(|name| !name.is_empty()));

    for column in ["dbh", "latitude", "longitude", "site_order", "plot_size", "neighborhood"] {
        assert_eq!(df.column(column).unwrap().null_count(), 0, "{column} has nulls");
    }
}

#[test]
fn output_schema_excludes_dropped_and_artifact_columns() {
    let output = run_pipeline(&inputs(), &CleanerConfig::default()).expect("pipeline");
    let columns: Vec<String> = output
        .dataframe
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    for absent in ["species", "legal_status", "address", "site_info", "geometry", "index_right"] {
        assert!(!columns.iter().any(|name| name == absent), "{absent} should be gone");
    }
    for present in [
        "tree_id",
        "species_latin",
        "species_english",
        "date",
        "year",
        "caretaker",
        "dbh",
        "latitude",
        "longitude",
        "site_order",
        "plot_size",
        "neighborhood",
        "native",
    ] {
        assert!(columns.iter().any(|name| name == present), "{present} missing");
    }
}

#[test]
fn summary_counts_each_stage() {
    let output = run_pipeline(&inputs(), &CleanerConfig::default()).expect("pipeline");
    let summary = output.summary;

    assert_eq!(summary.input_rows, 7);
    assert_eq!(summary.after_normalize, 5);
    assert_eq!(summary.after_completeness, 4);
    assert_eq!(summary.matched_neighborhood, 3);
    assert_eq!(summary.output_rows, 3);
    assert_eq!(summary.native_counts.get("NativeToRegionA"), Some(&1));
    assert_eq!(summary.native_counts.get("NativeToRegionB"), Some(&2));
    assert_eq!(summary.neighborhood_counts.get("Mission"), Some(&3));
}

#[test]
fn trees_outside_every_neighborhood_are_classified_before_dropping() {
    let inputs = inputs();
    let normalized = normalize_fields(&inputs.trees, YearRange::default()).unwrap();
    let remapped = remap_caretakers(&normalized).unwrap();
    let complete = filter_incomplete(&drop_legacy_columns(&remapped).unwrap()).unwrap();
    let joined =
        join_neighborhoods(&complete, &inputs.neighborhoods, CoordinateSystem::Wgs84).unwrap();
    let classified = classify_native(&joined, &inputs.region_a, &inputs.region_b).unwrap();

    let pine = row_index(&classified, "4").expect("tree 4 is still present before the drop");
    let neighborhood = classified.column("neighborhood").unwrap().as_materialized_series().str().unwrap();
    assert_eq!(neighborhood.get(pine), None);
    assert_eq!(str_values(&classified, "native")[pine], "NativeToRegionA");

    let output = drop_unmatched(&classified).unwrap();
    assert!(row_index(&output, "4").is_none());
    assert_eq!(output.height(), classified.height() - 1);
}

#[test]
fn short_inventory_row_is_dropped_without_failing_the_run() {
    let mut trees = TREES.to_string();
    trees.push_str("8,Undocumented,Quercus agrifolia :: Coast Live Oak,8 Valencia St,1,Sidewalk,DPW,2016-02-02,9\n");

    let mut inputs = inputs();
    let inventory = parse_tree_inventory(&trees).expect("short row should not abort ingestion");
    assert_eq!(inventory.stats.short_rows, 1);
    inputs.trees = inventory.df;
    inputs.ingest_stats = inventory.stats;

    let output = run_pipeline(&inputs, &CleanerConfig::default()).expect("pipeline");

    assert_eq!(output.summary.input_rows, 8);
    assert_eq!(output.summary.after_normalize, 6);
    assert_eq!(output.summary.after_completeness, 4);
    assert_eq!(str_values(&output.dataframe, "tree_id"), vec!["1", "3", "7"]);
}

fn write_inputs(dir: &Path) -> CleanerConfig {
    fs::write(dir.join("trees.csv"), TREES).unwrap();
    fs::write(dir.join("neighborhoods.json"), NEIGHBORHOODS).unwrap();
    fs::write(dir.join("ca.csv"), REGION_A).unwrap();
    fs::write(dir.join("sf.csv"), REGION_B).unwrap();

    let mut config = CleanerConfig::default();
    config.inputs.trees = dir.join("trees.csv");
    config.inputs.neighborhoods = dir.join("neighborhoods.json");
    config.inputs.region_a_species = dir.join("ca.csv");
    config.inputs.region_b_species = dir.join("sf.csv");
    config.output.path = dir.join("out").join("cleaned_trees.csv");
    config.output.summary = Some(dir.join("out").join("summary.json"));
    config
}

#[test]
fn run_writes_output_that_reads_back_with_same_shape() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path());

    let summary = pipeline::run(&config).expect("run");

    let mut reader = csv::Reader::from_path(&config.output.path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(reader.records().count(), summary.output_rows);

    let inputs = PipelineInputs::load(&config).unwrap();
    let in_memory = run_pipeline(&inputs, &config).unwrap().dataframe;
    let expected: Vec<String> = in_memory
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let written: Vec<String> = headers.iter().map(str::to_string).collect();
    assert_eq!(written, expected);

    let summary_json: serde_json::Value =
        serde_json::from_slice(&fs::read(config.output.summary.as_ref().unwrap()).unwrap()).unwrap();
    assert_eq!(summary_json["output_rows"], 3);
}

#[test]
fn missing_input_aborts_without_writing_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path());
    config.inputs.region_b_species = dir.path().join("does_not_exist.csv");

    let err = pipeline::run(&config).err().expect("missing file should fail");

    assert!(matches!(err, PipelineError::Ingest(_)));
    assert!(!config.output.path.exists());
}
