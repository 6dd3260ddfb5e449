use std::fs;
use std::path::Path;

use csv::ReaderBuilder;

use crate::errors::IngestError;
use crate::model::ReferenceSpeciesSet;
use crate::schema::SPECIES_LIST_COLUMN;

const INPUT: &str = "species list";

pub fn read_species_list(
    path: impl AsRef<Path>,
    label: &str,
) -> Result<ReferenceSpeciesSet, IngestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_species_list(&content, label)
}

pub fn parse_species_list(content: &str, label: &str) -> Result<ReferenceSpeciesSet, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(IngestError::csv(INPUT))?;
    let position = headers
        .iter()
        .position(|name| name.trim() == SPECIES_LIST_COLUMN)
        .ok_or_else(|| IngestError::MissingColumn {
            input: INPUT,
            column: SPECIES_LIST_COLUMN.to_string(),
        })?;

    let mut species = Vec::new();
    for record in reader.records() {
        let record = record.map_err(IngestError::csv(INPUT))?;
        if let Some(name) = record.get(position).filter(|name| !name.is_empty()) {
            species.push(name.to_string());
        }
    }

    Ok(ReferenceSpeciesSet::new(label, species))
}
