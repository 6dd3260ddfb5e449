//! Column names shared by ingestion and the cleaning stages.

pub const SPECIES: &str = "species";
pub const DATE: &str = "date";
pub const CARETAKER: &str = "caretaker";
pub const DBH: &str = "dbh";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const SITE_ORDER: &str = "site_order";
pub const PLOT_SIZE: &str = "plot_size";
pub const LEGAL_STATUS: &str = "legal_status";
pub const ADDRESS: &str = "address";
pub const SITE_INFO: &str = "site_info";

pub const SPECIES_LATIN: &str = "species_latin";
pub const SPECIES_ENGLISH: &str = "species_english";
pub const YEAR: &str = "year";
pub const NEIGHBORHOOD: &str = "neighborhood";
pub const NATIVE: &str = "native";

/// Header of the reference species lists.
pub const SPECIES_LIST_COLUMN: &str = "Species";

pub const REQUIRED_COLUMNS: [&str; 8] = [
    SPECIES, DATE, CARETAKER, DBH, LATITUDE, LONGITUDE, SITE_ORDER, PLOT_SIZE,
];

pub const FLOAT_COLUMNS: [&str; 3] = [DBH, LATITUDE, LONGITUDE];
pub const INTEGER_COLUMNS: [&str; 1] = [SITE_ORDER];

/// Cell values read as null, whatever the column type. Matched exactly, so
/// whitespace-only cells stay as text.
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw)
}
