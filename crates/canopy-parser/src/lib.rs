pub mod errors;
pub mod inventory;
pub mod model;
pub mod neighborhoods;
pub mod schema;
pub mod species;

pub use errors::IngestError;
pub use inventory::{parse_tree_inventory, read_tree_inventory};
pub use model::{
    IngestStats, NeighborhoodLayer, NeighborhoodPolygon, PolygonId, ReferenceSpeciesSet,
    TreeInventory,
};
pub use neighborhoods::{parse_neighborhoods, read_neighborhoods};
pub use species::{parse_species_list, read_species_list};
