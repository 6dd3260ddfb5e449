pub mod caretaker;
pub mod completeness;
pub mod config;
pub mod crs;
pub mod error;
pub mod native;
pub mod normalize;
pub mod pipeline;
pub mod spatial;
pub mod writer;

pub use config::CleanerConfig;
pub use error::{PipelineError, Result};
