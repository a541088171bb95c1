mod compiler;
mod database;
mod pipeline;
mod types;

pub use compiler::{compile_level_files, parse_levels_document};
pub use database::LevelDatabase;
pub use pipeline::{load_level_database, ContentPipelineError};
pub use types::{
    ContentError, ContentErrorCode, DeliveryPointDef, GateDef, HazardDef, LevelDef, PlacementDef,
    SourceLocation,
};
