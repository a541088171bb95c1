use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app::{Aabb, LevelId, Vec2};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub id: LevelId,
    pub label: String,
    pub move_speed: f32,
    pub bounds: Aabb,
    pub spawn: Vec2,
    pub platforms: Vec<Aabb>,
    pub collectibles: Vec<PlacementDef>,
    pub delivery_points: Vec<DeliveryPointDef>,
    pub hazard: Option<HazardDef>,
    pub gate: Option<GateDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementDef {
    pub name: String,
    pub area: Aabb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPointDef {
    pub name: String,
    pub area: Aabb,
    pub required_items: u32,
}

/// Water band. The top edge of `area` is the surface; the actor is in the
/// shallows for the first `shallow_depth` units below it and drowned past that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardDef {
    pub area: Aabb,
    pub shallow_depth: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDef {
    pub area: Aabb,
    pub next_level: LevelId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateLevel,
    UnknownGateTarget,
}

#[derive(Debug, Clone)]
pub struct ContentError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentError {}
