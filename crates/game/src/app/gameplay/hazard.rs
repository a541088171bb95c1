use engine::{Aabb, HazardDef};

use super::actor::Actor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum DrownResult {
    #[default]
    None,
    Shallow,
    Drowned,
}

/// Water band. The top edge is the surface and the drown line sits
/// `shallow_depth` below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HazardRegion {
    area: Aabb,
    shallow_depth: f32,
}

impl HazardRegion {
    pub(crate) fn new(area: Aabb, shallow_depth: f32) -> Self {
        Self {
            area,
            shallow_depth,
        }
    }

    pub(crate) fn from_def(def: &HazardDef) -> Self {
        Self::new(def.area, def.shallow_depth)
    }

    pub(crate) fn surface_y(&self) -> f32 {
        self.area.min.y
    }

    pub(crate) fn drown_line_y(&self) -> f32 {
        self.area.min.y + self.shallow_depth
    }
}

pub(crate) fn check_drown(actor: &Actor, region: &HazardRegion) -> DrownResult {
    let position = actor.position();
    if !region.area.spans_x(position.x) || position.y < region.surface_y() {
        DrownResult::None
    } else if position.y < region.drown_line_y() {
        DrownResult::Shallow
    } else {
        DrownResult::Drowned
    }
}
