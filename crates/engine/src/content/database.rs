use std::collections::HashMap;

use crate::app::LevelId;

use super::types::LevelDef;

/// Compiled level definitions in load order, indexed by id.
#[derive(Debug, Default, Clone)]
pub struct LevelDatabase {
    levels: Vec<LevelDef>,
    index_by_id: HashMap<LevelId, usize>,
}

impl LevelDatabase {
    pub(crate) fn from_levels(levels: Vec<LevelDef>) -> Self {
        let index_by_id = levels
            .iter()
            .enumerate()
            .map(|(idx, level)| (level.id.clone(), idx))
            .collect();
        Self {
            levels,
            index_by_id,
        }
    }

    pub fn level(&self, id: &LevelId) -> Option<&LevelDef> {
        self.index_by_id
            .get(id)
            .and_then(|idx| self.levels.get(*idx))
    }

    pub fn levels(&self) -> &[LevelDef] {
        &self.levels
    }

    pub fn ids(&self) -> impl Iterator<Item = &LevelId> {
        self.levels.iter().map(|level| &level.id)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.levels)
    }
}
