mod actor;
mod gate;
mod hazard;
mod level;
mod movement;
mod quest;
mod tuning;

use engine::{LevelDatabase, SceneRegistry};

pub(crate) use quest::DeliveryPolicy;
pub(crate) use tuning::Tuning;

use level::LevelScene;

/// One scene per compiled level. Each load builds a fresh level state.
pub(crate) fn build_scene_registry(
    levels: &LevelDatabase,
    tuning: Tuning,
    policy: DeliveryPolicy,
) -> SceneRegistry {
    let mut registry = SceneRegistry::new();
    for def in levels.levels() {
        registry.register(
            def.id.clone(),
            Box::new(LevelScene::new(def.clone(), tuning, policy)),
        );
    }
    registry
}
