mod input;
mod loop_runner;
mod physics;
mod scene;

pub use input::{
    InputAction, InputAggregator, InputSource, MoveIntents, TouchButton, TouchLayout, TouchTracker,
};
pub use loop_runner::{run_app, run_headless, AppError, HeadlessSummary, LoopConfig};
pub use physics::{Aabb, KinematicBody, PlatformWorld, DEFAULT_GRAVITY, DEFAULT_MAX_FALL_SPEED};
pub use scene::{
    InputSnapshot, LevelId, Scene, SceneCommand, SceneError, SceneMachine, SceneRegistry,
    SceneWorld, Vec2,
};
