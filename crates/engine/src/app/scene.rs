use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::input::{ActionStates, InputAction, InputAggregator, MoveIntents};
use super::physics::PlatformWorld;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(String);

impl LevelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(LevelId),
    Restart,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    restart_pressed: bool,
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_aggregator(aggregator: &InputAggregator) -> Self {
        Self {
            actions: aggregator.actions(),
            ..Self::default()
        }
    }

    pub(crate) fn new(quit_requested: bool, restart_pressed: bool, actions: ActionStates) -> Self {
        Self {
            quit_requested,
            restart_pressed,
            actions,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn restart_pressed(&self) -> bool {
        self.restart_pressed
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn intents(&self) -> MoveIntents {
        MoveIntents::from_actions(self.actions)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_restart_pressed(mut self, restart_pressed: bool) -> Self {
        self.restart_pressed = restart_pressed;
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Engine-owned state of the active level: its collision world and the tick
/// counter. Cleared whenever the level is torn down.
#[derive(Debug, Default)]
pub struct SceneWorld {
    physics: PlatformWorld,
    tick_index: u64,
}

impl SceneWorld {
    pub fn set_physics(&mut self, physics: PlatformWorld) {
        self.physics = physics;
    }

    pub fn physics(&self) -> &PlatformWorld {
        &self.physics
    }

    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    pub fn clear(&mut self) {
        self.physics = PlatformWorld::default();
        self.tick_index = 0;
    }

    fn advance_tick(&mut self) {
        self.tick_index = self.tick_index.saturating_add(1);
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn render(&mut self, world: &SceneWorld);
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("no scene registered for level '{0}'")]
    UnknownLevel(LevelId),
}

#[derive(Default)]
pub struct SceneRegistry {
    scenes: BTreeMap<LevelId, Box<dyn Scene>>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the scene previously registered under the same id, if any.
    pub fn register(&mut self, id: LevelId, scene: Box<dyn Scene>) -> Option<Box<dyn Scene>> {
        self.scenes.insert(id, scene)
    }

    pub fn contains(&self, id: &LevelId) -> bool {
        self.scenes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn level_ids(&self) -> impl Iterator<Item = &LevelId> {
        self.scenes.keys()
    }
}

/// Hosts exactly one live level at a time. Leaving a level always unloads it
/// and clears the world, so the next visit starts from a fresh instance.
pub struct SceneMachine {
    scenes: BTreeMap<LevelId, Box<dyn Scene>>,
    world: SceneWorld,
    active_level: LevelId,
    is_loaded: bool,
}

impl SceneMachine {
    pub fn new(registry: SceneRegistry, start_level: LevelId) -> Result<Self, SceneError> {
        if !registry.contains(&start_level) {
            return Err(SceneError::UnknownLevel(start_level));
        }
        Ok(Self {
            scenes: registry.scenes,
            world: SceneWorld::default(),
            active_level: start_level,
            is_loaded: false,
        })
    }

    pub fn active_level(&self) -> &LevelId {
        &self.active_level
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub fn load_active(&mut self) {
        if self.is_loaded {
            return;
        }
        if let Some(scene) = self.scenes.get_mut(&self.active_level) {
            scene.load(&mut self.world);
            self.is_loaded = true;
            info!(level = %self.active_level, "level_loaded");
        }
    }

    pub fn update_active(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        self.load_active();
        let Some(scene) = self.scenes.get_mut(&self.active_level) else {
            return SceneCommand::None;
        };
        let command = scene.update(fixed_dt_seconds, input, &mut self.world);
        self.world.advance_tick();
        command
    }

    pub fn render_active(&mut self) {
        if let Some(scene) = self.scenes.get_mut(&self.active_level) {
            scene.render(&self.world);
        }
    }

    pub fn debug_title_active(&self) -> Option<String> {
        self.scenes
            .get(&self.active_level)
            .and_then(|scene| scene.debug_title(&self.world))
    }

    /// Returns whether a level was torn down and loaded again.
    pub fn apply_command(&mut self, command: SceneCommand) -> Result<bool, SceneError> {
        match command {
            SceneCommand::None => Ok(false),
            SceneCommand::SwitchTo(next_level) => {
                self.switch_to(next_level)?;
                Ok(true)
            }
            SceneCommand::Restart => {
                self.restart_active();
                Ok(true)
            }
        }
    }

    pub fn switch_to(&mut self, next_level: LevelId) -> Result<(), SceneError> {
        if !self.scenes.contains_key(&next_level) {
            return Err(SceneError::UnknownLevel(next_level));
        }
        self.unload_active();
        info!(from = %self.active_level, to = %next_level, "level_switched");
        self.active_level = next_level;
        self.load_active();
        Ok(())
    }

    pub fn restart_active(&mut self) {
        self.unload_active();
        info!(level = %self.active_level, "level_restarted");
        self.load_active();
    }

    pub fn shutdown(&mut self) {
        self.unload_active();
    }

    fn unload_active(&mut self) {
        if !self.is_loaded {
            return;
        }
        if let Some(scene) = self.scenes.get_mut(&self.active_level) {
            scene.unload(&mut self.world);
        }
        self.world.clear();
        self.is_loaded = false;
        info!(level = %self.active_level, "level_unloaded");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::app::physics::Aabb;

    #[derive(Debug, Default)]
    struct Calls {
        log: Vec<String>,
    }

    struct TestScene {
        name: &'static str,
        calls: Rc<RefCell<Calls>>,
        ticks_since_load: u32,
        command_after: Option<(u32, SceneCommand)>,
    }

    impl TestScene {
        fn boxed(name: &'static str, calls: &Rc<RefCell<Calls>>) -> Box<dyn Scene> {
            Box::new(Self {
                name,
                calls: Rc::clone(calls),
                ticks_since_load: 0,
                command_after: None,
            })
        }

        fn boxed_with_command(
            name: &'static str,
            calls: &Rc<RefCell<Calls>>,
            after_ticks: u32,
            command: SceneCommand,
        ) -> Box<dyn Scene> {
            Box::new(Self {
                name,
                calls: Rc::clone(calls),
                ticks_since_load: 0,
                command_after: Some((after_ticks, command)),
            })
        }

        fn record(&self, event: &str) {
            self.calls
                .borrow_mut()
                .log
                .push(format!("{}:{}", self.name, event));
        }
    }

    impl Scene for TestScene {
        fn load(&mut self, world: &mut SceneWorld) {
            self.ticks_since_load = 0;
            world.set_physics(PlatformWorld::new(
                None,
                vec![Aabb::from_top_left_size(0.0, 0.0, 1.0, 1.0)],
            ));
            self.record("load");
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            _input: &InputSnapshot,
            _world: &mut SceneWorld,
        ) -> SceneCommand {
            self.ticks_since_load += 1;
            match &self.command_after {
                Some((after, command)) if *after == self.ticks_since_load => command.clone(),
                _ => SceneCommand::None,
            }
        }

        fn render(&mut self, _world: &SceneWorld) {}

        fn unload(&mut self, _world: &mut SceneWorld) {
            self.record("unload");
        }
    }

    fn registry(scenes: Vec<(&str, Box<dyn Scene>)>) -> SceneRegistry {
        let mut registry = SceneRegistry::new();
        for (id, scene) in scenes {
            registry.register(LevelId::new(id), scene);
        }
        registry
    }

    #[test]
    fn unknown_start_level_is_rejected() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let result = SceneMachine::new(
            registry(vec![("a", TestScene::boxed("a", &calls))]),
            LevelId::new("missing"),
        );
        assert!(matches!(result, Err(SceneError::UnknownLevel(id)) if id.as_str() == "missing"));
    }

    #[test]
    fn first_update_loads_active_level_once() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut machine = SceneMachine::new(
            registry(vec![("a", TestScene::boxed("a", &calls))]),
            LevelId::new("a"),
        )
        .expect("machine");
        machine.update_active(0.1, &InputSnapshot::empty());
        machine.update_active(0.1, &InputSnapshot::empty());
        assert_eq!(calls.borrow().log, vec!["a:load".to_string()]);
        assert_eq!(machine.world().tick_index(), 2);
    }

    #[test]
    fn switch_unloads_old_level_and_clears_world() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut machine = SceneMachine::new(
            registry(vec![
                ("a", TestScene::boxed_with_command("a", &calls, 2, SceneCommand::SwitchTo(LevelId::new("b")))),
                ("b", TestScene::boxed("b", &calls)),
            ]),
            LevelId::new("a"),
        )
        .expect("machine");

        let first = machine.update_active(0.1, &InputSnapshot::empty());
        assert_eq!(machine.apply_command(first), Ok(false));
        let second = machine.update_active(0.1, &InputSnapshot::empty());
        assert_eq!(machine.apply_command(second), Ok(true));

        assert_eq!(machine.active_level().as_str(), "b");
        assert_eq!(machine.world().tick_index(), 0);
        assert_eq!(
            calls.borrow().log,
            vec!["a:load".to_string(), "a:unload".to_string(), "b:load".to_string()]
        );
    }

    #[test]
    fn switch_to_unknown_level_keeps_current_level_loaded() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut machine = SceneMachine::new(
            registry(vec![("a", TestScene::boxed("a", &calls))]),
            LevelId::new("a"),
        )
        .expect("machine");
        machine.load_active();
        let result = machine.apply_command(SceneCommand::SwitchTo(LevelId::new("nowhere")));
        assert_eq!(
            result,
            Err(SceneError::UnknownLevel(LevelId::new("nowhere")))
        );
        assert!(machine.is_loaded());
        assert_eq!(machine.active_level().as_str(), "a");
        assert_eq!(calls.borrow().log, vec!["a:load".to_string()]);
    }

    #[test]
    fn restart_reloads_same_level_from_scratch() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut machine = SceneMachine::new(
            registry(vec![("a", TestScene::boxed("a", &calls))]),
            LevelId::new("a"),
        )
        .expect("machine");
        machine.update_active(0.1, &InputSnapshot::empty());
        assert_eq!(machine.apply_command(SceneCommand::Restart), Ok(true));
        assert_eq!(machine.world().tick_index(), 0);
        assert_eq!(machine.world().physics().solids().len(), 1);
        assert_eq!(
            calls.borrow().log,
            vec!["a:load".to_string(), "a:unload".to_string(), "a:load".to_string()]
        );
    }

    #[test]
    fn shutdown_unloads_only_when_loaded() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut machine = SceneMachine::new(
            registry(vec![("a", TestScene::boxed("a", &calls))]),
            LevelId::new("a"),
        )
        .expect("machine");
        machine.shutdown();
        assert!(calls.borrow().log.is_empty());
        machine.load_active();
        machine.shutdown();
        machine.shutdown();
        assert_eq!(
            calls.borrow().log,
            vec!["a:load".to_string(), "a:unload".to_string()]
        );
    }

    #[test]
    fn snapshot_intents_follow_action_state() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_action_down(InputAction::Jump, true);
        let intents = snapshot.intents();
        assert!(intents.move_left);
        assert!(!intents.move_right);
        assert!(intents.jump);
        assert!(!snapshot.restart_pressed());
    }

    #[test]
    fn level_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&LevelId::new("delivery")).expect("json");
        assert_eq!(json, "\"delivery\"");
    }
}
