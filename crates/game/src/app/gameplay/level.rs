use engine::{
    Aabb, InputSnapshot, LevelDef, LevelId, MoveIntents, PlatformWorld, Scene, SceneCommand,
    SceneWorld, Vec2, DEFAULT_MAX_FALL_SPEED,
};
use tracing::{debug, info, trace};

use super::actor::{Actor, ActorLife, Facing};
use super::gate::{GateController, GateState, LevelTransition};
use super::hazard::{check_drown, DrownResult, HazardRegion};
use super::movement::{MovementController, MovementInput};
use super::quest::{Collectible, DeliveryPoint, DeliveryPolicy, Inventory, QuestTracker};
use super::tuning::Tuning;

/// Holds the level the gate asked for until the scene hands it to the machine.
#[derive(Debug, Default)]
pub(crate) struct PendingTransition {
    next_level: Option<LevelId>,
}

impl PendingTransition {
    pub(crate) fn take(&mut self) -> Option<LevelId> {
        self.next_level.take()
    }
}

impl LevelTransition for PendingTransition {
    fn switch_level(&mut self, next_level: &LevelId) {
        self.next_level = Some(next_level.clone());
    }
}

/// Everything one play-through of a level owns. Built fresh on every load,
/// so nothing leaks between visits.
#[derive(Debug, Clone)]
pub(crate) struct LevelState {
    pub(crate) actor: Actor,
    pub(crate) collectibles: Vec<Collectible>,
    pub(crate) delivery_points: Vec<DeliveryPoint>,
    pub(crate) inventory: Inventory,
    pub(crate) hazard: Option<HazardRegion>,
    pub(crate) gate: Option<GateController>,
    pub(crate) last_hazard: DrownResult,
    spawn: Vec2,
    move_speed: f32,
    movement: MovementController,
    quest: QuestTracker,
    shallow_speed_multiplier: f32,
    respawn_delay_seconds: f32,
}

impl LevelState {
    pub(crate) fn new(def: &LevelDef, tuning: &Tuning, policy: DeliveryPolicy) -> Self {
        Self {
            actor: Actor::new(def.spawn, tuning.actor_half_extents),
            collectibles: def.collectibles.iter().map(Collectible::from_def).collect(),
            delivery_points: def
                .delivery_points
                .iter()
                .map(DeliveryPoint::from_def)
                .collect(),
            inventory: Inventory::default(),
            hazard: def.hazard.as_ref().map(HazardRegion::from_def),
            gate: def.gate.as_ref().map(GateController::from_def),
            last_hazard: DrownResult::None,
            spawn: def.spawn,
            move_speed: def.move_speed,
            movement: MovementController::new(tuning.jump_impulse),
            quest: QuestTracker::new(policy),
            shallow_speed_multiplier: tuning.shallow_speed_multiplier,
            respawn_delay_seconds: tuning.respawn_delay_seconds,
        }
    }

    pub(crate) fn is_quest_complete(&self) -> bool {
        QuestTracker::is_complete(&self.collectibles, &self.delivery_points)
    }

    /// One simulation step: movement, physics, hazard, quest, gate.
    pub(crate) fn tick(
        &mut self,
        fixed_dt_seconds: f32,
        intents: MoveIntents,
        physics: &PlatformWorld,
        transition: &mut dyn LevelTransition,
    ) {
        if let ActorLife::Drowned { respawn_in_seconds } = &mut self.actor.life {
            *respawn_in_seconds -= fixed_dt_seconds;
            if *respawn_in_seconds <= 0.0 {
                self.actor.respawn_at(self.spawn);
                self.last_hazard = DrownResult::None;
                info!(x = self.spawn.x, y = self.spawn.y, "actor_respawned");
            }
            return;
        }

        let speed = if self.last_hazard == DrownResult::Shallow {
            self.move_speed * self.shallow_speed_multiplier
        } else {
            self.move_speed
        };
        self.movement
            .apply(MovementInput::from_intents(intents, speed), &mut self.actor);
        physics.step(&mut self.actor.body, fixed_dt_seconds);

        if let Some(hazard) = &self.hazard {
            self.last_hazard = check_drown(&self.actor, hazard);
            if self.last_hazard == DrownResult::Drowned {
                let position = self.actor.position();
                info!(x = position.x, y = position.y, "actor_drowned");
                self.actor.drown(self.respawn_delay_seconds);
                return;
            }
        }

        let actor_box = self.actor.bounds();
        let report = self.quest.update(
            &actor_box,
            &mut self.collectibles,
            &mut self.delivery_points,
            &mut self.inventory,
        );

        let quest_complete = self.is_quest_complete();
        if !report.is_empty() {
            debug!(
                collected = ?report.collected,
                delivered = ?report.delivered,
                quest_complete,
                "quest_progress"
            );
        }
        if let Some(gate) = self.gate.as_mut() {
            gate.update(quest_complete, &actor_box, transition);
        }
    }
}

/// Read-only picture of a level for whoever draws it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LevelView {
    pub(crate) level: LevelId,
    pub(crate) actor_bounds: Aabb,
    pub(crate) facing: Facing,
    pub(crate) alive: bool,
    pub(crate) hazard: DrownResult,
    pub(crate) gate: Option<(Aabb, GateState)>,
    pub(crate) collected: Vec<bool>,
    pub(crate) delivered: Vec<bool>,
    pub(crate) held_items: u32,
}

impl LevelView {
    fn capture(level: &LevelId, state: &LevelState) -> Self {
        Self {
            level: level.clone(),
            actor_bounds: state.actor.bounds(),
            facing: state.actor.facing,
            alive: state.actor.is_alive(),
            hazard: state.last_hazard,
            gate: state.gate.as_ref().map(|gate| (gate.area(), gate.state())),
            collected: state
                .collectibles
                .iter()
                .map(Collectible::is_collected)
                .collect(),
            delivered: state
                .delivery_points
                .iter()
                .map(DeliveryPoint::is_delivered)
                .collect(),
            held_items: state.inventory.held(),
        }
    }

    fn title(&self, label: &str) -> String {
        let collected = self.collected.iter().filter(|done| **done).count();
        let delivered = self.delivered.iter().filter(|done| **done).count();
        let gate = match self.gate.map(|(_, state)| state) {
            Some(GateState::Active) => "open",
            Some(GateState::Inert) => "closed",
            None => "none",
        };
        let mut title = format!(
            "{} | items {}/{} | delivered {}/{} | held {} | gate {}",
            label,
            collected,
            self.collected.len(),
            delivered,
            self.delivered.len(),
            self.held_items,
            gate
        );
        if !self.alive {
            title.push_str(" | drowned");
        }
        title
    }
}

pub(crate) struct LevelScene {
    def: LevelDef,
    tuning: Tuning,
    policy: DeliveryPolicy,
    state: Option<LevelState>,
    pending: PendingTransition,
}

impl LevelScene {
    pub(crate) fn new(def: LevelDef, tuning: Tuning, policy: DeliveryPolicy) -> Self {
        Self {
            def,
            tuning,
            policy,
            state: None,
            pending: PendingTransition::default(),
        }
    }

    /// Snapshot for drawing; `None` while the level is unloaded.
    pub(crate) fn view(&self) -> Option<LevelView> {
        self.state
            .as_ref()
            .map(|state| LevelView::capture(&self.def.id, state))
    }
}

impl Scene for LevelScene {
    fn load(&mut self, world: &mut SceneWorld) {
        world.set_physics(
            PlatformWorld::new(Some(self.def.bounds), self.def.platforms.clone())
                .with_gravity(self.tuning.gravity, DEFAULT_MAX_FALL_SPEED),
        );
        let state = LevelState::new(&self.def, &self.tuning, self.policy);
        info!(
            level = %self.def.id,
            label = %self.def.label,
            collectibles = state.collectibles.len(),
            delivery_points = state.delivery_points.len(),
            next_level = ?state.gate.as_ref().map(|gate| gate.next_level().as_str()),
            policy = ?self.policy,
            "level_state_created"
        );
        self.state = Some(state);
        self.pending = PendingTransition::default();
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.restart_pressed() {
            return SceneCommand::Restart;
        }
        let Some(state) = self.state.as_mut() else {
            return SceneCommand::None;
        };

        state.tick(
            fixed_dt_seconds,
            input.intents(),
            world.physics(),
            &mut self.pending,
        );

        match self.pending.take() {
            Some(next_level) => SceneCommand::SwitchTo(next_level),
            None => SceneCommand::None,
        }
    }

    fn render(&mut self, world: &SceneWorld) {
        let Some(view) = self.view() else {
            return;
        };
        trace!(
            tick = world.tick_index(),
            level = %view.level,
            x = view.actor_bounds.center().x,
            y = view.actor_bounds.center().y,
            facing = ?view.facing,
            alive = view.alive,
            hazard = ?view.hazard,
            held = view.held_items,
            "level_view"
        );
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        self.state = None;
        self.pending = PendingTransition::default();
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        self.view().map(|view| view.title(&self.def.label))
    }
}
