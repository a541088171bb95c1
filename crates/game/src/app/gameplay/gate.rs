use engine::{Aabb, GateDef, LevelId};
use tracing::info;

/// Visible variant of the gate. The active one has the same box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateState {
    Inert,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GatePhase {
    Locked,
    UnlockedWaiting,
    Transitioning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateEvent {
    None,
    Unlocked,
    TransitionRequested,
}

/// Switches the active level. Called at most once per level instance.
pub(crate) trait LevelTransition {
    fn switch_level(&mut self, next_level: &LevelId);
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GateController {
    area: Aabb,
    next_level: LevelId,
    phase: GatePhase,
}

impl GateController {
    pub(crate) fn new(area: Aabb, next_level: LevelId) -> Self {
        Self {
            area,
            next_level,
            phase: GatePhase::Locked,
        }
    }

    pub(crate) fn from_def(def: &GateDef) -> Self {
        Self::new(def.area, def.next_level.clone())
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> GatePhase {
        self.phase
    }

    pub(crate) fn state(&self) -> GateState {
        match self.phase {
            GatePhase::Locked => GateState::Inert,
            GatePhase::UnlockedWaiting | GatePhase::Transitioning => GateState::Active,
        }
    }

    pub(crate) fn area(&self) -> Aabb {
        self.area
    }

    pub(crate) fn next_level(&self) -> &LevelId {
        &self.next_level
    }

    /// Unlocking and walking through never happen on the same tick: overlap is
    /// only tested once the gate has been active for a full tick.
    pub(crate) fn update(
        &mut self,
        quest_complete: bool,
        actor_box: &Aabb,
        transition: &mut dyn LevelTransition,
    ) -> GateEvent {
        match self.phase {
            GatePhase::Locked => {
                if !quest_complete {
                    return GateEvent::None;
                }
                self.phase = GatePhase::UnlockedWaiting;
                info!(next_level = %self.next_level, "gate_unlocked");
                GateEvent::Unlocked
            }
            GatePhase::UnlockedWaiting => {
                if !actor_box.intersects(&self.area) {
                    return GateEvent::None;
                }
                self.phase = GatePhase::Transitioning;
                info!(next_level = %self.next_level, "level_transition_requested");
                transition.switch_level(&self.next_level);
                GateEvent::TransitionRequested
            }
            GatePhase::Transitioning => GateEvent::None,
        }
    }
}
