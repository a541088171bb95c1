use engine::MoveIntents;

use super::actor::{Actor, Facing};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MovementInput {
    pub(crate) move_left: bool,
    pub(crate) move_right: bool,
    pub(crate) jump: bool,
    pub(crate) speed: f32,
}

impl MovementInput {
    pub(crate) fn from_intents(intents: MoveIntents, speed: f32) -> Self {
        Self {
            move_left: intents.move_left,
            move_right: intents.move_right,
            jump: intents.jump,
            speed,
        }
    }

    /// Left and right held together cancel out.
    pub(crate) fn horizontal_velocity(&self) -> f32 {
        match (self.move_left, self.move_right) {
            (true, false) => -self.speed,
            (false, true) => self.speed,
            _ => 0.0,
        }
    }
}

/// Writes the desired velocity into the actor's body. Gravity and collision
/// are left to the physics step that follows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MovementController {
    jump_impulse: f32,
}

impl MovementController {
    pub(crate) fn new(jump_impulse: f32) -> Self {
        Self { jump_impulse }
    }

    /// Returns true when a jump started this tick.
    pub(crate) fn apply(&self, input: MovementInput, actor: &mut Actor) -> bool {
        let horizontal = input.horizontal_velocity();
        actor.body.velocity.x = horizontal;
        if horizontal < 0.0 {
            actor.facing = Facing::Left;
        } else if horizontal > 0.0 {
            actor.facing = Facing::Right;
        }

        if input.jump && actor.body.on_ground {
            actor.body.velocity.y = -self.jump_impulse;
            actor.body.on_ground = false;
            return true;
        }
        false
    }
}
