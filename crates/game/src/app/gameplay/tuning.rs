use engine::{Vec2, DEFAULT_GRAVITY};
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_JUMP_IMPULSE: f32 = 700.0;
pub(crate) const DEFAULT_ACTOR_HALF_EXTENTS: Vec2 = Vec2 { x: 24.0, y: 32.0 };
pub(crate) const DEFAULT_SHALLOW_SPEED_MULTIPLIER: f32 = 0.5;
pub(crate) const DEFAULT_RESPAWN_DELAY_SECONDS: f32 = 1.0;

/// Gameplay numbers shared by every level. Per-level move speed comes from
/// the level file instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Tuning {
    pub(crate) gravity: f32,
    pub(crate) jump_impulse: f32,
    pub(crate) actor_half_extents: Vec2,
    pub(crate) shallow_speed_multiplier: f32,
    pub(crate) respawn_delay_seconds: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            jump_impulse: DEFAULT_JUMP_IMPULSE,
            actor_half_extents: DEFAULT_ACTOR_HALF_EXTENTS,
            shallow_speed_multiplier: DEFAULT_SHALLOW_SPEED_MULTIPLIER,
            respawn_delay_seconds: DEFAULT_RESPAWN_DELAY_SECONDS,
        }
    }
}

impl Tuning {
    /// Returns the dotted path and reason of the first bad value.
    pub(crate) fn validate(&self) -> Result<(), (&'static str, &'static str)> {
        let finite_positive = |value: f32| value.is_finite() && value > 0.0;
        if !finite_positive(self.gravity) {
            return Err(("tuning.gravity", "must be finite and > 0"));
        }
        if !finite_positive(self.jump_impulse) {
            return Err(("tuning.jump_impulse", "must be finite and > 0"));
        }
        if !finite_positive(self.actor_half_extents.x) {
            return Err(("tuning.actor_half_extents.x", "must be finite and > 0"));
        }
        if !finite_positive(self.actor_half_extents.y) {
            return Err(("tuning.actor_half_extents.y", "must be finite and > 0"));
        }
        if !(self.shallow_speed_multiplier.is_finite()
            && (0.0..=1.0).contains(&self.shallow_speed_multiplier))
        {
            return Err(("tuning.shallow_speed_multiplier", "must be within 0..=1"));
        }
        if !(self.respawn_delay_seconds.is_finite() && self.respawn_delay_seconds >= 0.0) {
            return Err(("tuning.respawn_delay_seconds", "must be finite and >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Tuning::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_multiplier() {
        let tuning = Tuning {
            shallow_speed_multiplier: 1.5,
            ..Tuning::default()
        };
        assert_eq!(
            tuning.validate().map_err(|(path, _)| path),
            Err("tuning.shallow_speed_multiplier")
        );
    }
}
