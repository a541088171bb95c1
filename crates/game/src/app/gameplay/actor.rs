use engine::{Aabb, KinematicBody, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Facing {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ActorLife {
    Alive,
    /// Frozen in the water until the timer runs out.
    Drowned { respawn_in_seconds: f32 },
}

/// The player-controlled goose. Position is the centre of the collision box.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Actor {
    pub(crate) body: KinematicBody,
    pub(crate) facing: Facing,
    pub(crate) life: ActorLife,
}

impl Actor {
    pub(crate) fn new(spawn: Vec2, half_extents: Vec2) -> Self {
        Self {
            body: KinematicBody::new(spawn, half_extents),
            facing: Facing::default(),
            life: ActorLife::Alive,
        }
    }

    pub(crate) fn bounds(&self) -> Aabb {
        self.body.bounds()
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.body.position
    }

    pub(crate) fn is_alive(&self) -> bool {
        matches!(self.life, ActorLife::Alive)
    }

    pub(crate) fn drown(&mut self, respawn_delay_seconds: f32) {
        self.body.velocity = Vec2::default();
        self.life = ActorLife::Drowned {
            respawn_in_seconds: respawn_delay_seconds,
        };
    }

    pub(crate) fn respawn_at(&mut self, spawn: Vec2) {
        self.body = KinematicBody::new(spawn, self.body.half_extents);
        self.life = ActorLife::Alive;
    }
}
