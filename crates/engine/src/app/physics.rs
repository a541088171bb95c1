use serde::{Deserialize, Serialize};

use super::scene::Vec2;

pub const DEFAULT_GRAVITY: f32 = 1200.0;
pub const DEFAULT_MAX_FALL_SPEED: f32 = 900.0;

/// Axis-aligned box in world units, y growing downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_top_left_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2 { x, y },
            max: Vec2 {
                x: x + width,
                y: y + height,
            },
        }
    }

    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: Vec2 {
                x: center.x - half_extents.x,
                y: center.y - half_extents.y,
            },
            max: Vec2 {
                x: center.x + half_extents.x,
                y: center.y + half_extents.y,
            },
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: (self.min.x + self.max.x) * 0.5,
            y: (self.min.y + self.max.y) * 0.5,
        }
    }

    /// Strict overlap: boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn spans_x(&self, x: f32) -> bool {
        x >= self.min.x && x <= self.max.x
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub half_extents: Vec2,
    pub on_ground: bool,
}

impl KinematicBody {
    pub fn new(position: Vec2, half_extents: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::default(),
            half_extents,
            on_ground: false,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(self.position, self.half_extents)
    }
}

/// Static level geometry plus gravity. Bodies are moved one axis at a time and
/// pushed out of any solid they end up overlapping.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformWorld {
    bounds: Option<Aabb>,
    solids: Vec<Aabb>,
    gravity: f32,
    max_fall_speed: f32,
}

impl Default for PlatformWorld {
    fn default() -> Self {
        Self {
            bounds: None,
            solids: Vec::new(),
            gravity: DEFAULT_GRAVITY,
            max_fall_speed: DEFAULT_MAX_FALL_SPEED,
        }
    }
}

impl PlatformWorld {
    pub fn new(bounds: Option<Aabb>, solids: Vec<Aabb>) -> Self {
        Self {
            bounds,
            solids,
            ..Self::default()
        }
    }

    pub fn with_gravity(mut self, gravity: f32, max_fall_speed: f32) -> Self {
        self.gravity = gravity;
        self.max_fall_speed = max_fall_speed.max(0.0);
        self
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn solids(&self) -> &[Aabb] {
        &self.solids
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    pub fn step(&self, body: &mut KinematicBody, fixed_dt_seconds: f32) {
        body.on_ground = false;
        body.velocity.y = (body.velocity.y + self.gravity * fixed_dt_seconds).min(self.max_fall_speed);

        body.position.x += body.velocity.x * fixed_dt_seconds;
        if body.velocity.x > 0.0 {
            if let Some(edge) = self.overlapping_edge(body, |solid| solid.min.x, f32::min) {
                body.position.x = edge - body.half_extents.x;
                body.velocity.x = 0.0;
            }
        } else if body.velocity.x < 0.0 {
            if let Some(edge) = self.overlapping_edge(body, |solid| solid.max.x, f32::max) {
                body.position.x = edge + body.half_extents.x;
                body.velocity.x = 0.0;
            }
        }

        body.position.y += body.velocity.y * fixed_dt_seconds;
        if body.velocity.y > 0.0 {
            if let Some(edge) = self.overlapping_edge(body, |solid| solid.min.y, f32::min) {
                body.position.y = edge - body.half_extents.y;
                body.velocity.y = 0.0;
                body.on_ground = true;
            }
        } else if body.velocity.y < 0.0 {
            if let Some(edge) = self.overlapping_edge(body, |solid| solid.max.y, f32::max) {
                body.position.y = edge + body.half_extents.y;
                body.velocity.y = 0.0;
            }
        }

        if let Some(bounds) = self.bounds {
            self.clamp_to_bounds(body, bounds);
        }
    }

    /// Furthest-back edge among every solid the body overlaps, so stacked or
    /// overlapping platforms resolve in one pass.
    fn overlapping_edge(
        &self,
        body: &KinematicBody,
        edge: impl Fn(&Aabb) -> f32,
        pick: fn(f32, f32) -> f32,
    ) -> Option<f32> {
        let bounds = body.bounds();
        self.solids
            .iter()
            .filter(|solid| bounds.intersects(solid))
            .map(edge)
            .reduce(pick)
    }

    fn clamp_to_bounds(&self, body: &mut KinematicBody, bounds: Aabb) {
        let half = body.half_extents;
        if body.position.x - half.x < bounds.min.x {
            body.position.x = bounds.min.x + half.x;
            body.velocity.x = body.velocity.x.max(0.0);
        } else if body.position.x + half.x > bounds.max.x {
            body.position.x = bounds.max.x - half.x;
            body.velocity.x = body.velocity.x.min(0.0);
        }

        if body.position.y - half.y < bounds.min.y {
            body.position.y = bounds.min.y + half.y;
            body.velocity.y = body.velocity.y.max(0.0);
        } else if body.position.y + half.y > bounds.max.y {
            body.position.y = bounds.max.y - half.y;
            body.velocity.y = body.velocity.y.min(0.0);
            body.on_ground = true;
        }
    }
}
