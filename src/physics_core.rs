use bevy::math::Vec2;

use crate::tilemap::Tilemap;

/// Axis-aligned rectangle in display space (y grows downward).
///
/// Edges are stored directly so that clamping one edge to a tile edge is
/// exact; the opposite edge is moved by the rectangle's size.
#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    pub fn from_corner(corner: Vec2, size: Vec2) -> Self {
        Self::new(corner.x, corner.y, size.x, size.y)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.min_x, self.min_y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Strict overlap: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Half-open containment, `[min, max)` on both axes.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min_x && point.x < self.max_x && point.y >= self.min_y && point.y < self.max_y
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            min_x: self.min_x + delta.x,
            min_y: self.min_y + delta.y,
            max_x: self.max_x + delta.x,
            max_y: self.max_y + delta.y,
        }
    }

    pub fn set_left(&mut self, x: f32) {
        let width = self.width();
        self.min_x = x;
        self.max_x = x + width;
    }

    pub fn set_right(&mut self, x: f32) {
        let width = self.width();
        self.max_x = x;
        self.min_x = x - width;
    }

    pub fn set_top(&mut self, y: f32) {
        let height = self.height();
        self.min_y = y;
        self.max_y = y + height;
    }

    pub fn set_bottom(&mut self, y: f32) {
        let height = self.height();
        self.max_y = y;
        self.min_y = y - height;
    }
}

/// Which sides touched a solid tile during the last update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl CollisionFlags {
    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    pub fn vertical(&self) -> bool {
        self.up || self.down
    }
}

#[derive(Default, Clone, Copy, Debug)]
pub struct PhysicsCounters {
    pub collision_checks: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct MotionResult {
    pub rect: Aabb,
    pub collisions: CollisionFlags,
}

/// Moves `body` by `frame_movement`, horizontal axis first, clamping against
/// every solid tile it ends up overlapping. The vertical sub-step starts from
/// the horizontally resolved rectangle, so a diagonal move can never slip
/// through the corner between two tiles.
pub fn resolve_axis_separated(
    tilemap: &Tilemap,
    body: Aabb,
    frame_movement: Vec2,
    counters: &mut PhysicsCounters,
) -> MotionResult {
    let mut collisions = CollisionFlags::default();

    let mut rect = body.translated(Vec2::new(frame_movement.x, 0.0));
    for tile in tilemap.solid_rects_around(&rect) {
        counters.collision_checks = counters.collision_checks.saturating_add(1);
        if !rect.intersects(&tile) {
            continue;
        }
        if frame_movement.x > 0.0 {
            rect.set_right(tile.min_x);
            collisions.right = true;
        }
        if frame_movement.x < 0.0 {
            rect.set_left(tile.max_x);
            collisions.left = true;
        }
    }

    rect = rect.translated(Vec2::new(0.0, frame_movement.y));
    for tile in tilemap.solid_rects_around(&rect) {
        counters.collision_checks = counters.collision_checks.saturating_add(1);
        if !rect.intersects(&tile) {
            continue;
        }
        if frame_movement.y > 0.0 {
            rect.set_bottom(tile.min_y);
            collisions.down = true;
        }
        if frame_movement.y < 0.0 {
            rect.set_top(tile.max_y);
            collisions.up = true;
        }
    }

    MotionResult { rect, collisions }
}
