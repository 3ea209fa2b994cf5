use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::animation::{Animation, AnimationLibrary};
use crate::physics_core::{resolve_axis_separated, Aabb, CollisionFlags, PhysicsCounters};
use crate::render::{rotated_size, Canvas, SpriteDraw, SpriteStack};
use crate::tilemap::Tilemap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Enemy,
    /// Same behaviour as `Enemy`; kept apart so it can diverge.
    Boss,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Enemy => "enemy",
            EntityKind::Boss => "boss",
        }
    }
}

/// What happens when an entity's position leaves its `bounds`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    #[default]
    Ignore,
    /// Clamp back inside; every violated edge counts as a hit.
    Lethal,
    Clamp,
    /// Clamp, then drop the entity from the active list.
    ClampAndRemove,
}

fn default_speed() -> f32 {
    1.0
}

fn default_max_fall() -> f32 {
    5.0
}

fn default_spread() -> f32 {
    1.0
}

/// Per-kind tuning. Offsets are relative to the entity position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityParams {
    pub size: [f32; 2],
    #[serde(default)]
    pub hitbox_offset: [f32; 2],
    #[serde(default)]
    pub anim_offset: [f32; 2],
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub gravity: f32,
    #[serde(default = "default_max_fall")]
    pub max_fall: f32,
    #[serde(default)]
    pub boundary: BoundaryPolicy,
    #[serde(default)]
    pub bounds: Option<Aabb>,
    pub stack: SpriteStack,
    #[serde(default = "default_spread")]
    pub spread: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundaryCheck {
    /// Edges exceeded this frame, zero to four.
    pub violations: u32,
    pub remove: bool,
}

#[derive(Clone, Debug)]
pub struct PhysicsEntity {
    pub kind: EntityKind,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub collisions: CollisionFlags,
    pub action: String,
    pub animation: Animation,
    /// Facing left.
    pub flip: bool,
    pub last_movement: Vec2,
    pub params: EntityParams,
}

impl PhysicsEntity {
    pub fn new(kind: EntityKind, pos: Vec2, params: EntityParams, library: &AnimationLibrary) -> Self {
        let mut entity = Self {
            kind,
            pos,
            velocity: Vec2::ZERO,
            collisions: CollisionFlags::default(),
            action: String::new(),
            animation: library.instantiate(""),
            flip: false,
            last_movement: Vec2::ZERO,
            params,
        };
        entity.set_action("idle", library);
        entity
    }

    pub fn hitbox_offset(&self) -> Vec2 {
        Vec2::from(self.params.hitbox_offset)
    }

    /// Hitbox in display space.
    pub fn rect(&self) -> Aabb {
        Aabb::from_corner(self.pos + self.hitbox_offset(), Vec2::from(self.params.size))
    }

    /// Swaps to a fresh copy of the action's clip. Re-requesting the current
    /// action keeps the running clip.
    pub fn set_action(&mut self, action: &str, library: &AnimationLibrary) {
        if self.action == action {
            return;
        }
        self.action = action.to_string();
        self.animation = library.instantiate(&format!("{}/{}", self.kind.as_str(), action));
    }

    /// One simulation step. `movement` is the raw input vector and is scaled
    /// by the kind's speed before the velocity is added.
    pub fn update(
        &mut self,
        tilemap: &Tilemap,
        movement: Vec2,
        library: &AnimationLibrary,
        counters: &mut PhysicsCounters,
    ) {
        self.collisions = CollisionFlags::default();

        // Gravity before the move keeps a resting body pressed into the floor.
        if self.params.gravity != 0.0 {
            self.velocity.y = (self.velocity.y + self.params.gravity).min(self.params.max_fall);
        }

        let frame_movement = movement * self.params.speed + self.velocity;
        let motion = resolve_axis_separated(tilemap, self.rect(), frame_movement, counters);
        self.pos = motion.rect.min() - self.hitbox_offset();
        self.collisions = motion.collisions;

        if self.collisions.vertical() {
            self.velocity.y = 0.0;
        }

        if movement.x > 0.0 {
            self.flip = false;
        }
        if movement.x < 0.0 {
            self.flip = true;
        }
        self.last_movement = movement;

        self.animation.update();

        let action = match self.kind {
            EntityKind::Player if self.params.gravity > 0.0 && !self.collisions.down => "jump",
            EntityKind::Player if movement != Vec2::ZERO => "run",
            EntityKind::Player | EntityKind::Enemy | EntityKind::Boss => "idle",
        };
        self.set_action(action, library);
    }

    /// Checks each edge of `bounds` on its own against the position and
    /// clamps the offending coordinate back. Touching an edge is fine.
    pub fn enforce_bounds(&mut self) -> BoundaryCheck {
        let Some(bounds) = self.params.bounds else {
            return BoundaryCheck::default();
        };
        if self.params.boundary == BoundaryPolicy::Ignore {
            return BoundaryCheck::default();
        }

        let mut violations = 0;
        if self.pos.y > bounds.max_y {
            violations += 1;
            self.pos.y = bounds.max_y;
        }
        if self.pos.x < bounds.min_x {
            violations += 1;
            self.pos.x = bounds.min_x;
        }
        if self.pos.y < bounds.min_y {
            violations += 1;
            self.pos.y = bounds.min_y;
        }
        if self.pos.x > bounds.max_x {
            violations += 1;
            self.pos.x = bounds.max_x;
        }

        BoundaryCheck {
            violations,
            remove: self.params.boundary == BoundaryPolicy::ClampAndRemove && violations > 0,
        }
    }

    /// Enemies and bosses die on contact with the player.
    pub fn dies_on_contact(&self) -> bool {
        match self.kind {
            EntityKind::Player => false,
            EntityKind::Enemy | EntityKind::Boss => true,
        }
    }

    /// Draws the sprite stack bottom layer first, each layer lifted by
    /// `spread` pixels.
    pub fn render(&self, canvas: &mut impl Canvas, rotation: f32, offset: Vec2) {
        let stack = &self.params.stack;
        let size = rotated_size(stack.size(), rotation);
        let anim = (Vec2::from(self.params.anim_offset) / 2.0).floor();
        let sprite = format!("{}/{}", stack.name, self.action);
        for layer in 0..stack.layers {
            let lift = Vec2::new(0.0, layer as f32 * self.params.spread);
            canvas.sprite(SpriteDraw {
                sprite: sprite.clone(),
                layer,
                frame: self.animation.image_index(),
                top_left: self.pos - size - offset + anim - lift,
                size,
                rotation,
                flip_x: self.flip,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::default_animation_library;
    use crate::config::{GameVariant, VariantRules};
    use crate::render::DrawList;
    use crate::tilemap::TileKind;
    use bevy::math::IVec2;

    fn plain_params() -> EntityParams {
        EntityParams {
            size: [10.0, 10.0],
            hitbox_offset: [0.0, 0.0],
            anim_offset: [0.0, 0.0],
            speed: 1.0,
            gravity: 0.0,
            max_fall: 5.0,
            boundary: BoundaryPolicy::Ignore,
            bounds: None,
            stack: SpriteStack {
                name: "enemy".to_string(),
                layers: 3,
                layer_size: [10.0, 10.0],
            },
            spread: 2.0,
        }
    }

    fn floor_map() -> Tilemap {
        let mut tilemap = Tilemap::new(16.0);
        for x in -2..8 {
            tilemap.insert(IVec2::new(x, 4), TileKind::Grass, 0);
        }
        tilemap.insert(IVec2::new(5, 3), TileKind::Stone, 0);
        tilemap
    }

    #[test]
    fn stored_position_follows_clamped_hitbox() {
        let library = default_animation_library();
        let mut params = plain_params();
        params.hitbox_offset = [-4.0, -6.0];
        let mut entity = PhysicsEntity::new(EntityKind::Enemy, Vec2::new(70.0, 56.0), params, &library);
        let mut counters = PhysicsCounters::default();

        entity.update(&floor_map(), Vec2::new(8.0, 0.0), &library, &mut counters);

        assert!(entity.collisions.right);
        assert_eq!(entity.rect().max_x, 80.0);
        assert_eq!(entity.pos.x, 74.0);
    }

    #[test]
    fn collision_flags_do_not_carry_over() {
        let library = default_animation_library();
        let mut entity =
            PhysicsEntity::new(EntityKind::Enemy, Vec2::new(20.0, 50.0), plain_params(), &library);
        let mut counters = PhysicsCounters::default();
        let tilemap = floor_map();

        entity.update(&tilemap, Vec2::new(0.0, 6.0), &library, &mut counters);
        assert!(entity.collisions.down);
        assert_eq!(entity.rect().max_y, 64.0);

        entity.update(&tilemap, Vec2::new(0.0, -1.0), &library, &mut counters);
        assert!(!entity.collisions.any());
    }

    #[test]
    fn gravity_accumulates_until_landing() {
        let library = default_animation_library();
        let mut params = plain_params();
        params.gravity = 0.5;
        params.max_fall = 2.0;
        let mut entity = PhysicsEntity::new(EntityKind::Player, Vec2::new(20.0, 10.0), params, &library);
        let mut counters = PhysicsCounters::default();
        let tilemap = floor_map();

        for _ in 0..6 {
            entity.update(&tilemap, Vec2::ZERO, &library, &mut counters);
        }
        assert_eq!(entity.velocity.y, 2.0);
        assert_eq!(entity.action, "jump");

        for _ in 0..40 {
            entity.update(&tilemap, Vec2::ZERO, &library, &mut counters);
        }
        assert!(entity.collisions.down);
        assert_eq!(entity.velocity.y, 0.0);
        assert_eq!(entity.rect().max_y, 64.0);
        assert_eq!(entity.action, "idle");
    }

    #[test]
    fn facing_only_changes_with_horizontal_input() {
        let library = default_animation_library();
        let mut entity =
            PhysicsEntity::new(EntityKind::Player, Vec2::new(20.0, 20.0), plain_params(), &library);
        let mut counters = PhysicsCounters::default();
        let tilemap = Tilemap::new(16.0);

        entity.update(&tilemap, Vec2::new(-1.0, 0.0), &library, &mut counters);
        assert!(entity.flip);
        assert_eq!(entity.action, "run");
        entity.update(&tilemap, Vec2::new(0.0, 1.0), &library, &mut counters);
        assert!(entity.flip);
        entity.update(&tilemap, Vec2::new(1.0, 0.0), &library, &mut counters);
        assert!(!entity.flip);
        assert_eq!(entity.last_movement, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn same_action_keeps_animation_running() {
        let library = default_animation_library();
        let mut entity =
            PhysicsEntity::new(EntityKind::Enemy, Vec2::ZERO, plain_params(), &library);
        let mut counters = PhysicsCounters::default();
        let tilemap = Tilemap::new(16.0);
        for _ in 0..7 {
            entity.update(&tilemap, Vec2::ZERO, &library, &mut counters);
        }
        assert_eq!(entity.animation.frame, 7);
        assert_eq!(entity.animation.image_index(), 1);

        entity.set_action("idle", &library);
        assert_eq!(entity.animation.frame, 7);
        entity.set_action("hurt", &library);
        assert_eq!(entity.animation.frame, 0);
    }

    #[test]
    fn lethal_bounds_clamp_and_count_each_edge() {
        let library = default_animation_library();
        let rules = VariantRules::preset(GameVariant::Platformer);
        let mut player =
            PhysicsEntity::new(EntityKind::Player, Vec2::new(49.0, 100.0), rules.player, &library);

        let check = player.enforce_bounds();
        assert_eq!(check.violations, 1);
        assert!(!check.remove);
        assert_eq!(player.pos.x, 50.0);

        let check = player.enforce_bounds();
        assert_eq!(check.violations, 0);

        player.pos = Vec2::new(700.0, 40.0);
        let check = player.enforce_bounds();
        assert_eq!(check.violations, 2);
        assert_eq!(player.pos, Vec2::new(670.0, 60.0));
    }

    #[test]
    fn clamp_and_remove_flags_once_per_frame() {
        let library = default_animation_library();
        let rules = VariantRules::preset(GameVariant::Cleanup);
        let mut enemy =
            PhysicsEntity::new(EntityKind::Enemy, Vec2::new(400.0, 300.0), rules.enemy, &library);
        let check = enemy.enforce_bounds();
        assert_eq!(check.violations, 2);
        assert!(check.remove);
        assert_eq!(enemy.pos, Vec2::new(336.0, 256.0));
    }

    #[test]
    fn only_hostile_kinds_die_on_contact() {
        let library = default_animation_library();
        let boss = PhysicsEntity::new(EntityKind::Boss, Vec2::ZERO, plain_params(), &library);
        let player = PhysicsEntity::new(EntityKind::Player, Vec2::ZERO, plain_params(), &library);
        assert!(boss.dies_on_contact());
        assert!(!player.dies_on_contact());
    }

    #[test]
    fn render_lifts_each_layer_by_spread() {
        let library = default_animation_library();
        let mut params = plain_params();
        params.anim_offset = [-3.0, -3.0];
        let mut entity = PhysicsEntity::new(EntityKind::Enemy, Vec2::new(50.0, 40.0), params, &library);
        entity.flip = true;
        let mut canvas = DrawList::default();

        entity.render(&mut canvas, 0.0, Vec2::new(8.0, 7.0));

        let layers: Vec<_> = canvas.sprites_named("enemy/idle").collect();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].top_left, Vec2::new(30.0, 21.0));
        assert_eq!(layers[2].top_left, Vec2::new(30.0, 17.0));
        assert!(layers.iter().all(|l| l.flip_x));
    }
}
