use std::f32::consts::{FRAC_PI_2, PI, TAU};

use bevy::math::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::animation::{Animation, AnimationLibrary};
use crate::render::{Canvas, SpriteDraw};

const PARTICLE_MAX_AGE: u32 = 90;
const SPARK_MAX_AGE: u32 = 120;
const SPARK_DRAG: f32 = 0.1;
const PARTICLE_SIZE: f32 = 4.0;

fn default_burst_count() -> usize {
    30
}

fn default_burst_shake() -> f32 {
    16.0
}

/// Death burst tuning: `count` random particle/spark pairs plus two
/// horizontal sparks, and the screenshake it requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BurstConfig {
    #[serde(default = "default_burst_count")]
    pub count: usize,
    #[serde(default = "default_burst_shake")]
    pub shake: f32,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            count: default_burst_count(),
            shake: default_burst_shake(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub kind: String,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub animation: Animation,
    pub age: u32,
    pub max_age: u32,
}

impl Particle {
    pub fn new(
        library: &AnimationLibrary,
        kind: &str,
        pos: Vec2,
        velocity: Vec2,
        start_frame: u32,
    ) -> Self {
        let mut animation = library.instantiate(&format!("particle/{kind}"));
        animation.frame = start_frame.min(animation.total_ticks().saturating_sub(1));
        Self {
            kind: kind.to_string(),
            pos,
            velocity,
            animation,
            age: 0,
            max_age: PARTICLE_MAX_AGE,
        }
    }

    /// Advances one tick. Returns true once the particle has expired.
    pub fn update(&mut self) -> bool {
        self.age += 1;
        self.animation.update();
        let expired = self.animation.done || self.age > self.max_age;
        self.pos += self.velocity;
        expired
    }

    pub fn render(&self, canvas: &mut impl Canvas, offset: Vec2) {
        let size = Vec2::splat(PARTICLE_SIZE);
        let mut draw = SpriteDraw::plain(
            format!("particle/{}", self.kind),
            0,
            self.pos - offset - size / 2.0,
            size,
        );
        draw.frame = self.animation.image_index();
        canvas.sprite(draw);
    }
}

/// A streak flying along `angle`, slowing down until it vanishes.
#[derive(Clone, Debug)]
pub struct Spark {
    pub pos: Vec2,
    pub angle: f32,
    pub speed: f32,
    pub initial_speed: f32,
    pub age: u32,
    pub max_age: u32,
}

impl Spark {
    pub fn new(pos: Vec2, angle: f32, speed: f32) -> Self {
        Self {
            pos,
            angle,
            speed,
            initial_speed: speed.max(f32::EPSILON),
            age: 0,
            max_age: SPARK_MAX_AGE,
        }
    }

    pub fn update(&mut self) -> bool {
        self.age += 1;
        self.pos += Vec2::from_angle(self.angle) * self.speed;
        self.speed = (self.speed - SPARK_DRAG).max(0.0);
        self.speed == 0.0 || self.age >= self.max_age
    }

    /// Diamond outline: long along the heading, thin across it. Both
    /// dimensions and the alpha shrink with the speed.
    pub fn render(&self, canvas: &mut impl Canvas, offset: Vec2) {
        let point = |angle: f32, reach: f32| self.pos + Vec2::from_angle(angle) * reach - offset;
        let points = [
            point(self.angle, self.speed * 3.0),
            point(self.angle + FRAC_PI_2, self.speed * 0.5),
            point(self.angle + PI, self.speed * 3.0),
            point(self.angle - FRAC_PI_2, self.speed * 0.5),
        ];
        let alpha = (self.speed / self.initial_speed).clamp(0.0, 1.0);
        canvas.polygon(points, [1.0, 1.0, 1.0, alpha]);
    }
}

/// Per-level particle and spark lists.
#[derive(Default, Debug)]
pub struct Effects {
    pub particles: Vec<Particle>,
    pub sparks: Vec<Spark>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExpiredCounts {
    pub particles: usize,
    pub sparks: usize,
}

impl Effects {
    pub fn clear(&mut self) {
        self.particles.clear();
        self.sparks.clear();
    }

    /// Updates and draws every effect, then drops the ones that expired this
    /// tick. An expired effect still gets its final frame drawn.
    pub fn update_and_render(&mut self, canvas: &mut impl Canvas, offset: Vec2) -> ExpiredCounts {
        let mut expired_particles = Vec::new();
        for (index, particle) in self.particles.iter_mut().enumerate() {
            if particle.update() {
                expired_particles.push(index);
            }
            particle.render(canvas, offset);
        }

        let mut expired_sparks = Vec::new();
        for (index, spark) in self.sparks.iter_mut().enumerate() {
            if spark.update() {
                expired_sparks.push(index);
            }
            spark.render(canvas, offset);
        }

        let counts = ExpiredCounts {
            particles: expired_particles.len(),
            sparks: expired_sparks.len(),
        };
        remove_indices(&mut self.particles, expired_particles);
        remove_indices(&mut self.sparks, expired_sparks);
        counts
    }
}

/// Removes every listed index once. Duplicates are ignored.
pub fn remove_indices<T>(items: &mut Vec<T>, mut indices: Vec<usize>) {
    indices.sort_unstable();
    indices.dedup();
    for index in indices.into_iter().rev() {
        if index < items.len() {
            items.remove(index);
        }
    }
}

/// Queues the death effect at `center`.
pub fn death_burst(
    center: Vec2,
    burst: &BurstConfig,
    rng: &mut impl Rng,
    library: &AnimationLibrary,
    effects: &mut Effects,
) {
    for _ in 0..burst.count {
        let angle = rng.gen::<f32>() * TAU;
        let speed = rng.gen::<f32>() * 5.0;
        effects
            .sparks
            .push(Spark::new(center, angle, 2.0 + rng.gen::<f32>()));
        let velocity = Vec2::from_angle(angle + PI) * speed * 0.5;
        effects.particles.push(Particle::new(
            library,
            "particle",
            center,
            velocity,
            rng.gen_range(0..=7),
        ));
    }
    effects.sparks.push(Spark::new(center, 0.0, 5.0 + rng.gen::<f32>()));
    effects.sparks.push(Spark::new(center, PI, 5.0 + rng.gen::<f32>()));
}
