use bevy::math::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::physics_core::Aabb;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnerConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Spawn positions are sampled uniformly inside this rectangle.
    pub region: Aabb,
    /// Ticks before the first spawn.
    pub initial_interval: u32,
    /// The interval never shrinks below this.
    pub min_interval: u32,
    /// Removed from the interval after every spawn.
    #[serde(default)]
    pub shrink: u32,
    #[serde(default)]
    pub velocity_min: [f32; 2],
    #[serde(default)]
    pub velocity_max: [f32; 2],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    pub pos: Vec2,
    pub velocity: Vec2,
}

/// Counts ticks up to the current interval, then spawns and restarts with a
/// shorter interval. The spawning tick counts as the first tick of the next
/// wait, so consecutive spawns are exactly `interval` ticks apart.
#[derive(Clone, Debug)]
pub struct EnemySpawner {
    pub config: SpawnerConfig,
    pub elapsed: u32,
    pub interval: u32,
    pub spawned: u64,
}

impl EnemySpawner {
    pub fn new(config: SpawnerConfig) -> Self {
        let interval = config.initial_interval.max(config.min_interval);
        Self {
            config,
            elapsed: 0,
            interval,
            spawned: 0,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
        self.interval = self.config.initial_interval.max(self.config.min_interval);
    }

    /// Call once per tick while spawning is allowed.
    pub fn tick(&mut self, rng: &mut impl Rng) -> Option<SpawnRequest> {
        if !self.config.enabled {
            return None;
        }
        if self.elapsed < self.interval {
            self.elapsed += 1;
            return None;
        }

        self.elapsed = 1;
        self.interval = self
            .interval
            .saturating_sub(self.config.shrink)
            .max(self.config.min_interval);
        self.spawned += 1;

        let region = &self.config.region;
        let pos = Vec2::new(
            region.min_x + rng.gen::<f32>() * region.width(),
            region.min_y + rng.gen::<f32>() * region.height(),
        );
        let min = Vec2::from(self.config.velocity_min);
        let max = Vec2::from(self.config.velocity_max);
        let velocity = min + Vec2::new(rng.gen::<f32>(), rng.gen::<f32>()) * (max - min);
        Some(SpawnRequest { pos, velocity })
    }
}
