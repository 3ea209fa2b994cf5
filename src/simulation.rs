use std::path::Path;

use bevy::prelude::*;
use rand::Rng;
use serde::Serialize;

use crate::animation::AnimationLibrary;
use crate::audio::{AudioManager, SoundSink};
use crate::components::{FrameBudget, GameRng};
use crate::config::{GameConfig, VariantRules};
use crate::entities::{BoundaryPolicy, EntityKind, PhysicsEntity};
use crate::game_runtime::{FlowPhase, LevelFlow};
use crate::input::{MovementInput, VirtualInput};
use crate::particles::{death_burst, remove_indices, Effects, ExpiredCounts};
use crate::physics_core::PhysicsCounters;
use crate::render::{Canvas, DrawList, SpriteDraw};
use crate::screen_effects::{ScreenShake, ScreenState};
use crate::spawn::EnemySpawner;
use crate::tilemap::{LevelSource, TileKind, Tilemap};

const HEART_SLOTS: [[f32; 2]; 3] = [[13.0, 19.0], [30.0, 19.0], [47.0, 19.0]];
const HEART_SIZE: f32 = 15.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    LevelLoaded { level: usize },
    EnemySpawned { kind: EntityKind, x: f32, y: f32 },
    EnemyDestroyed { kind: EntityKind, x: f32, y: f32 },
    EnemyLeftArena { kind: EntityKind },
    PlayerHit { lives_remaining: u32 },
    BoundaryHit { violations: u32 },
    Jumped,
}

/// Summary of one simulated frame.
#[derive(Clone, Debug, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub level: usize,
    pub phase: FlowPhase,
    pub lives_remaining: u32,
    pub transition: i32,
    pub shake: f32,
    pub enemies: usize,
    pub particles: usize,
    pub sparks: usize,
    /// Effects that expired and were dropped this frame.
    pub expired: ExpiredCounts,
    pub collision_checks: u64,
    pub events: Vec<SimEvent>,
}

/// Everything one play session owns. Rebuilt piecewise on level load.
#[derive(Resource)]
pub struct Session {
    pub rules: VariantRules,
    pub levels: LevelSource,
    pub level: usize,
    pub tilemap: Tilemap,
    pub player: PhysicsEntity,
    pub enemies: Vec<PhysicsEntity>,
    pub effects: Effects,
    pub shake: ScreenShake,
    pub flow: LevelFlow,
    pub spawner: EnemySpawner,
    pub frame: u64,
    /// Enemy spawning waits for the first movement input of each load.
    pub input_seen: bool,
    pub counters: PhysicsCounters,
    pending_events: Vec<SimEvent>,
}

impl Session {
    pub fn new(rules: VariantRules, levels: LevelSource, library: &AnimationLibrary) -> Self {
        let centre = Vec2::from(rules.display_size) / 2.0;
        let mut session = Self {
            player: PhysicsEntity::new(EntityKind::Player, centre, rules.player.clone(), library),
            tilemap: Tilemap::builtin(rules.builtin_level),
            flow: LevelFlow::new(rules.flow.clone()),
            spawner: EnemySpawner::new(rules.spawner.clone()),
            rules,
            levels,
            level: 0,
            enemies: Vec::new(),
            effects: Effects::default(),
            shake: ScreenShake::default(),
            frame: 0,
            input_seen: false,
            counters: PhysicsCounters::default(),
            pending_events: Vec::new(),
        };
        session.load_level(0, library);
        session
    }

    /// Replaces the level and everything living in it. Spawner markers
    /// become the player (variant 0), enemies (1, 2) and a boss (3).
    pub fn load_level(&mut self, index: usize, library: &AnimationLibrary) {
        self.tilemap = match self.levels.load(index) {
            Ok(tilemap) => tilemap,
            Err(e) => {
                warn!("[Hellgate level] {e}; using built-in level");
                Tilemap::builtin(self.levels.fallback())
            }
        };
        self.level = index;
        self.enemies.clear();
        self.effects.clear();
        self.flow.reset();
        self.spawner.reset();
        self.input_seen = false;

        let ids = [
            (TileKind::Spawners, 0),
            (TileKind::Spawners, 1),
            (TileKind::Spawners, 2),
            (TileKind::Spawners, 3),
        ];
        let mut player_pos = Vec2::from(self.rules.display_size) / 2.0;
        for marker in self.tilemap.extract(&ids, false) {
            let pos = Vec2::from(marker.pos);
            match marker.variant {
                0 => player_pos = pos,
                3 => self.enemies.push(PhysicsEntity::new(
                    EntityKind::Boss,
                    pos,
                    self.rules.boss.clone(),
                    library,
                )),
                _ => self.enemies.push(PhysicsEntity::new(
                    EntityKind::Enemy,
                    pos,
                    self.rules.enemy.clone(),
                    library,
                )),
            }
        }
        self.player = PhysicsEntity::new(EntityKind::Player, player_pos, self.rules.player.clone(), library);

        info!(
            "[Hellgate level] Loaded level {}/{} with {} enemies",
            index + 1,
            self.levels.count(),
            self.enemies.len()
        );
        self.pending_events.push(SimEvent::LevelLoaded { level: index });
    }

    pub fn reload(&mut self, library: &AnimationLibrary) {
        self.load_level(self.level, library);
    }

    fn register_hit(&mut self) {
        if self.flow.register_hit() {
            info!("[Hellgate] Player died on level {}", self.level + 1);
        }
    }

    /// Runs one frame: death flow, spawning, enemies, player, effects, HUD,
    /// in that order, drawing as it goes.
    pub fn step(
        &mut self,
        input: MovementInput,
        library: &AnimationLibrary,
        rng: &mut impl Rng,
        canvas: &mut impl Canvas,
        sound: &mut impl SoundSink,
    ) -> FrameReport {
        self.frame += 1;
        self.shake.tick();

        if input.restart {
            info!("[Hellgate level] Restarting level {}", self.level + 1);
            self.reload(library);
        } else if self.flow.tick() == FlowPhase::Reloading {
            self.reload(library);
        }
        let mut events = std::mem::take(&mut self.pending_events);

        let offset = Vec2::from(self.rules.camera_offset);
        let rotation = self.rules.rotation;
        self.tilemap.render(canvas, offset);

        if input.any_movement() {
            self.input_seen = true;
        }
        if self.flow.is_alive() && self.input_seen {
            if let Some(request) = self.spawner.tick(rng) {
                let mut enemy =
                    PhysicsEntity::new(EntityKind::Enemy, request.pos, self.rules.enemy.clone(), library);
                enemy.velocity = request.velocity;
                self.enemies.push(enemy);
                events.push(SimEvent::EnemySpawned {
                    kind: EntityKind::Enemy,
                    x: request.pos.x,
                    y: request.pos.y,
                });
            }
        }

        let player_rect = self.player.rect();
        let mut doomed = Vec::new();
        let mut hits = 0;
        for (index, enemy) in self.enemies.iter_mut().enumerate() {
            enemy.update(&self.tilemap, Vec2::ZERO, library, &mut self.counters);
            enemy.render(canvas, rotation, offset);

            let left_arena = enemy.enforce_bounds().remove;
            if enemy.dies_on_contact() && enemy.rect().intersects(&player_rect) {
                let centre = enemy.rect().center();
                self.shake.trigger(self.rules.burst.shake);
                sound.play("hit");
                death_burst(centre, &self.rules.burst, rng, library, &mut self.effects);
                doomed.push(index);
                // Only a living player loses lives, and never more than it has.
                if self.flow.is_alive() && hits < self.flow.lives_remaining() {
                    hits += 1;
                }
                events.push(SimEvent::EnemyDestroyed {
                    kind: enemy.kind,
                    x: centre.x,
                    y: centre.y,
                });
            } else if left_arena {
                doomed.push(index);
                events.push(SimEvent::EnemyLeftArena { kind: enemy.kind });
            }
        }
        remove_indices(&mut self.enemies, doomed);
        for _ in 0..hits {
            self.register_hit();
            events.push(SimEvent::PlayerHit {
                lives_remaining: self.flow.lives_remaining(),
            });
        }

        if self.flow.is_alive() {
            let mut movement = Vec2::new(input.horizontal, input.vertical);
            if let Some(jump_velocity) = self.rules.jump_velocity {
                movement.y = 0.0;
                if input.jump && self.player.collisions.down {
                    self.player.velocity.y = -jump_velocity;
                    sound.play("jump");
                    events.push(SimEvent::Jumped);
                }
            }
            self.player.update(&self.tilemap, movement, library, &mut self.counters);

            let check = self.player.enforce_bounds();
            if check.violations > 0 && self.player.params.boundary == BoundaryPolicy::Lethal {
                events.push(SimEvent::BoundaryHit {
                    violations: check.violations,
                });
                for _ in 0..check.violations {
                    self.register_hit();
                }
            }
        }
        self.player.render(canvas, rotation, offset);

        let expired = self.effects.update_and_render(canvas, offset);

        let lives = self.flow.lives_remaining() as usize;
        for (slot, pos) in HEART_SLOTS.iter().enumerate().take(lives) {
            canvas.sprite(SpriteDraw::plain(
                "ui/heart",
                slot,
                Vec2::from(*pos),
                Vec2::splat(HEART_SIZE),
            ));
        }

        FrameReport {
            frame: self.frame,
            level: self.level,
            phase: self.flow.phase,
            lives_remaining: self.flow.lives_remaining(),
            transition: self.flow.transition,
            shake: self.shake.intensity,
            enemies: self.enemies.len(),
            particles: self.effects.particles.len(),
            sparks: self.effects.sparks.len(),
            expired,
            collision_checks: self.counters.collision_checks,
            events,
        }
    }
}

#[derive(Resource, Default)]
pub struct LastFrameReport(pub Option<FrameReport>);

/// Builds the session at startup and advances it once per fixed step.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<GameRng>() {
            app.insert_resource(GameRng::new(None));
        }
        app.init_resource::<DrawList>()
            .init_resource::<ScreenState>()
            .init_resource::<LastFrameReport>()
            .init_resource::<FrameBudget>()
            .add_systems(Startup, start_session)
            .add_systems(FixedUpdate, step_session.run_if(resource_exists::<Session>));
    }
}

fn start_session(mut commands: Commands, config: Res<GameConfig>, library: Res<AnimationLibrary>) {
    let rules = config.resolved_rules();
    let levels = LevelSource::discover(config.maps_dir.as_deref().map(Path::new), rules.builtin_level);
    info!(
        "[Hellgate] Starting {} ({} level(s))",
        config.title(),
        levels.count()
    );
    commands.insert_resource(Session::new(rules, levels, &library));
}

#[allow(clippy::too_many_arguments)]
fn step_session(
    mut session: ResMut<Session>,
    mut vinput: ResMut<VirtualInput>,
    library: Res<AnimationLibrary>,
    mut rng: ResMut<GameRng>,
    mut draw_list: ResMut<DrawList>,
    mut audio: ResMut<AudioManager>,
    mut screen: ResMut<ScreenState>,
    mut last_report: ResMut<LastFrameReport>,
    budget: Res<FrameBudget>,
    mut exit: EventWriter<AppExit>,
) {
    let input = vinput.take_movement();
    draw_list.clear();
    audio.frame = session.frame + 1;

    let report = session.step(input, &library, &mut rng.0, &mut *draw_list, &mut *audio);

    screen.shake_offset = session.shake.offset(&mut rng.0);
    screen.transition = report.transition;
    screen.transition_span = session.flow.config.transition_span;
    for event in &report.events {
        debug!("[Hellgate] frame {}: {:?}", report.frame, event);
    }
    if budget.exhausted(report.frame) {
        info!("[Hellgate] Frame budget reached after {} frames", report.frame);
        exit.send(AppExit::Success);
    }
    last_report.0 = Some(report);
}
