use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::audio::VolumeConfig;
use crate::entities::{BoundaryPolicy, EntityParams};
use crate::game_runtime::FlowConfig;
use crate::particles::BurstConfig;
use crate::physics_core::Aabb;
use crate::render::SpriteStack;
use crate::spawn::SpawnerConfig;
use crate::tilemap::BuiltinLevel;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    /// "10 Levels of Hell": side view, gravity, lethal play-area edges.
    #[default]
    Platformer,
    /// "CleanUp!": top-down dodging, enemies rain from the top edge.
    Cleanup,
}

impl GameVariant {
    pub fn title(self) -> &'static str {
        match self {
            GameVariant::Platformer => "10 Levels of Hell",
            GameVariant::Cleanup => "CleanUp!",
        }
    }
}

/// Every gameplay constant of one variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VariantRules {
    pub display_size: [f32; 2],
    #[serde(default)]
    pub camera_offset: [f32; 2],
    pub player: EntityParams,
    pub enemy: EntityParams,
    pub boss: EntityParams,
    /// Set for side-view variants: vertical input becomes a jump.
    #[serde(default)]
    pub jump_velocity: Option<f32>,
    pub spawner: SpawnerConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub burst: BurstConfig,
    pub builtin_level: BuiltinLevel,
    /// Sprite-stack rotation in degrees.
    #[serde(default)]
    pub rotation: f32,
}

impl VariantRules {
    pub fn preset(variant: GameVariant) -> Self {
        match variant {
            GameVariant::Platformer => Self::platformer(),
            GameVariant::Cleanup => Self::cleanup(),
        }
    }

    fn platformer() -> Self {
        let enemy = EntityParams {
            size: [21.0, 31.0],
            hitbox_offset: [-30.0, -40.0],
            anim_offset: [-3.0, -3.0],
            speed: 1.0,
            gravity: 0.0,
            max_fall: 5.0,
            boundary: BoundaryPolicy::Ignore,
            bounds: None,
            stack: SpriteStack {
                name: "enemy".to_string(),
                layers: 8,
                layer_size: [21.0, 31.0],
            },
            spread: 1.0,
        };
        let mut boss = enemy.clone();
        boss.stack.name = "boss".to_string();

        Self {
            display_size: [320.0, 240.0],
            camera_offset: [8.0, 7.0],
            player: EntityParams {
                size: [15.0, 15.0],
                hitbox_offset: [-33.0, -50.0],
                anim_offset: [-3.0, -3.0],
                speed: 2.2,
                gravity: 0.1,
                max_fall: 5.0,
                boundary: BoundaryPolicy::Lethal,
                bounds: Some(Aabb {
                    min_x: 50.0,
                    min_y: 60.0,
                    max_x: 670.0,
                    max_y: 500.0,
                }),
                stack: SpriteStack {
                    name: "player".to_string(),
                    layers: 8,
                    layer_size: [16.0, 16.0],
                },
                spread: 1.0,
            },
            enemy,
            boss,
            jump_velocity: Some(3.0),
            spawner: SpawnerConfig {
                enabled: true,
                region: Aabb {
                    min_x: 100.0,
                    min_y: 80.0,
                    max_x: 300.0,
                    max_y: 130.0,
                },
                initial_interval: 240,
                min_interval: 90,
                shrink: 15,
                velocity_min: [0.0, 0.0],
                velocity_max: [0.0, 0.0],
            },
            flow: FlowConfig::default(),
            burst: BurstConfig::default(),
            builtin_level: BuiltinLevel::Hellscape,
            rotation: 0.0,
        }
    }

    fn cleanup() -> Self {
        let enemy = EntityParams {
            size: [10.0, 10.0],
            hitbox_offset: [-5.0, -5.0],
            anim_offset: [10.0, 10.0],
            speed: 1.0,
            gravity: 0.0,
            max_fall: 5.0,
            boundary: BoundaryPolicy::ClampAndRemove,
            bounds: Some(Aabb {
                min_x: -16.0,
                min_y: -48.0,
                max_x: 336.0,
                max_y: 256.0,
            }),
            stack: SpriteStack {
                name: "enemy".to_string(),
                layers: 4,
                layer_size: [10.0, 10.0],
            },
            spread: 1.0,
        };
        let boss = EntityParams {
            size: [18.0, 18.0],
            hitbox_offset: [-9.0, -9.0],
            anim_offset: [18.0, 18.0],
            stack: SpriteStack {
                name: "boss".to_string(),
                layers: 6,
                layer_size: [18.0, 18.0],
            },
            ..enemy.clone()
        };

        Self {
            display_size: [320.0, 240.0],
            camera_offset: [0.0, 0.0],
            player: EntityParams {
                size: [12.0, 12.0],
                hitbox_offset: [-6.0, -6.0],
                anim_offset: [12.0, 12.0],
                speed: 2.0,
                gravity: 0.0,
                max_fall: 5.0,
                boundary: BoundaryPolicy::Clamp,
                bounds: Some(Aabb {
                    min_x: 16.0,
                    min_y: 16.0,
                    max_x: 304.0,
                    max_y: 224.0,
                }),
                stack: SpriteStack {
                    name: "player".to_string(),
                    layers: 6,
                    layer_size: [12.0, 12.0],
                },
                spread: 1.0,
            },
            enemy,
            boss,
            jump_velocity: None,
            spawner: SpawnerConfig {
                enabled: true,
                region: Aabb {
                    min_x: 0.0,
                    min_y: -40.0,
                    max_x: 320.0,
                    max_y: -24.0,
                },
                initial_interval: 45,
                min_interval: 12,
                shrink: 1,
                velocity_min: [-0.4, 0.8],
                velocity_max: [0.4, 2.0],
            },
            flow: FlowConfig::default(),
            burst: BurstConfig::default(),
            builtin_level: BuiltinLevel::Arena,
            rotation: 0.0,
        }
    }
}

fn default_window_size() -> [f32; 2] {
    [640.0, 480.0]
}

fn default_background_color() -> [f32; 3] {
    [0.08, 0.03, 0.05]
}

/// Startup configuration, read once from JSON before the app is built.
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub variant: GameVariant,
    #[serde(default)]
    pub window_title: Option<String>,
    #[serde(default = "default_window_size")]
    pub window_size: [f32; 2],
    #[serde(default = "default_background_color")]
    pub background_color: [f32; 3],
    /// Directory of `<n>.json` level files. Unset means the built-in level.
    #[serde(default)]
    pub maps_dir: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Replaces the variant preset wholesale when present.
    #[serde(default)]
    pub rules: Option<VariantRules>,
    #[serde(default)]
    pub volume: VolumeConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            variant: GameVariant::default(),
            window_title: None,
            window_size: default_window_size(),
            background_color: default_background_color(),
            maps_dir: None,
            seed: None,
            rules: None,
            volume: VolumeConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn resolved_rules(&self) -> VariantRules {
        self.rules
            .clone()
            .unwrap_or_else(|| VariantRules::preset(self.variant))
    }

    pub fn title(&self) -> String {
        self.window_title
            .clone()
            .unwrap_or_else(|| self.variant.title().to_string())
    }

    pub fn display_size(&self) -> Vec2 {
        match &self.rules {
            Some(rules) => Vec2::from(rules.display_size),
            None => Vec2::from(VariantRules::preset(self.variant).display_size),
        }
    }

    /// Env values win over the file. Empty strings count as unset.
    pub fn apply_overrides(&mut self, maps_dir: Option<String>, seed: Option<String>) {
        if let Some(dir) = maps_dir.filter(|s| !s.is_empty()) {
            self.maps_dir = Some(dir);
        }
        if let Some(raw) = seed.filter(|s| !s.is_empty()) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(e) => eprintln!("[Hellgate] Ignoring HELLGATE_SEED={raw}: {e}"),
            }
        }
    }
}

pub fn parse_game_config(contents: &str) -> Result<GameConfig, String> {
    serde_json::from_str::<GameConfig>(contents).map_err(|e| format!("Invalid game config: {e}"))
}

/// Reads `$HELLGATE_CONFIG` (default `game.json`). A missing file yields
/// defaults silently; a broken one is reported and also yields defaults.
pub fn load_game_config() -> GameConfig {
    let path = std::env::var("HELLGATE_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "game.json".to_string());
    let mut config = match std::fs::read_to_string(&path) {
        Ok(contents) => match parse_game_config(&contents) {
            Ok(cfg) => {
                println!("[Hellgate] Loaded game config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[Hellgate] Failed to parse {}: {}", path, e);
                GameConfig::default()
            }
        },
        Err(_) => GameConfig::default(),
    };
    config.apply_overrides(
        std::env::var("HELLGATE_MAPS_DIR").ok(),
        std::env::var("HELLGATE_SEED").ok(),
    );
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_platformer_defaults() {
        let config = parse_game_config("{}").expect("empty object parses");
        assert_eq!(config.variant, GameVariant::Platformer);
        assert_eq!(config.window_size, [640.0, 480.0]);
        assert_eq!(config.title(), "10 Levels of Hell");
        assert_eq!(config.display_size(), Vec2::new(320.0, 240.0));
        let rules = config.resolved_rules();
        assert_eq!(rules.player.speed, 2.2);
        assert_eq!(rules.flow.lives, 3);
        assert_eq!(rules.burst.count, 30);
    }

    #[test]
    fn variant_selects_preset() {
        let config =
            parse_game_config(r#"{"variant": "cleanup", "window_title": "Sweep"}"#).expect("parses");
        assert_eq!(config.title(), "Sweep");
        let rules = config.resolved_rules();
        assert!(rules.jump_velocity.is_none());
        assert_eq!(rules.player.boundary, BoundaryPolicy::Clamp);
        assert_eq!(rules.enemy.boundary, BoundaryPolicy::ClampAndRemove);
        assert_eq!(rules.builtin_level, BuiltinLevel::Arena);
    }

    #[test]
    fn rules_block_replaces_preset() {
        let mut rules = VariantRules::preset(GameVariant::Platformer);
        rules.player.speed = 4.0;
        rules.display_size = [160.0, 120.0];
        let json = serde_json::json!({ "rules": rules }).to_string();
        let config = parse_game_config(&json).expect("rules block parses");
        assert_eq!(config.resolved_rules().player.speed, 4.0);
        assert_eq!(config.display_size(), Vec2::new(160.0, 120.0));
    }

    #[test]
    fn broken_config_is_an_error() {
        let err = parse_game_config(r#"{"variant": "racing"}"#).unwrap_err();
        assert!(err.starts_with("Invalid game config"));
    }

    #[test]
    fn env_overrides_apply_when_present() {
        let mut config = GameConfig::default();
        config.apply_overrides(Some("levels".to_string()), Some("42".to_string()));
        assert_eq!(config.maps_dir.as_deref(), Some("levels"));
        assert_eq!(config.seed, Some(42));

        config.apply_overrides(Some(String::new()), Some("not-a-number".to_string()));
        assert_eq!(config.maps_dir.as_deref(), Some("levels"));
        assert_eq!(config.seed, Some(42));
    }
}
