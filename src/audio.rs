use std::collections::HashMap;

use bevy::audio::Volume;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;

const MAX_AUDIO_EVENTS: usize = 256;

fn default_volume() -> f32 {
    1.0
}

/// Fire-and-forget sound requests from the simulation.
pub trait SoundSink {
    fn play(&mut self, name: &str);
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SfxDefinition {
    pub path: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl SfxDefinition {
    fn new(path: &str, volume: f32) -> Self {
        Self {
            path: path.to_string(),
            volume,
        }
    }
}

/// Channel levels from the game config, applied once at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    #[serde(default = "default_volume")]
    pub master: f32,
    #[serde(default = "default_volume")]
    pub sfx: f32,
    #[serde(default = "default_volume")]
    pub music: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            master: default_volume(),
            sfx: default_volume(),
            music: default_volume(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioEventLog {
    pub frame: u64,
    pub name: String,
    pub volume: f32,
}

#[derive(Resource)]
pub struct AudioManager {
    pub sfx: HashMap<String, SfxDefinition>,
    /// Background track, looped for the whole session.
    pub music: SfxDefinition,
    pub master_volume: f32,
    pub sfx_volume: f32,
    pub music_volume: f32,
    /// Requests not yet handed to the audio backend.
    pub pending: Vec<(String, f32)>,
    pub recent_events: Vec<AudioEventLog>,
    pub frame: u64,
}

impl Default for AudioManager {
    fn default() -> Self {
        let sfx = HashMap::from([
            ("jump".to_string(), SfxDefinition::new("sfx/jump.wav", 0.7)),
            ("dash".to_string(), SfxDefinition::new("sfx/dash.wav", 0.3)),
            ("hit".to_string(), SfxDefinition::new("sfx/hit.wav", 0.8)),
            ("shoot".to_string(), SfxDefinition::new("sfx/shoot.wav", 0.4)),
            ("ambience".to_string(), SfxDefinition::new("sfx/ambience.wav", 0.2)),
        ]);
        Self {
            sfx,
            music: SfxDefinition::new("music.mp3", 0.5),
            master_volume: 1.0,
            sfx_volume: 1.0,
            music_volume: 1.0,
            pending: Vec::new(),
            recent_events: Vec::new(),
            frame: 0,
        }
    }
}

impl AudioManager {
    pub fn play_sfx(&mut self, name: &str, frame: u64) -> Result<(), String> {
        let Some(def) = self.sfx.get(name) else {
            return Err(format!("Unknown sfx: {name}"));
        };
        let volume = def.volume * self.sfx_volume * self.master_volume;
        self.pending.push((def.path.clone(), volume));
        self.push_event(AudioEventLog {
            frame,
            name: name.to_string(),
            volume,
        });
        Ok(())
    }

    pub fn set_volume(&mut self, channel: &str, value: f32) -> Result<(), String> {
        let v = value.clamp(0.0, 2.0);
        match channel {
            "master" => self.master_volume = v,
            "sfx" => self.sfx_volume = v,
            "music" => self.music_volume = v,
            _ => return Err(format!("Unknown volume channel: {channel}")),
        }
        Ok(())
    }

    /// Tracks that loop from startup: the music and the ambience bed.
    pub fn looped_tracks(&self) -> Vec<(String, f32)> {
        let mut tracks = vec![(
            self.music.path.clone(),
            self.music.volume * self.music_volume * self.master_volume,
        )];
        if let Some(ambience) = self.sfx.get("ambience") {
            tracks.push((
                ambience.path.clone(),
                ambience.volume * self.sfx_volume * self.master_volume,
            ));
        }
        tracks
    }

    pub fn played(&self, name: &str) -> usize {
        self.recent_events.iter().filter(|e| e.name == name).count()
    }

    fn push_event(&mut self, event: AudioEventLog) {
        self.recent_events.push(event);
        if self.recent_events.len() > MAX_AUDIO_EVENTS {
            let excess = self.recent_events.len() - MAX_AUDIO_EVENTS;
            self.recent_events.drain(0..excess);
        }
    }
}

impl SoundSink for AudioManager {
    fn play(&mut self, name: &str) {
        if let Err(e) = self.play_sfx(name, self.frame) {
            debug!("[Hellgate audio] {e}");
        }
    }
}

pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(AudioManager::default())
            .add_systems(Startup, (apply_volume_config, start_loops).chain())
            .add_systems(PostUpdate, flush_pending_sfx);
    }
}

fn apply_volume_config(config: Option<Res<GameConfig>>, mut audio: ResMut<AudioManager>) {
    let Some(config) = config else {
        return;
    };
    let levels = &config.volume;
    for (channel, value) in [
        ("master", levels.master),
        ("sfx", levels.sfx),
        ("music", levels.music),
    ] {
        if let Err(e) = audio.set_volume(channel, value) {
            warn!("[Hellgate audio] {e}");
        }
    }
}

fn start_loops(
    mut commands: Commands,
    asset_server: Option<Res<AssetServer>>,
    audio: Res<AudioManager>,
) {
    let Some(asset_server) = asset_server else {
        return;
    };
    for (path, volume) in audio.looped_tracks() {
        commands.spawn((
            AudioPlayer::new(asset_server.load(path)),
            PlaybackSettings::LOOP.with_volume(Volume::new(volume)),
        ));
    }
}

/// Hands queued requests to the backend. Without an asset server (headless)
/// they are dropped, the log keeps them.
fn flush_pending_sfx(
    mut commands: Commands,
    asset_server: Option<Res<AssetServer>>,
    mut audio: ResMut<AudioManager>,
) {
    if audio.pending.is_empty() {
        return;
    }
    let pending = std::mem::take(&mut audio.pending);
    let Some(asset_server) = asset_server else {
        return;
    };
    for (path, volume) in pending {
        commands.spawn((
            AudioPlayer::new(asset_server.load(path)),
            PlaybackSettings::DESPAWN.with_volume(Volume::new(volume)),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_sfx_records_event() {
        let mut audio = AudioManager::default();
        audio.master_volume = 0.5;
        audio.play_sfx("hit", 10).expect("sfx should play");

        assert_eq!(audio.recent_events.len(), 1);
        let ev = &audio.recent_events[0];
        assert_eq!(ev.name, "hit");
        assert_eq!(ev.frame, 10);
        assert!((ev.volume - 0.4).abs() < 1e-6);
        assert_eq!(audio.pending, vec![("sfx/hit.wav".to_string(), ev.volume)]);
    }

    #[test]
    fn unknown_sound_is_ignored_by_the_sink() {
        let mut audio = AudioManager::default();
        assert!(audio.play_sfx("explode", 0).is_err());
        audio.play("explode");
        assert!(audio.recent_events.is_empty());
        assert!(audio.pending.is_empty());
    }

    #[test]
    fn event_log_is_bounded() {
        let mut audio = AudioManager::default();
        for frame in 0..300 {
            audio.frame = frame;
            audio.play("jump");
        }
        assert_eq!(audio.recent_events.len(), MAX_AUDIO_EVENTS);
        assert_eq!(audio.recent_events[0].frame, 44);
        assert_eq!(audio.played("jump"), MAX_AUDIO_EVENTS);
    }

    #[test]
    fn invalid_channel_rejected() {
        let mut audio = AudioManager::default();
        let err = audio
            .set_volume("voice", 1.0)
            .expect_err("invalid channel should fail");
        assert!(err.contains("Unknown volume channel"));
    }

    #[test]
    fn music_and_ambience_loop_at_channel_levels() {
        let mut audio = AudioManager::default();
        audio.set_volume("music", 0.5).expect("music channel");
        audio.set_volume("sfx", 0.5).expect("sfx channel");
        let tracks = audio.looped_tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].0, "music.mp3");
        assert!((tracks[0].1 - 0.25).abs() < 1e-6);
        assert_eq!(tracks[1].0, "sfx/ambience.wav");
        assert!((tracks[1].1 - 0.1).abs() < 1e-6);
    }

    #[test]
    fn config_volumes_applied_at_startup() {
        let mut config = GameConfig::default();
        config.volume.master = 0.5;
        config.volume.sfx = 3.0;
        let mut app = App::new();
        app.insert_resource(config).add_plugins(AudioPlugin);
        app.update();

        let audio = app.world().resource::<AudioManager>();
        assert_eq!(audio.master_volume, 0.5);
        assert_eq!(audio.sfx_volume, 2.0);
        assert_eq!(audio.music_volume, 1.0);
    }

    #[test]
    fn headless_flush_drops_queue() {
        let mut app = App::new();
        app.insert_resource(AudioManager::default())
            .add_systems(Update, flush_pending_sfx);
        app.world_mut()
            .resource_mut::<AudioManager>()
            .play("jump");
        app.update();
        let audio = app.world().resource::<AudioManager>();
        assert!(audio.pending.is_empty());
        assert_eq!(audio.played("jump"), 1);
    }
}
