use std::collections::HashMap;

use bevy::prelude::*;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationClipDef {
    pub frame_count: usize,
    /// Ticks each image stays on screen.
    #[serde(default = "default_image_duration")]
    pub image_duration: u32,
    #[serde(default = "default_true")]
    pub looping: bool,
}

fn default_image_duration() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl AnimationClipDef {
    fn new(frame_count: usize, image_duration: u32, looping: bool) -> Self {
        Self {
            frame_count,
            image_duration,
            looping,
        }
    }
}

/// Clips keyed by `"<entity kind>/<action>"`, e.g. `"player/run"`.
#[derive(Resource, Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AnimationLibrary {
    pub clips: HashMap<String, AnimationClipDef>,
}

impl AnimationLibrary {
    /// Fresh playback of the clip at `key`. Unknown keys play a single
    /// still image so a missing asset never stops the simulation.
    pub fn instantiate(&self, key: &str) -> Animation {
        match self.clips.get(key) {
            Some(clip) => Animation::from_clip(clip),
            None => {
                debug!("[Hellgate anim] No clip '{key}', using a still frame");
                Animation::from_clip(&AnimationClipDef::new(1, 1, true))
            }
        }
    }
}

pub fn default_animation_library() -> AnimationLibrary {
    let clips = HashMap::from([
        ("player/idle".to_string(), AnimationClipDef::new(4, 6, true)),
        ("player/run".to_string(), AnimationClipDef::new(4, 4, true)),
        ("player/jump".to_string(), AnimationClipDef::new(1, 5, true)),
        ("enemy/idle".to_string(), AnimationClipDef::new(4, 6, true)),
        ("boss/idle".to_string(), AnimationClipDef::new(4, 8, true)),
        (
            "particle/particle".to_string(),
            AnimationClipDef::new(4, 6, false),
        ),
    ]);
    AnimationLibrary { clips }
}

/// Playback state of one clip. `frame` counts ticks, not images.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    pub frame_count: usize,
    pub image_duration: u32,
    pub looping: bool,
    pub frame: u32,
    pub done: bool,
}

impl Animation {
    pub fn from_clip(clip: &AnimationClipDef) -> Self {
        Self {
            frame_count: clip.frame_count.max(1),
            image_duration: clip.image_duration.max(1),
            looping: clip.looping,
            frame: 0,
            done: false,
        }
    }

    pub fn total_ticks(&self) -> u32 {
        self.image_duration * self.frame_count as u32
    }

    pub fn update(&mut self) {
        let total = self.total_ticks();
        if self.looping {
            self.frame = (self.frame + 1) % total;
        } else {
            self.frame = (self.frame + 1).min(total - 1);
            if self.frame >= total - 1 {
                self.done = true;
            }
        }
    }

    pub fn image_index(&self) -> usize {
        ((self.frame / self.image_duration) as usize).min(self.frame_count - 1)
    }
}

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<AnimationLibrary>() {
            app.insert_resource(default_animation_library());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looping_clip_wraps_around() {
        let mut anim = Animation::from_clip(&AnimationClipDef::new(2, 3, true));
        let mut images = Vec::new();
        for _ in 0..7 {
            anim.update();
            images.push(anim.image_index());
        }
        assert_eq!(images, vec![0, 0, 1, 1, 1, 0, 0]);
        assert!(!anim.done);
    }

    #[test]
    fn non_looping_clip_stops_on_last_tick() {
        let mut anim = Animation::from_clip(&AnimationClipDef::new(2, 2, false));
        anim.update();
        anim.update();
        assert!(!anim.done);
        anim.update();
        assert!(anim.done);
        assert_eq!(anim.frame, 3);
        anim.update();
        assert_eq!(anim.frame, 3);
        assert_eq!(anim.image_index(), 1);
    }

    #[test]
    fn missing_clip_falls_back_to_still_frame() {
        let library = default_animation_library();
        let anim = library.instantiate("ghost/float");
        assert_eq!(anim.frame_count, 1);
        assert!(anim.looping);
        assert_eq!(library.instantiate("particle/particle").total_ticks(), 24);
    }

    #[test]
    fn plugin_keeps_a_preloaded_library() {
        let mut app = App::new();
        let mut custom = AnimationLibrary::default();
        custom
            .clips
            .insert("player/idle".to_string(), AnimationClipDef::new(9, 1, true));
        app.insert_resource(custom).add_plugins(AnimationPlugin);
        let library = app.world().resource::<AnimationLibrary>();
        assert_eq!(library.clips.len(), 1);
    }
}
