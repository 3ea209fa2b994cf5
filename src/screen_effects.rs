use bevy::prelude::*;
use rand::Rng;

use crate::camera::MainCamera;

/// Camera jitter magnitude in display pixels. Triggers never lower it; it
/// decays by one every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenShake {
    pub intensity: f32,
}

impl ScreenShake {
    pub fn trigger(&mut self, strength: f32) {
        self.intensity = self.intensity.max(strength);
    }

    pub fn tick(&mut self) {
        self.intensity = (self.intensity - 1.0).max(0.0);
    }

    /// Uniform jitter in `[-intensity/2, intensity/2)` on each axis.
    pub fn offset(&self, rng: &mut impl Rng) -> Vec2 {
        if self.intensity <= 0.0 {
            return Vec2::ZERO;
        }
        let half = self.intensity / 2.0;
        Vec2::new(
            rng.gen::<f32>() * self.intensity - half,
            rng.gen::<f32>() * self.intensity - half,
        )
    }
}

/// What the presentation layer needs from the last simulated frame.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct ScreenState {
    pub shake_offset: Vec2,
    pub transition: i32,
    pub transition_span: i32,
}

impl ScreenState {
    /// 0 when the iris is fully open, 1 when fully closed.
    pub fn cover(&self) -> f32 {
        if self.transition_span <= 0 {
            return 0.0;
        }
        (self.transition.abs() as f32 / self.transition_span as f32).clamp(0.0, 1.0)
    }
}

/// Windowed only: the level transition overlay.
pub struct ScreenEffectsPlugin;

impl Plugin for ScreenEffectsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScreenState>()
            .add_systems(Startup, spawn_screen_overlay)
            .add_systems(Update, sync_overlay_visual);
    }
}

/// Marker for the screen effects overlay sprite
#[derive(Component)]
pub struct ScreenOverlay;

fn spawn_screen_overlay(mut commands: Commands) {
    commands.spawn((
        ScreenOverlay,
        Sprite::from_color(Color::srgba(0.0, 0.0, 0.0, 0.0), Vec2::new(4096.0, 4096.0)),
        Transform::from_xyz(0.0, 0.0, 300.0),
    ));
}

fn sync_overlay_visual(
    screen: Res<ScreenState>,
    camera_q: Query<&Transform, (With<MainCamera>, Without<ScreenOverlay>)>,
    mut overlay_q: Query<(&mut Sprite, &mut Transform), With<ScreenOverlay>>,
) {
    let Ok((mut sprite, mut transform)) = overlay_q.get_single_mut() else {
        return;
    };
    // Follow camera
    if let Ok(cam_transform) = camera_q.get_single() {
        transform.translation.x = cam_transform.translation.x;
        transform.translation.y = cam_transform.translation.y;
    }
    sprite.color = Color::srgba(0.0, 0.0, 0.0, screen.cover());
}
