use bevy::prelude::*;

use crate::config::GameConfig;
use crate::screen_effects::ScreenState;

#[derive(Component)]
pub struct MainCamera;

/// Windowed only. Shows the display-sized play area scaled up to the
/// window, shaken by the simulation's screenshake.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScreenState>()
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, camera_shake);
    }
}

/// World units per window pixel so the whole display fits the window.
pub fn projection_scale(display: Vec2, window: Vec2) -> f32 {
    let ratio = display / window.max(Vec2::ONE);
    ratio.x.max(ratio.y)
}

fn spawn_camera(mut commands: Commands, config: Res<GameConfig>) {
    let scale = projection_scale(config.display_size(), Vec2::from(config.window_size));
    commands.spawn((
        MainCamera,
        Camera2d,
        OrthographicProjection {
            scale,
            ..OrthographicProjection::default_2d()
        },
        Transform::from_xyz(0.0, 0.0, 100.0),
    ));
}

fn camera_shake(screen: Res<ScreenState>, mut camera_query: Query<&mut Transform, With<MainCamera>>) {
    let Ok(mut cam_transform) = camera_query.get_single_mut() else {
        return;
    };
    // Display space is y-down, world space y-up.
    cam_transform.translation.x = -screen.shake_offset.x;
    cam_transform.translation.y = screen.shake_offset.y;
}
