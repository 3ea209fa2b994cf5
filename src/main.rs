mod animation;
mod audio;
mod camera;
mod components;
mod config;
mod entities;
mod game_runtime;
mod input;
mod particles;
mod physics_core;
mod render;
mod screen_effects;
mod simulation;
mod spawn;
mod tilemap;

use bevy::prelude::*;
use components::{FrameBudget, GameRng};
use config::GameVariant;

struct LaunchArgs {
    headless: bool,
    max_frames: Option<u64>,
    variant: Option<GameVariant>,
}

fn parse_args(args: &[String]) -> Result<LaunchArgs, String> {
    let mut launch = LaunchArgs {
        headless: false,
        max_frames: None,
        variant: None,
    };
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--headless" => launch.headless = true,
            "--cleanup" => launch.variant = Some(GameVariant::Cleanup),
            "--platformer" => launch.variant = Some(GameVariant::Platformer),
            "--max-frames" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--max-frames needs a value".to_string())?;
                let frames = value
                    .parse::<u64>()
                    .map_err(|e| format!("Invalid --max-frames '{value}': {e}"))?;
                launch.max_frames = Some(frames);
            }
            other => return Err(format!("Unknown argument: {other}")),
        }
    }
    Ok(launch)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let launch = match parse_args(&args) {
        Ok(launch) => launch,
        Err(e) => {
            eprintln!("[Hellgate] {e}");
            eprintln!("usage: hellgate [--headless] [--cleanup|--platformer] [--max-frames N]");
            std::process::exit(2);
        }
    };

    let mut game_config = config::load_game_config();
    if let Some(variant) = launch.variant {
        game_config.variant = variant;
    }
    if let Some(dir) = game_config.maps_dir.as_deref() {
        println!("[Hellgate] Using maps dir: {}", dir);
    }
    let mut app = App::new();

    if launch.headless {
        // Headless mode: no window, no rendering, just the fixed-step simulation
        app.add_plugins(MinimalPlugins);
        app.add_plugins(bevy::log::LogPlugin::default());
        println!("[Hellgate] Starting {} in HEADLESS mode", game_config.title());
    } else {
        let [width, height] = game_config.window_size;
        let plugins = DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: game_config.title(),
                    resolution: (width, height).into(),
                    present_mode: bevy::window::PresentMode::AutoVsync,
                    ..default()
                }),
                ..default()
            })
            .set(bevy::render::texture::ImagePlugin::default_nearest());

        app.add_plugins(plugins);
        let bg = game_config.background_color;
        app.insert_resource(ClearColor(Color::srgb(bg[0], bg[1], bg[2])));
        app.add_plugins(render::RenderPlugin)
            .add_plugins(camera::CameraPlugin)
            .add_plugins(screen_effects::ScreenEffectsPlugin);
        println!("[Hellgate] Starting {} in WINDOWED mode", game_config.title());
    }

    app.insert_resource(GameRng::new(game_config.seed))
        .insert_resource(FrameBudget {
            max_frames: launch.max_frames,
        })
        .insert_resource(game_config)
        .insert_resource(Time::<Fixed>::from_hz(60.0))
        .add_plugins(input::InputPlugin)
        .add_plugins(animation::AnimationPlugin)
        .add_plugins(audio::AudioPlugin)
        .add_plugins(simulation::SimulationPlugin);

    app.run();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("hellgate")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn parses_flags() {
        let launch = parse_args(&args(&["--headless", "--cleanup", "--max-frames", "120"]))
            .expect("valid args");
        assert!(launch.headless);
        assert_eq!(launch.variant, Some(GameVariant::Cleanup));
        assert_eq!(launch.max_frames, Some(120));
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(parse_args(&args(&["--max-frames"])).is_err());
        assert!(parse_args(&args(&["--max-frames", "soon"])).is_err());
        assert!(parse_args(&args(&["--fly"])).is_err());
        assert!(parse_args(&args(&[])).is_ok());
    }
}
