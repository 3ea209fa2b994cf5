use bevy::prelude::*;
use std::collections::HashSet;

/// Abstraction layer between raw input and the simulation.
/// The keyboard writes here in windowed mode; tests and headless runs can
/// write directly.
#[derive(Resource, Default, Clone)]
pub struct VirtualInput {
    pub active: HashSet<String>,
    /// Set on a restart press, cleared when the simulation takes it. Render
    /// frames and fixed steps don't line up, so a one-frame flag could be
    /// missed.
    pub restart_latched: bool,
}

/// Per-step input snapshot handed to the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementInput {
    /// -1 left, +1 right.
    pub horizontal: f32,
    /// -1 up, +1 down.
    pub vertical: f32,
    pub jump: bool,
    pub restart: bool,
}

impl MovementInput {
    pub fn any_movement(&self) -> bool {
        self.horizontal != 0.0 || self.vertical != 0.0 || self.jump
    }
}

impl VirtualInput {
    pub fn pressed(&self, action: &str) -> bool {
        self.active.contains(action)
    }

    pub fn press(&mut self, action: &str) {
        self.active.insert(action.to_string());
        if action == "restart" {
            self.restart_latched = true;
        }
    }

    pub fn release(&mut self, action: &str) {
        self.active.remove(action);
    }

    fn axis(&self, negative: &str, positive: &str) -> f32 {
        (self.pressed(positive) as i8 - self.pressed(negative) as i8) as f32
    }

    /// Reads the held directions and consumes a latched restart.
    pub fn take_movement(&mut self) -> MovementInput {
        MovementInput {
            horizontal: self.axis("left", "right"),
            vertical: self.axis("up", "down"),
            jump: self.pressed("jump"),
            restart: std::mem::take(&mut self.restart_latched),
        }
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(VirtualInput::default())
            .add_systems(
                PreUpdate,
                keyboard_to_virtual.run_if(resource_exists::<ButtonInput<KeyCode>>),
            );
    }
}

const BINDINGS: [(&str, &[KeyCode]); 6] = [
    ("left", &[KeyCode::KeyA, KeyCode::ArrowLeft]),
    ("right", &[KeyCode::KeyD, KeyCode::ArrowRight]),
    ("up", &[KeyCode::KeyW, KeyCode::ArrowUp]),
    ("down", &[KeyCode::KeyS, KeyCode::ArrowDown]),
    ("jump", &[KeyCode::Space, KeyCode::KeyW, KeyCode::ArrowUp]),
    ("restart", &[KeyCode::KeyR]),
];

/// Translate keyboard input to VirtualInput action names
fn keyboard_to_virtual(keyboard: Res<ButtonInput<KeyCode>>, mut vinput: ResMut<VirtualInput>) {
    vinput.active.clear();

    for (action, keys) in BINDINGS {
        if keyboard.any_pressed(keys.iter().copied()) {
            vinput.active.insert(action.into());
        }
        if action == "restart" && keyboard.any_just_pressed(keys.iter().copied()) {
            vinput.restart_latched = true;
        }
    }
}
