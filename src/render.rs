use bevy::prelude::*;

use crate::config::GameConfig;

/// Anything the simulation can draw onto. The simulation never reads pixels
/// back; it only describes what goes where.
pub trait Canvas {
    fn sprite(&mut self, draw: SpriteDraw);
    fn polygon(&mut self, points: [Vec2; 4], color: [f32; 4]);
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpriteDraw {
    pub sprite: String,
    pub layer: usize,
    /// Animation image index within the sprite.
    pub frame: usize,
    /// Top-left corner in display pixels, camera offset already applied.
    pub top_left: Vec2,
    pub size: Vec2,
    /// Counter-clockwise, degrees.
    pub rotation: f32,
    pub flip_x: bool,
}

impl SpriteDraw {
    pub fn plain(sprite: impl Into<String>, layer: usize, top_left: Vec2, size: Vec2) -> Self {
        Self {
            sprite: sprite.into(),
            layer,
            frame: 0,
            top_left,
            size,
            rotation: 0.0,
            flip_x: false,
        }
    }
}

/// A stack of equally sized layers drawn bottom to top, each nudged upward
/// by the render spread to fake depth.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpriteStack {
    pub name: String,
    pub layers: usize,
    pub layer_size: [f32; 2],
}

impl SpriteStack {
    pub fn size(&self) -> Vec2 {
        Vec2::from(self.layer_size)
    }
}

/// Bounding box of a `size` image after rotating it by `degrees`.
pub fn rotated_size(size: Vec2, degrees: f32) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(
        (size.x * cos).abs() + (size.y * sin).abs(),
        (size.x * sin).abs() + (size.y * cos).abs(),
    )
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Sprite(SpriteDraw),
    Polygon { points: [Vec2; 4], color: [f32; 4] },
}

/// Draw commands recorded during the last simulated frame.
#[derive(Resource, Default, Debug)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn sprite_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Sprite(_)))
            .count()
    }

    pub fn polygon_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Polygon { .. }))
            .count()
    }

    pub fn sprites_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SpriteDraw> + 'a {
        self.commands.iter().filter_map(move |c| match c {
            DrawCommand::Sprite(s) if s.sprite == name => Some(s),
            _ => None,
        })
    }
}

impl Canvas for DrawList {
    fn sprite(&mut self, draw: SpriteDraw) {
        self.commands.push(DrawCommand::Sprite(draw));
    }

    fn polygon(&mut self, points: [Vec2; 4], color: [f32; 4]) {
        self.commands.push(DrawCommand::Polygon { points, color });
    }
}

/// Windowed-only: turns the draw list into quads and gizmo outlines.
pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DrawList>()
            .add_systems(Update, (sync_draw_list_sprites, draw_polygons));
    }
}

/// Marker for quads spawned from the draw list (rebuilt whenever it changes).
#[derive(Component)]
pub struct DrawnSprite;

/// Display space (origin top-left, y down) to world space (origin centre, y up).
pub fn display_to_world(top_left: Vec2, size: Vec2, display: Vec2) -> Vec2 {
    let centre = top_left + size * 0.5;
    Vec2::new(centre.x - display.x * 0.5, display.y * 0.5 - centre.y)
}

fn sprite_color(name: &str, layer: usize, frame: usize) -> Color {
    let shade = 0.55 + 0.06 * (layer % 8) as f32 - 0.03 * (frame % 4) as f32;
    let base = match name.split('/').next().unwrap_or_default() {
        "player" => [0.25, 0.45, 0.95],
        "enemy" => [0.9, 0.2, 0.15],
        "boss" => [0.6, 0.15, 0.75],
        "particle" => [1.0, 0.85, 0.6],
        "tile" if name.ends_with("grass") => [0.3, 0.6, 0.25],
        "tile" if name.ends_with("spawners") => [0.9, 0.9, 0.2],
        "tile" => [0.45, 0.42, 0.4],
        _ => [0.8, 0.8, 0.8],
    };
    Color::srgb(
        (base[0] * shade).min(1.0),
        (base[1] * shade).min(1.0),
        (base[2] * shade).min(1.0),
    )
}

fn sync_draw_list_sprites(
    mut commands: Commands,
    config: Res<GameConfig>,
    draw_list: Res<DrawList>,
    drawn: Query<Entity, With<DrawnSprite>>,
) {
    if !draw_list.is_changed() {
        return;
    }
    for entity in drawn.iter() {
        commands.entity(entity).despawn();
    }
    let display = config.display_size();
    for (index, command) in draw_list.commands.iter().enumerate() {
        let DrawCommand::Sprite(draw) = command else {
            continue;
        };
        let world = display_to_world(draw.top_left, draw.size, display);
        let mut sprite = Sprite::from_color(sprite_color(&draw.sprite, draw.layer, draw.frame), draw.size);
        sprite.flip_x = draw.flip_x;
        commands.spawn((
            DrawnSprite,
            sprite,
            Transform::from_xyz(world.x, world.y, 1.0 + index as f32 * 0.001)
                .with_rotation(Quat::from_rotation_z(draw.rotation.to_radians())),
        ));
    }
}

fn draw_polygons(config: Res<GameConfig>, draw_list: Res<DrawList>, mut gizmos: Gizmos) {
    let display = config.display_size();
    for command in &draw_list.commands {
        let DrawCommand::Polygon { points, color } = command else {
            continue;
        };
        let world = points.map(|p| display_to_world(p, Vec2::ZERO, display));
        gizmos.linestrip_2d(
            [world[0], world[1], world[2], world[3], world[0]],
            Color::srgba(color[0], color[1], color[2], color[3]),
        );
    }
}
