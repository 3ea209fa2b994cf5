use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bevy::log::{info, warn};
use bevy::math::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::physics_core::Aabb;
use crate::render::{Canvas, SpriteDraw};

const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Tile category as written in level files.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TileKind {
    Grass,
    Stone,
    Spawners,
    Decor(String),
}

impl From<String> for TileKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "grass" => TileKind::Grass,
            "stone" => TileKind::Stone,
            "spawners" => TileKind::Spawners,
            _ => TileKind::Decor(value),
        }
    }
}

impl From<TileKind> for String {
    fn from(kind: TileKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TileKind {
    pub fn as_str(&self) -> &str {
        match self {
            TileKind::Grass => "grass",
            TileKind::Stone => "stone",
            TileKind::Spawners => "spawners",
            TileKind::Decor(name) => name,
        }
    }

    pub fn is_solid(&self) -> bool {
        matches!(self, TileKind::Grass | TileKind::Stone)
    }
}

/// One tile record. Grid tiles carry grid coordinates in `pos`, off-grid
/// records carry pixel coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub variant: u32,
    pub pos: [f32; 2],
}

fn default_tile_size() -> f32 {
    16.0
}

/// On-disk level layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelFile {
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    #[serde(default)]
    pub tilemap: HashMap<String, TileRecord>,
    #[serde(default)]
    pub offgrid: Vec<TileRecord>,
}

/// Which generated level to use when no level files are available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinLevel {
    Hellscape,
    Arena,
}

#[derive(Clone, Debug)]
pub struct Tilemap {
    pub tile_size: f32,
    pub grid: HashMap<IVec2, TileRecord>,
    pub offgrid: Vec<TileRecord>,
}

impl Tilemap {
    pub fn new(tile_size: f32) -> Self {
        Self {
            tile_size: tile_size.max(1.0),
            grid: HashMap::new(),
            offgrid: Vec::new(),
        }
    }

    pub fn from_level(level: LevelFile) -> Result<Self, String> {
        let mut tilemap = Tilemap::new(level.tile_size);
        for (key, record) in level.tilemap {
            let cell = parse_grid_key(&key)?;
            tilemap.grid.insert(cell, record);
        }
        tilemap.offgrid = level.offgrid;
        Ok(tilemap)
    }

    pub fn from_json(contents: &str) -> Result<Self, String> {
        let level: LevelFile =
            serde_json::from_str(contents).map_err(|e| format!("Invalid level file: {e}"))?;
        Self::from_level(level)
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Places a grid tile, replacing whatever occupied the cell.
    pub fn insert(&mut self, cell: IVec2, kind: TileKind, variant: u32) {
        self.grid.insert(
            cell,
            TileRecord {
                kind,
                variant,
                pos: [cell.x as f32, cell.y as f32],
            },
        );
    }

    pub fn cell_of(&self, point: Vec2) -> IVec2 {
        IVec2::new(
            (point.x / self.tile_size).floor() as i32,
            (point.y / self.tile_size).floor() as i32,
        )
    }

    pub fn cell_rect(&self, cell: IVec2) -> Aabb {
        Aabb::new(
            cell.x as f32 * self.tile_size,
            cell.y as f32 * self.tile_size,
            self.tile_size,
            self.tile_size,
        )
    }

    /// Solid tile rectangles in the 3x3 neighbourhood of `point`. Cells
    /// outside the loaded grid simply yield nothing.
    pub fn solid_rects_near(&self, point: Vec2) -> Vec<Aabb> {
        let cell = self.cell_of(point);
        NEIGHBOR_OFFSETS
            .iter()
            .map(|(dx, dy)| cell + IVec2::new(*dx, *dy))
            .filter(|c| self.grid.get(c).is_some_and(|t| t.kind.is_solid()))
            .map(|c| self.cell_rect(c))
            .collect()
    }

    /// Solid tile rectangles covering every cell `rect` spans plus a
    /// one-cell margin. Same as `solid_rects_near` for bodies up to two tiles.
    pub fn solid_rects_around(&self, rect: &Aabb) -> Vec<Aabb> {
        let min = self.cell_of(rect.min());
        let max = self.cell_of(Vec2::new(rect.max_x, rect.max_y));
        let mut out = Vec::new();
        for y in (min.y - 1)..=(max.y + 1) {
            for x in (min.x - 1)..=(max.x + 1) {
                let cell = IVec2::new(x, y);
                if self.grid.get(&cell).is_some_and(|t| t.kind.is_solid()) {
                    out.push(self.cell_rect(cell));
                }
            }
        }
        out
    }

    pub fn is_solid_at(&self, point: Vec2) -> bool {
        self.grid
            .get(&self.cell_of(point))
            .is_some_and(|t| t.kind.is_solid())
    }

    /// Pulls out records matching any `(kind, variant)` pair, converting grid
    /// positions to pixels. Matches are removed from the map unless `keep`.
    pub fn extract(&mut self, ids: &[(TileKind, u32)], keep: bool) -> Vec<TileRecord> {
        let wanted = |record: &TileRecord| {
            ids.iter()
                .any(|(kind, variant)| *kind == record.kind && *variant == record.variant)
        };

        let mut matches: Vec<TileRecord> = self
            .offgrid
            .iter()
            .filter(|r| wanted(r))
            .cloned()
            .collect();
        if !keep {
            self.offgrid.retain(|r| !wanted(r));
        }

        let mut cells: Vec<IVec2> = self
            .grid
            .iter()
            .filter(|(_, r)| wanted(r))
            .map(|(cell, _)| *cell)
            .collect();
        cells.sort_by_key(|c| (c.y, c.x));
        for cell in cells {
            let record = if keep {
                self.grid.get(&cell).cloned()
            } else {
                self.grid.remove(&cell)
            };
            if let Some(mut record) = record {
                record.pos = [
                    cell.x as f32 * self.tile_size,
                    cell.y as f32 * self.tile_size,
                ];
                matches.push(record);
            }
        }
        matches
    }

    pub fn render(&self, canvas: &mut impl Canvas, offset: Vec2) {
        let size = Vec2::splat(self.tile_size);
        for record in &self.offgrid {
            canvas.sprite(SpriteDraw::plain(
                format!("tile/{}", record.kind.as_str()),
                record.variant as usize,
                Vec2::from(record.pos) - offset,
                size,
            ));
        }
        let mut cells: Vec<(&IVec2, &TileRecord)> = self.grid.iter().collect();
        cells.sort_by_key(|(c, _)| (c.y, c.x));
        for (cell, record) in cells {
            canvas.sprite(SpriteDraw::plain(
                format!("tile/{}", record.kind.as_str()),
                record.variant as usize,
                cell.as_vec2() * self.tile_size - offset,
                size,
            ));
        }
    }

    pub fn builtin(level: BuiltinLevel) -> Self {
        match level {
            BuiltinLevel::Hellscape => Self::hellscape(),
            BuiltinLevel::Arena => Self::arena(),
        }
    }

    /// Floor with two ledges, one player spawn, two enemies and a boss.
    fn hellscape() -> Self {
        let mut tilemap = Tilemap::new(16.0);
        for x in 2..19 {
            tilemap.insert(IVec2::new(x, 8), TileKind::Grass, 0);
            tilemap.insert(IVec2::new(x, 9), TileKind::Stone, 0);
        }
        for x in 6..9 {
            tilemap.insert(IVec2::new(x, 5), TileKind::Stone, 1);
        }
        for x in 12..15 {
            tilemap.insert(IVec2::new(x, 4), TileKind::Stone, 1);
        }
        tilemap.offgrid = vec![
            spawner(0, 120.0, 160.0),
            spawner(1, 240.0, 137.0),
            spawner(2, 160.0, 72.0),
            spawner(3, 290.0, 137.0),
            TileRecord {
                kind: TileKind::Decor("skull".to_string()),
                variant: 0,
                pos: [200.0, 120.0],
            },
        ];
        tilemap
    }

    /// Empty playfield with only a centred player spawn.
    fn arena() -> Self {
        let mut tilemap = Tilemap::new(16.0);
        tilemap.offgrid = vec![spawner(0, 160.0, 200.0)];
        tilemap
    }
}

fn spawner(variant: u32, x: f32, y: f32) -> TileRecord {
    TileRecord {
        kind: TileKind::Spawners,
        variant,
        pos: [x, y],
    }
}

fn parse_grid_key(key: &str) -> Result<IVec2, String> {
    let (x, y) = key
        .split_once(';')
        .ok_or_else(|| format!("Malformed grid key '{key}'"))?;
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("Malformed grid key '{key}': {e}"))?;
    let y = y
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("Malformed grid key '{key}': {e}"))?;
    Ok(IVec2::new(x, y))
}

/// Where levels come from: a directory of `<index>.json` files, or a
/// generated level when no directory is usable.
#[derive(Clone, Debug)]
pub enum LevelSource {
    Directory { dir: PathBuf, count: usize },
    Builtin(BuiltinLevel),
}

impl LevelSource {
    pub fn discover(dir: Option<&Path>, fallback: BuiltinLevel) -> Self {
        let Some(dir) = dir else {
            return LevelSource::Builtin(fallback);
        };
        let count = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                .count(),
            Err(err) => {
                warn!(
                    "[Hellgate level] Cannot read maps dir {}: {err}; using built-in level",
                    dir.display()
                );
                0
            }
        };
        if count == 0 {
            return LevelSource::Builtin(fallback);
        }
        info!("[Hellgate level] Found {count} level(s) in {}", dir.display());
        LevelSource::Directory {
            dir: dir.to_path_buf(),
            count,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            LevelSource::Directory { count, .. } => *count,
            LevelSource::Builtin(_) => 1,
        }
    }

    pub fn load(&self, index: usize) -> Result<Tilemap, String> {
        match self {
            LevelSource::Directory { dir, count } => {
                if index >= *count {
                    return Err(format!("Level {index} out of range (0..{count})"));
                }
                Tilemap::load(&dir.join(format!("{index}.json")))
            }
            LevelSource::Builtin(level) => Ok(Tilemap::builtin(*level)),
        }
    }

    pub fn fallback(&self) -> BuiltinLevel {
        match self {
            LevelSource::Builtin(level) => *level,
            LevelSource::Directory { .. } => BuiltinLevel::Hellscape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DrawList;

    const SAMPLE: &str = r#"{
        "tile_size": 16,
        "tilemap": {
            "0;3": {"type": "grass", "variant": 1, "pos": [0, 3]},
            "1;3": {"type": "stone", "variant": 0, "pos": [1, 3]},
            "2;3": {"type": "vines", "variant": 2, "pos": [2, 3]},
            "4;1": {"type": "spawners", "variant": 2, "pos": [4, 1]}
        },
        "offgrid": [
            {"type": "spawners", "variant": 0, "pos": [40.5, 12.0]},
            {"type": "spawners", "variant": 1, "pos": [80.0, 12.0]}
        ]
    }"#;

    #[test]
    fn parses_level_file_and_classifies_tiles() {
        let tilemap = Tilemap::from_json(SAMPLE).expect("sample level parses");
        assert_eq!(tilemap.grid.len(), 4);
        assert!(tilemap.is_solid_at(Vec2::new(5.0, 50.0)));
        assert!(tilemap.is_solid_at(Vec2::new(17.0, 63.9)));
        assert!(!tilemap.is_solid_at(Vec2::new(33.0, 50.0)));
        assert_eq!(
            tilemap.grid[&IVec2::new(2, 3)].kind,
            TileKind::Decor("vines".to_string())
        );
    }

    #[test]
    fn malformed_grid_key_is_rejected() {
        let bad = r#"{"tilemap": {"3-4": {"type": "grass", "variant": 0, "pos": [3, 4]}}}"#;
        let err = Tilemap::from_json(bad).unwrap_err();
        assert!(err.contains("3-4"));
    }

    #[test]
    fn neighbourhood_query_returns_only_solid_rects() {
        let tilemap = Tilemap::from_json(SAMPLE).expect("sample level parses");
        let rects = tilemap.solid_rects_near(Vec2::new(20.0, 40.0));
        assert_eq!(rects.len(), 2);
        assert!(rects.contains(&Aabb::new(0.0, 48.0, 16.0, 16.0)));
        assert!(rects.contains(&Aabb::new(16.0, 48.0, 16.0, 16.0)));
    }

    #[test]
    fn queries_outside_loaded_grid_are_empty() {
        let tilemap = Tilemap::from_json(SAMPLE).expect("sample level parses");
        assert!(tilemap.solid_rects_near(Vec2::new(-500.0, 9000.0)).is_empty());
        assert!(tilemap
            .solid_rects_around(&Aabb::new(1000.0, 1000.0, 40.0, 40.0))
            .is_empty());
        assert!(!tilemap.is_solid_at(Vec2::new(-1.0, -1.0)));
    }

    #[test]
    fn span_query_covers_large_bodies() {
        let mut tilemap = Tilemap::new(16.0);
        tilemap.insert(IVec2::new(5, 0), TileKind::Stone, 0);
        // A 60px-wide body centred far from the tile still sees it.
        let rect = Aabb::new(20.0, 0.0, 60.0, 10.0);
        assert!(tilemap.solid_rects_near(rect.center()).is_empty());
        assert_eq!(tilemap.solid_rects_around(&rect).len(), 1);
    }

    #[test]
    fn extract_removes_spawners_and_converts_grid_positions() {
        let mut tilemap = Tilemap::from_json(SAMPLE).expect("sample level parses");
        let ids = [
            (TileKind::Spawners, 0),
            (TileKind::Spawners, 1),
            (TileKind::Spawners, 2),
        ];
        let kept = tilemap.extract(&ids, true);
        assert_eq!(kept.len(), 3);
        assert_eq!(tilemap.offgrid.len(), 2);

        let spawners = tilemap.extract(&ids, false);
        assert_eq!(spawners.len(), 3);
        assert!(tilemap.offgrid.is_empty());
        assert!(!tilemap.grid.contains_key(&IVec2::new(4, 1)));
        let grid_spawner = spawners.iter().find(|s| s.variant == 2).expect("grid spawner");
        assert_eq!(grid_spawner.pos, [64.0, 16.0]);
        assert!(tilemap.extract(&ids, false).is_empty());
    }

    #[test]
    fn render_emits_one_sprite_per_tile() {
        let tilemap = Tilemap::from_json(SAMPLE).expect("sample level parses");
        let mut canvas = DrawList::default();
        tilemap.render(&mut canvas, Vec2::new(8.0, 7.0));
        assert_eq!(canvas.sprite_count(), 6);
    }

    #[test]
    fn level_source_reads_numbered_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("0.json"), SAMPLE).expect("write level");
        std::fs::write(dir.path().join("1.json"), "{ not json").expect("write level");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write notes");

        let source = LevelSource::discover(Some(dir.path()), BuiltinLevel::Arena);
        assert_eq!(source.count(), 2);
        assert!(source.load(0).is_ok());
        assert!(source.load(1).is_err());
        assert!(source.load(7).is_err());
    }

    #[test]
    fn missing_maps_dir_falls_back_to_builtin() {
        let source = LevelSource::discover(
            Some(Path::new("/definitely/not/a/maps/dir")),
            BuiltinLevel::Hellscape,
        );
        assert_eq!(source.count(), 1);
        let tilemap = source.load(0).expect("built-in level");
        assert!(tilemap.is_solid_at(Vec2::new(100.0, 130.0)));
    }
}
