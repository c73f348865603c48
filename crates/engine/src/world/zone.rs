use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::content::{EventConfig, EventTrigger, GroundStyle, NpcConfig, SpecialTile, ZoneConfig};

use super::gate::all_present;
use super::{DynamicZoneMap, Gate, Position, TileType, Viewport};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneBuildError {
    #[error("zone '{zone_id}' has zero width or height")]
    ZeroSize { zone_id: String },
    #[error("zone '{zone_id}' layout has {actual} rows, expected {expected}")]
    LayoutRowCount {
        zone_id: String,
        expected: u32,
        actual: usize,
    },
    #[error("zone '{zone_id}' layout row {row} has {actual} tiles, expected {expected}")]
    LayoutRowWidth {
        zone_id: String,
        row: usize,
        expected: u32,
        actual: usize,
    },
    #[error("zone '{zone_id}' layout row {row} column {column} has unknown glyph '{glyph}'")]
    UnknownGlyph {
        zone_id: String,
        row: usize,
        column: usize,
        glyph: char,
    },
    #[error("zone '{zone_id}' places {what} outside the zone at {position}")]
    OutOfBounds {
        zone_id: String,
        what: &'static str,
        position: Position,
    },
    #[error("zone '{zone_id}' start {position} is not walkable")]
    StartNotWalkable { zone_id: String, position: Position },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VimKey {
    pub position: Position,
    pub key: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectibleKey {
    pub id: String,
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLabel {
    pub position: Position,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNpc<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub position: Position,
    pub dialogue: &'a [String],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyCollection {
    pub removed: bool,
    pub gate_opened: bool,
}

/// A playable area built once from its configuration. Owns its map, gate
/// and collection state; positions held here are absolute map coordinates.
#[derive(Debug, Clone)]
pub struct Zone {
    config: ZoneConfig,
    map: DynamicZoneMap,
    vim_keys: Vec<VimKey>,
    collectible_keys: Vec<CollectibleKey>,
    text_labels: Vec<TextLabel>,
    gate: Option<Gate>,
    collected_keys: BTreeSet<String>,
    collected_collectible_keys: BTreeSet<String>,
    start: Position,
}

impl Zone {
    pub fn from_config(config: &ZoneConfig, viewport: Viewport) -> Result<Self, ZoneBuildError> {
        validate_config(config)?;

        let mut map = DynamicZoneMap::new(config.width, config.height, viewport);
        paint_terrain(&mut map, config);

        let start = map.zone_to_absolute(config.start.x, config.start.y);
        if !map.is_walkable(start) {
            return Err(ZoneBuildError::StartNotWalkable {
                zone_id: config.zone_id.clone(),
                position: config.start,
            });
        }

        let mut vim_keys = Vec::new();
        let mut collectible_keys = Vec::new();
        for special in &config.special_tiles {
            match special {
                SpecialTile::VimKey {
                    x,
                    y,
                    key,
                    description,
                } => vim_keys.push(VimKey {
                    position: map.zone_to_absolute(*x, *y),
                    key: key.clone(),
                    description: description.clone(),
                }),
                SpecialTile::CollectibleKey { x, y, id, name } => {
                    collectible_keys.push(CollectibleKey {
                        id: id.clone(),
                        name: name.clone(),
                        position: map.zone_to_absolute(*x, *y),
                    })
                }
                SpecialTile::Terrain { .. } => {}
            }
        }

        let text_labels = config
            .text_labels
            .iter()
            .map(|label| TextLabel {
                position: map.zone_to_absolute(label.x, label.y),
                text: label.text.clone(),
            })
            .collect();

        let gate = config.gate.as_ref().map(|gate| {
            Gate::new(
                map.zone_to_absolute(gate.x, gate.y),
                gate.unlock_conditions.clone(),
            )
        });

        debug!(
            zone_id = %config.zone_id,
            width = map.width(),
            height = map.height(),
            vim_keys = vim_keys.len(),
            "zone_built"
        );

        Ok(Self {
            config: config.clone(),
            map,
            vim_keys,
            collectible_keys,
            text_labels,
            gate,
            collected_keys: BTreeSet::new(),
            collected_collectible_keys: BTreeSet::new(),
            start,
        })
    }

    pub fn zone_id(&self) -> &str {
        &self.config.zone_id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn biome(&self) -> &str {
        &self.config.biome
    }

    pub fn skill_focus(&self) -> &[String] {
        &self.config.skill_focus
    }

    pub fn puzzle_theme(&self) -> &str {
        &self.config.puzzle_theme
    }

    pub fn narration(&self) -> &[String] {
        &self.config.narration
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    pub fn map(&self) -> &DynamicZoneMap {
        &self.map
    }

    pub fn vim_keys(&self) -> &[VimKey] {
        &self.vim_keys
    }

    pub fn collectible_keys(&self) -> &[CollectibleKey] {
        &self.collectible_keys
    }

    pub fn text_labels(&self) -> &[TextLabel] {
        &self.text_labels
    }

    pub fn gate(&self) -> Option<&Gate> {
        self.gate.as_ref()
    }

    pub fn gate_mut(&mut self) -> Option<&mut Gate> {
        self.gate.as_mut()
    }

    pub fn npcs(&self) -> &[NpcConfig] {
        &self.config.npcs
    }

    pub fn events(&self) -> &[EventConfig] {
        &self.config.events
    }

    pub fn collected_keys(&self) -> &BTreeSet<String> {
        &self.collected_keys
    }

    pub fn collected_collectible_keys(&self) -> &BTreeSet<String> {
        &self.collected_collectible_keys
    }

    pub fn start_position(&self) -> Position {
        self.start
    }

    /// Keys that were never placed are still recorded.
    pub fn collect_key(&mut self, key: &str) -> KeyCollection {
        self.collected_keys.insert(key.to_string());
        let removed = match self.vim_keys.iter().position(|vim_key| vim_key.key == key) {
            Some(index) => {
                self.vim_keys.remove(index);
                true
            }
            None => false,
        };
        let gate_opened = self.open_gate_if_vim_keys_met();
        KeyCollection {
            removed,
            gate_opened,
        }
    }

    /// Never opens the gate.
    pub fn collect_collectible(&mut self, id: &str) -> KeyCollection {
        self.collected_collectible_keys.insert(id.to_string());
        let removed = match self
            .collectible_keys
            .iter()
            .position(|collectible| collectible.id == id)
        {
            Some(index) => {
                self.collectible_keys.remove(index);
                true
            }
            None => false,
        };
        KeyCollection {
            removed,
            gate_opened: false,
        }
    }

    /// Zone-level unlock rule: only the gate's vim-key category is
    /// consulted, and a gate without one never auto-opens.
    pub fn vim_key_requirement_met(&self) -> bool {
        self.gate
            .as_ref()
            .and_then(|gate| gate.unlock_conditions().collected_vim_keys.as_deref())
            .is_some_and(|required| all_present(required, &self.collected_keys))
    }

    pub fn gate_can_unlock(&self) -> bool {
        self.gate.as_ref().is_some_and(|gate| {
            gate.can_unlock(&self.collected_keys, &self.collected_collectible_keys)
        })
    }

    pub fn is_complete(&self) -> bool {
        self.gate.as_ref().is_some_and(Gate::is_open)
    }

    pub fn active_npcs(&self) -> Vec<ActiveNpc<'_>> {
        let complete = self.is_complete();
        self.config
            .npcs
            .iter()
            .filter(|npc| npc.appears_when.is_satisfied(&self.collected_keys, complete))
            .map(|npc| ActiveNpc {
                id: &npc.id,
                name: &npc.name,
                position: self.map.zone_to_absolute(npc.x, npc.y),
                dialogue: &npc.dialogue,
            })
            .collect()
    }

    pub fn events_for<'a>(
        &'a self,
        trigger: &'a EventTrigger,
    ) -> impl Iterator<Item = &'a EventConfig> + 'a {
        self.config
            .events
            .iter()
            .filter(move |event| &event.trigger == trigger)
    }

    pub fn vim_key_at(&self, pos: Position) -> Option<&VimKey> {
        self.vim_keys.iter().find(|vim_key| vim_key.position == pos)
    }

    pub fn collectible_at(&self, pos: Position) -> Option<&CollectibleKey> {
        self.collectible_keys
            .iter()
            .find(|collectible| collectible.position == pos)
    }

    pub fn npc_at(&self, pos: Position) -> Option<ActiveNpc<'_>> {
        self.active_npcs().into_iter().find(|npc| npc.position == pos)
    }

    pub fn is_gate_at(&self, pos: Position) -> bool {
        self.gate.as_ref().is_some_and(|gate| gate.position() == pos)
    }

    /// Walkability including the gate: its cell is passable only while open.
    pub fn is_passable(&self, pos: Position) -> bool {
        match &self.gate {
            Some(gate) if gate.position() == pos => gate.is_walkable() && self.map.contains(pos),
            _ => self.map.is_walkable(pos),
        }
    }

    /// Returns the origin shift applied to every absolute position, if the
    /// grid was rebuilt.
    pub fn relayout(&mut self, viewport: Viewport) -> Option<(i32, i32)> {
        let before = self.map.zone_origin();
        if !self.map.resize(viewport) {
            return None;
        }
        paint_terrain(&mut self.map, &self.config);
        let after = self.map.zone_origin();
        let (dx, dy) = (after.x - before.x, after.y - before.y);

        for vim_key in &mut self.vim_keys {
            vim_key.position = vim_key.position.translate(dx, dy);
        }
        for collectible in &mut self.collectible_keys {
            collectible.position = collectible.position.translate(dx, dy);
        }
        for label in &mut self.text_labels {
            label.position = label.position.translate(dx, dy);
        }
        if let Some(gate) = &mut self.gate {
            gate.shift(dx, dy);
        }
        self.start = self.start.translate(dx, dy);
        Some((dx, dy))
    }

    fn open_gate_if_vim_keys_met(&mut self) -> bool {
        if !self.vim_key_requirement_met() {
            return false;
        }
        match &mut self.gate {
            Some(gate) if !gate.is_open() => {
                gate.open();
                true
            }
            _ => false,
        }
    }
}

pub(crate) fn validate_config(config: &ZoneConfig) -> Result<(), ZoneBuildError> {
    let zone_id = || config.zone_id.clone();
    if config.width == 0 || config.height == 0 {
        return Err(ZoneBuildError::ZeroSize { zone_id: zone_id() });
    }
    if config.layout.len() != config.height as usize {
        return Err(ZoneBuildError::LayoutRowCount {
            zone_id: zone_id(),
            expected: config.height,
            actual: config.layout.len(),
        });
    }
    for (row, line) in config.layout.iter().enumerate() {
        let actual = line.chars().count();
        if actual != config.width as usize {
            return Err(ZoneBuildError::LayoutRowWidth {
                zone_id: zone_id(),
                row,
                expected: config.width,
                actual,
            });
        }
        if let Some((column, glyph)) = line
            .chars()
            .enumerate()
            .find(|(_, glyph)| TileType::from_glyph(*glyph).is_none())
        {
            return Err(ZoneBuildError::UnknownGlyph {
                zone_id: zone_id(),
                row,
                column,
                glyph,
            });
        }
    }

    let in_bounds = |pos: Position| {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < config.width && (pos.y as u32) < config.height
    };
    let mut placed: Vec<(&'static str, Position)> = vec![("start", config.start)];
    placed.extend(config.special_tiles.iter().map(|special| {
        let what = match special {
            SpecialTile::VimKey { .. } => "vim key",
            SpecialTile::CollectibleKey { .. } => "collectible key",
            SpecialTile::Terrain { .. } => "terrain",
        };
        (what, special.position())
    }));
    placed.extend(
        config
            .text_labels
            .iter()
            .map(|label| ("text label", Position::new(label.x, label.y))),
    );
    placed.extend(config.gate.iter().map(|gate| ("gate", Position::new(gate.x, gate.y))));
    placed.extend(
        config
            .npcs
            .iter()
            .map(|npc| ("npc", Position::new(npc.x, npc.y))),
    );

    match placed.into_iter().find(|(_, pos)| !in_bounds(*pos)) {
        Some((what, position)) => Err(ZoneBuildError::OutOfBounds {
            zone_id: zone_id(),
            what,
            position,
        }),
        None => Ok(()),
    }
}

// Assumes the config already passed validate_config.
fn paint_terrain(map: &mut DynamicZoneMap, config: &ZoneConfig) {
    for (zy, line) in config.layout.iter().enumerate() {
        for (zx, glyph) in line.chars().enumerate() {
            let tile = TileType::from_glyph(glyph).unwrap_or(TileType::FILLER);
            map.set_tile_at(map.zone_to_absolute(zx as i32, zy as i32), tile);
        }
    }

    match config.ground_style {
        GroundStyle::Plain => {}
        GroundStyle::ForestGround => decorate_forest_ground(map, config),
        GroundStyle::Shoreline => decorate_shoreline(map, config),
    }

    for special in &config.special_tiles {
        if let SpecialTile::Terrain { x, y, tile } = special {
            map.set_tile_at(map.zone_to_absolute(*x, *y), *tile);
        }
    }
}

fn zone_cells(config: &ZoneConfig) -> impl Iterator<Item = (i32, i32)> {
    let (width, height) = (config.width as i32, config.height as i32);
    (0..height).flat_map(move |zy| (0..width).map(move |zx| (zx, zy)))
}

/// Scatters dirt and stone over grass with a fixed hash of the
/// zone-relative coordinate, so the pattern survives relayout.
fn decorate_forest_ground(map: &mut DynamicZoneMap, config: &ZoneConfig) {
    for (zx, zy) in zone_cells(config) {
        let pos = map.zone_to_absolute(zx, zy);
        if map.tile_at(pos) != TileType::Grass {
            continue;
        }
        let hash = (zx * 7 + zy * 13 + zx * zy) % 11;
        match hash {
            0 => map.set_tile_at(pos, TileType::Dirt),
            5 => map.set_tile_at(pos, TileType::Stone),
            _ => {}
        }
    }
}

fn decorate_shoreline(map: &mut DynamicZoneMap, config: &ZoneConfig) {
    let mut sand = Vec::new();
    for (zx, zy) in zone_cells(config) {
        let pos = map.zone_to_absolute(zx, zy);
        if map.tile_at(pos) != TileType::Grass {
            continue;
        }
        let touches_water = [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .into_iter()
            .any(|(dx, dy)| map.tile_at(pos.translate(dx, dy)) == TileType::Water);
        if touches_water {
            sand.push(pos);
        }
    }
    for pos in sand {
        map.set_tile_at(pos, TileType::Sand);
    }
}
