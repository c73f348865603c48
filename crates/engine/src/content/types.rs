use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::world::{Position, TileType, UnlockConditions};

/// Declarative description of one zone. Coordinates are zone-relative; the
/// zone builder converts them to absolute map positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ZoneConfig {
    pub zone_id: String,
    pub name: String,
    #[serde(default)]
    pub biome: String,
    #[serde(default)]
    pub skill_focus: Vec<String>,
    #[serde(default)]
    pub puzzle_theme: String,
    #[serde(default)]
    pub narration: Vec<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub ground_style: GroundStyle,
    /// One string per row, one glyph per tile (see [`TileType::from_glyph`]).
    pub layout: Vec<String>,
    pub start: Position,
    #[serde(default)]
    pub special_tiles: Vec<SpecialTile>,
    #[serde(default)]
    pub text_labels: Vec<TextLabelConfig>,
    #[serde(default)]
    pub gate: Option<GateConfig>,
    #[serde(default)]
    pub npcs: Vec<NpcConfig>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundStyle {
    #[default]
    Plain,
    ForestGround,
    Shoreline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum SpecialTile {
    VimKey {
        x: i32,
        y: i32,
        key: String,
        #[serde(default)]
        description: String,
    },
    CollectibleKey {
        x: i32,
        y: i32,
        id: String,
        name: String,
    },
    Terrain {
        x: i32,
        y: i32,
        tile: TileType,
    },
}

impl SpecialTile {
    pub fn position(&self) -> Position {
        match self {
            Self::VimKey { x, y, .. }
            | Self::CollectibleKey { x, y, .. }
            | Self::Terrain { x, y, .. } => Position::new(*x, *y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextLabelConfig {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GateConfig {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub unlock_conditions: UnlockConditions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NpcConfig {
    pub id: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub dialogue: Vec<String>,
    #[serde(default)]
    pub appears_when: NpcTrigger,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum NpcTrigger {
    #[default]
    Always,
    AfterKeys {
        keys: Vec<String>,
    },
    AfterZoneComplete,
}

impl NpcTrigger {
    pub fn is_satisfied(&self, collected_keys: &BTreeSet<String>, zone_complete: bool) -> bool {
        match self {
            Self::Always => true,
            Self::AfterKeys { keys } => keys.iter().all(|key| collected_keys.contains(key)),
            Self::AfterZoneComplete => zone_complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    pub id: String,
    pub trigger: EventTrigger,
    #[serde(default)]
    pub narration: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum EventTrigger {
    OnEnter,
    OnKeyCollected { key: String },
    OnGateOpened,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelConfig {
    pub id: String,
    pub name: String,
    pub zones: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub levels: Vec<LevelConfig>,
}

impl GameConfig {
    pub fn level(&self, level_id: &str) -> Option<&LevelConfig> {
        self.levels.iter().find(|level| level.id == level_id)
    }

    pub fn level_index(&self, level_id: &str) -> Option<usize> {
        self.levels.iter().position(|level| level.id == level_id)
    }
}
