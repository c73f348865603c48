use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    #[default]
    Water,
    Grass,
    Dirt,
    Stone,
    Tree,
    Path,
    Sand,
    Flowers,
    Bridge,
    Wall,
}

impl TileType {
    /// Terrain used for every cell outside the playable interior.
    pub const FILLER: TileType = TileType::Water;

    pub const fn name(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Grass => "grass",
            Self::Dirt => "dirt",
            Self::Stone => "stone",
            Self::Tree => "tree",
            Self::Path => "path",
            Self::Sand => "sand",
            Self::Flowers => "flowers",
            Self::Bridge => "bridge",
            Self::Wall => "wall",
        }
    }

    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Water | Self::Tree | Self::Wall)
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        let tile = match glyph {
            '~' => Self::Water,
            '.' => Self::Grass,
            ':' => Self::Dirt,
            'o' => Self::Stone,
            'T' => Self::Tree,
            '=' => Self::Path,
            ',' => Self::Sand,
            '*' => Self::Flowers,
            '+' => Self::Bridge,
            '#' => Self::Wall,
            _ => return None,
        };
        Some(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_tree_and_wall_block_movement() {
        for tile in [TileType::Water, TileType::Tree, TileType::Wall] {
            assert!(!tile.is_walkable(), "{} should block", tile.name());
        }
        for tile in [
            TileType::Grass,
            TileType::Dirt,
            TileType::Stone,
            TileType::Path,
            TileType::Sand,
            TileType::Flowers,
            TileType::Bridge,
        ] {
            assert!(tile.is_walkable(), "{} should be walkable", tile.name());
        }
    }

    #[test]
    fn glyph_lookup_known_and_unknown() {
        assert_eq!(TileType::from_glyph('~'), Some(TileType::Water));
        assert_eq!(TileType::from_glyph('='), Some(TileType::Path));
        assert_eq!(TileType::from_glyph('?'), None);
    }

    #[test]
    fn filler_is_water() {
        assert_eq!(TileType::FILLER, TileType::Water);
    }
}
