use std::collections::HashSet;

use super::loader::ContentLoadError;
use super::registry::ZoneProvider;
use super::types::GameConfig;

/// Games in content order, checked against the zone provider so every
/// level refers only to zones that exist.
#[derive(Debug, Clone, Default)]
pub struct GameCatalog {
    games: Vec<GameConfig>,
}

impl GameCatalog {
    pub fn from_configs(
        games: Vec<GameConfig>,
        zones: &dyn ZoneProvider,
    ) -> Result<Self, ContentLoadError> {
        let mut game_ids = HashSet::new();
        for game in &games {
            if game.id.is_empty() || game.name.is_empty() {
                return Err(ContentLoadError::InvalidGame {
                    game_id: game.id.clone(),
                    reason: "id and name must not be empty",
                });
            }
            if !game_ids.insert(game.id.as_str()) {
                return Err(ContentLoadError::DuplicateGame {
                    game_id: game.id.clone(),
                });
            }
            if game.levels.is_empty() {
                return Err(ContentLoadError::InvalidGame {
                    game_id: game.id.clone(),
                    reason: "has no levels",
                });
            }
            validate_levels(game, zones)?;
        }
        Ok(Self { games })
    }

    pub fn games(&self) -> &[GameConfig] {
        &self.games
    }

    pub fn game(&self, game_id: &str) -> Option<&GameConfig> {
        self.games.iter().find(|game| game.id == game_id)
    }

    pub fn first(&self) -> Option<&GameConfig> {
        self.games.first()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

fn validate_levels(game: &GameConfig, zones: &dyn ZoneProvider) -> Result<(), ContentLoadError> {
    let mut level_ids = HashSet::new();
    for level in &game.levels {
        let invalid = |reason| ContentLoadError::InvalidLevel {
            game_id: game.id.clone(),
            level_id: level.id.clone(),
            reason,
        };
        if level.id.is_empty() || level.name.is_empty() {
            return Err(invalid("id and name must not be empty"));
        }
        if level.zones.is_empty() {
            return Err(invalid("has no zones"));
        }
        if !level_ids.insert(level.id.as_str()) {
            return Err(invalid("duplicate level id"));
        }
        if let Some(zone_id) = level.zones.iter().find(|zone_id| !zones.has_zone(zone_id)) {
            return Err(ContentLoadError::UnknownZoneReference {
                game_id: game.id.clone(),
                level_id: level.id.clone(),
                zone_id: zone_id.clone(),
            });
        }
    }
    Ok(())
}
