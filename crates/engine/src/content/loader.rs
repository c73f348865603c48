use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::cutscene::{CutsceneLibrary, CutsceneProvider, StoryEntry, StoryError};
use crate::world::ZoneBuildError;

use super::catalog::GameCatalog;
use super::registry::ZoneRegistry;
use super::types::{GameConfig, ZoneConfig};

pub const ZONES_FILE: &str = "zones.json";
pub const GAMES_FILE: &str = "games.json";
pub const CUTSCENES_FILE: &str = "cutscenes.json";

#[derive(Debug, Error)]
pub enum ContentLoadError {
    #[error("failed to read content file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse content file '{path}' at {location}: {source}")]
    Parse {
        path: PathBuf,
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Zone(#[from] ZoneBuildError),
    #[error("duplicate zone id '{zone_id}'")]
    DuplicateZone { zone_id: String },
    #[error("duplicate game id '{game_id}'")]
    DuplicateGame { game_id: String },
    #[error("game '{game_id}' {reason}")]
    InvalidGame {
        game_id: String,
        reason: &'static str,
    },
    #[error("level '{level_id}' of game '{game_id}' {reason}")]
    InvalidLevel {
        game_id: String,
        level_id: String,
        reason: &'static str,
    },
    #[error("level '{level_id}' of game '{game_id}' refers to unknown zone '{zone_id}'")]
    UnknownZoneReference {
        game_id: String,
        level_id: String,
        zone_id: String,
    },
    #[error("invalid cutscene content: {0}")]
    Story(#[from] StoryError),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ZonesFile {
    zones: Vec<ZoneConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GamesFile {
    games: Vec<GameConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CutscenesFile {
    stories: Vec<StoryEntry>,
}

#[derive(Debug, Clone)]
pub struct ContentBundle {
    pub zones: Arc<ZoneRegistry>,
    pub games: GameCatalog,
    pub cutscenes: Arc<CutsceneLibrary>,
}

pub fn load_content_bundle(content_dir: &Path) -> Result<ContentBundle, ContentLoadError> {
    let zones_file: ZonesFile = read_json(&content_dir.join(ZONES_FILE))?;
    let games_file: GamesFile = read_json(&content_dir.join(GAMES_FILE))?;
    let cutscenes_file: CutscenesFile = read_json(&content_dir.join(CUTSCENES_FILE))?;

    let zones = ZoneRegistry::from_configs(zones_file.zones)?;
    let games = GameCatalog::from_configs(games_file.games, &zones)?;
    let cutscenes = CutsceneLibrary::from_entries(cutscenes_file.stories)?;

    for story in orphan_story_ids(&cutscenes, &games) {
        warn!(story = %story, "cutscene_story_unknown_game");
    }

    info!(
        content_dir = %content_dir.display(),
        zones = zones.len(),
        games = games.len(),
        stories = cutscenes.len(),
        "content_loaded"
    );

    Ok(ContentBundle {
        zones: Arc::new(zones),
        games,
        cutscenes: Arc::new(cutscenes),
    })
}

fn orphan_story_ids(library: &CutsceneLibrary, games: &GameCatalog) -> Vec<String> {
    library
        .all_stories()
        .into_iter()
        .filter(|story| games.game(story.game_id()).is_none())
        .map(|story| story.identifier())
        .collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ContentLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| ContentLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let location = error.path().to_string();
        ContentLoadError::Parse {
            path: path.to_path_buf(),
            location: if location.is_empty() {
                ".".to_string()
            } else {
                location
            },
            source: error.into_inner(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ZoneProvider;
    use serde_json::json;

    fn write(dir: &Path, name: &str, value: serde_json::Value) {
        fs::write(dir.join(name), value.to_string()).expect("write fixture");
    }

    fn seed_valid(dir: &Path) {
        write(
            dir,
            ZONES_FILE,
            json!({"zones": [{
                "zoneId": "z1", "name": "First", "width": 3, "height": 1,
                "layout": ["..."], "start": {"x": 0, "y": 0},
                "specialTiles": [{"type": "vim_key", "x": 1, "y": 0, "key": "l"}],
                "gate": {"x": 2, "y": 0, "unlockConditions": {"collectedVimKeys": ["l"]}}
            }]}),
        );
        write(
            dir,
            GAMES_FILE,
            json!({"games": [{"id": "g", "name": "Game", "levels": [
                {"id": "l1", "name": "One", "zones": ["z1"]}
            ]}]}),
        );
        write(
            dir,
            CUTSCENES_FILE,
            json!({"stories": [{"gameId": "g", "type": "origin", "script": ["Hello"]}]}),
        );
    }

    #[test]
    fn loads_valid_bundle() {
        let temp = tempfile::tempdir().expect("tempdir");
        seed_valid(temp.path());
        let bundle = load_content_bundle(temp.path()).expect("bundle");
        assert!(bundle.zones.has_zone("z1"));
        assert_eq!(bundle.games.len(), 1);
        assert_eq!(bundle.cutscenes.len(), 1);
    }

    #[test]
    fn missing_file_reports_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let error = load_content_bundle(temp.path()).expect_err("missing");
        match error {
            ContentLoadError::Read { path, .. } => assert!(path.ends_with(ZONES_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_error_includes_json_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        seed_valid(temp.path());
        write(
            temp.path(),
            ZONES_FILE,
            json!({"zones": [{
                "zoneId": "z1", "name": "First", "width": "wide", "height": 1,
                "layout": ["..."], "start": {"x": 0, "y": 0}
            }]}),
        );
        let error = load_content_bundle(temp.path()).expect_err("bad width");
        let message = error.to_string();
        assert!(message.contains("zones[0].width"), "{message}");
    }

    #[test]
    fn unknown_tile_tag_is_a_parse_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        seed_valid(temp.path());
        write(
            temp.path(),
            ZONES_FILE,
            json!({"zones": [{
                "zoneId": "z1", "name": "First", "width": 3, "height": 1,
                "layout": ["..."], "start": {"x": 0, "y": 0},
                "specialTiles": [{"type": "teleporter", "x": 1, "y": 0}]
            }]}),
        );
        assert!(matches!(
            load_content_bundle(temp.path()),
            Err(ContentLoadError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_story_fails_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        seed_valid(temp.path());
        write(
            temp.path(),
            CUTSCENES_FILE,
            json!({"stories": [{"gameId": "g", "type": "level", "script": ["x"]}]}),
        );
        assert!(matches!(
            load_content_bundle(temp.path()),
            Err(ContentLoadError::Story(StoryError::MissingLevelForLevelStory))
        ));
    }
}
