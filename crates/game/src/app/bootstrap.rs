use std::env;

use engine::{
    load_content_bundle, AppError, AppPaths, ContentBundle, ContentLoadError, CutsceneService,
    FeatureFlags, GameConfig, GameSession, JsonFileStore, SessionError, SessionSetup,
    StartupError, StateStore, Viewport, SELECTED_GAME_KEY,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub(crate) const GAME_ENV_VAR: &str = "KEYQUEST_GAME";
pub(crate) const LEVEL_ENV_VAR: &str = "KEYQUEST_LEVEL";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Content(#[from] ContentLoadError),
    #[error("content defines no games")]
    NoGames,
    #[error("unknown game '{game_id}' (set {env_var} to one of the ids in games.json)")]
    UnknownGame {
        game_id: String,
        env_var: &'static str,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    App(#[from] AppError),
}

/// Game and level the player asked for, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Selection {
    pub(crate) game: Option<String>,
    pub(crate) level: Option<String>,
}

impl Selection {
    pub(crate) fn from_env() -> Self {
        Self {
            game: non_empty_env(GAME_ENV_VAR),
            level: non_empty_env(LEVEL_ENV_VAR),
        }
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Loaded content plus the paths and flags every entry point shares.
pub(crate) struct Wiring {
    pub(crate) paths: AppPaths,
    pub(crate) content: ContentBundle,
    pub(crate) flags: FeatureFlags,
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn load(paths: AppPaths, flags: FeatureFlags) -> Result<Wiring, BootstrapError> {
    info!(
        root = %paths.root.display(),
        content_dir = %paths.content_dir.display(),
        save_dir = %paths.save_dir.display(),
        "startup"
    );
    let content = load_content_bundle(&paths.content_dir)?;
    Ok(Wiring {
        paths,
        content,
        flags,
    })
}

impl Wiring {
    pub(crate) fn file_store(&self) -> Box<dyn StateStore> {
        Box::new(JsonFileStore::new(self.paths.state_file()))
    }

    pub(crate) fn cutscene_service(&self, store: Box<dyn StateStore>) -> CutsceneService {
        CutsceneService::new(self.flags.clone(), self.content.cutscenes.clone(), store)
    }

    pub(crate) fn start_session(
        &self,
        selection: &Selection,
        store: Box<dyn StateStore>,
        viewport: Viewport,
    ) -> Result<GameSession, BootstrapError> {
        let game = self
            .select_game(selection.game.as_deref(), store.as_ref())?
            .clone();
        let setup = SessionSetup {
            game,
            zones: self.content.zones.clone(),
            cutscenes: self.cutscene_service(store),
            requested_level: selection.level.clone(),
            viewport,
        };
        Ok(GameSession::start(setup)?)
    }

    /// Requested game, else the persisted selection, else the first game.
    fn select_game(
        &self,
        requested: Option<&str>,
        store: &dyn StateStore,
    ) -> Result<&GameConfig, BootstrapError> {
        let games = &self.content.games;
        if let Some(game_id) = requested {
            return games
                .game(game_id)
                .ok_or_else(|| BootstrapError::UnknownGame {
                    game_id: game_id.to_string(),
                    env_var: GAME_ENV_VAR,
                });
        }

        let persisted = match store.read(SELECTED_GAME_KEY) {
            Ok(value) => value.and_then(|value| value.as_str().map(str::to_string)),
            Err(error) => {
                warn!(error = %error, "selected_game_read_failed");
                None
            }
        };
        if let Some(game) = persisted.as_deref().and_then(|game_id| games.game(game_id)) {
            return Ok(game);
        }
        games.first().ok_or(BootstrapError::NoGames)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use engine::{app_paths_for_root, FeatureFlag, MemoryStore};
    use serde_json::json;

    use super::*;

    pub(crate) fn repo_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
    }

    pub(crate) fn shipped_wiring(flags: FeatureFlags) -> Wiring {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut paths = app_paths_for_root(temp.path().to_path_buf()).expect("paths");
        paths.content_dir = repo_root().join("assets").join("content");
        load(paths, flags).expect("shipped content loads")
    }

    #[test]
    fn shipped_content_passes_validation() {
        let wiring = shipped_wiring(FeatureFlags::new());
        assert_eq!(wiring.content.games.len(), 1);
        assert_eq!(wiring.content.zones.len(), 3);
        assert_eq!(wiring.content.cutscenes.len(), 5);
    }

    #[test]
    fn selection_falls_back_to_first_game() {
        let wiring = shipped_wiring(FeatureFlags::new());
        let session = wiring
            .start_session(
                &Selection::default(),
                Box::new(MemoryStore::new()),
                Viewport::default(),
            )
            .expect("session");
        assert_eq!(session.game().id, "keyquest");
        assert_eq!(session.level_state().level().id, "meadow");
        assert_eq!(session.current_zone().zone_id(), "first-steps");
    }

    #[test]
    fn requested_level_is_honored() {
        let wiring = shipped_wiring(FeatureFlags::new());
        let selection = Selection {
            game: Some("keyquest".to_string()),
            level: Some("forest".to_string()),
        };
        let session = wiring
            .start_session(&selection, Box::new(MemoryStore::new()), Viewport::default())
            .expect("session");
        assert_eq!(session.current_zone().zone_id(), "count-grove");
    }

    #[test]
    fn unknown_requested_game_fails() {
        let wiring = shipped_wiring(FeatureFlags::new());
        let selection = Selection {
            game: Some("tetris".to_string()),
            level: None,
        };
        let error = wiring
            .start_session(&selection, Box::new(MemoryStore::new()), Viewport::default())
            .expect_err("unknown game");
        assert!(matches!(error, BootstrapError::UnknownGame { game_id, .. } if game_id == "tetris"));
    }

    #[test]
    fn stale_persisted_game_is_ignored() {
        let wiring = shipped_wiring(FeatureFlags::new());
        let mut store = MemoryStore::new();
        store
            .write(SELECTED_GAME_KEY, json!("retired-game"))
            .expect("seed");
        let session = wiring
            .start_session(&Selection::default(), Box::new(store), Viewport::default())
            .expect("session");
        assert_eq!(session.game().id, "keyquest");
    }

    #[test]
    fn origin_cutscene_plays_first_unless_disabled() {
        let wiring = shipped_wiring(FeatureFlags::new());
        let session = wiring
            .start_session(
                &Selection::default(),
                Box::new(MemoryStore::new()),
                Viewport::default(),
            )
            .expect("session");
        assert_eq!(
            session.active_cutscene().map(|story| story.identifier()),
            Some("keyquest:origin".to_string())
        );

        let quiet = shipped_wiring(FeatureFlags::new().with(FeatureFlag::OriginStoryCutscenes, false));
        let session = quiet
            .start_session(
                &Selection::default(),
                Box::new(MemoryStore::new()),
                Viewport::default(),
            )
            .expect("session");
        assert!(session.active_cutscene().is_none());
    }
}
