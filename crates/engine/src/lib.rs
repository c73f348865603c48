pub mod app;
pub mod config;
pub mod content;
pub mod cutscene;
pub mod paths;
pub mod progression;
pub mod session;
pub mod world;

pub use app::{apply_input, run_app, AppError, GameInput, InputEffect, LoopConfig, Renderer};
pub use config::{FeatureFlag, FeatureFlags, FEATURES_ENV_VAR};
pub use content::{
    load_content_bundle, ContentBundle, ContentLoadError, GameCatalog, GameConfig, LevelConfig,
    ZoneConfig, ZoneLookupError, ZoneProvider, ZoneRegistry,
};
pub use cutscene::{
    CutsceneLibrary, CutsceneProvider, CutsceneService, JsonFileStore, MemoryStore, StateStore,
    StoreError, Story, StoryEntry, StoryError, StoryKey, StoryKind, StoryScope,
    CUTSCENE_STATE_KEY,
};
pub use paths::{
    app_paths_for_root, resolve_app_paths, AppPaths, StartupError, ROOT_ENV_VAR, STATE_FILE_NAME,
};
pub use progression::{LevelGameState, LevelSetupError, ProgressionError, ProgressionOutcome};
pub use session::{
    DialogueView, GameSession, RenderSnapshot, SessionError, SessionSetup, TurnOutcome,
    SELECTED_GAME_KEY, SELECTED_LEVEL_KEY,
};
pub use world::{
    DynamicZoneMap, Gate, GridDescriptor, Position, TileType, UnlockConditions, Viewport, Zone,
    ZoneBuildError,
};
