mod catalog;
mod loader;
mod registry;
mod types;

pub use catalog::GameCatalog;
pub use loader::{
    load_content_bundle, ContentBundle, ContentLoadError, CUTSCENES_FILE, GAMES_FILE, ZONES_FILE,
};
pub use registry::{ZoneLookupError, ZoneProvider, ZoneRegistry};
pub use types::{
    EventConfig, EventTrigger, GameConfig, GateConfig, GroundStyle, LevelConfig, NpcConfig,
    NpcTrigger, SpecialTile, TextLabelConfig, ZoneConfig,
};
