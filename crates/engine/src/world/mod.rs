mod gate;
mod map;
mod position;
mod tile;
mod viewport;
mod zone;

pub use gate::{Gate, UnlockConditions};
pub use map::{layout, DynamicZoneMap, GridDescriptor, TILE_SIZE_PX, ZONE_PADDING_TILES};
pub use position::Position;
pub use tile::TileType;
pub use viewport::Viewport;
pub use zone::{
    ActiveNpc, CollectibleKey, KeyCollection, TextLabel, VimKey, Zone, ZoneBuildError,
};
