mod renderer;
mod text;
mod transform;

pub(crate) use renderer::DebugOverlay;
pub use renderer::Renderer;
pub use transform::{camera_origin_tiles, tile_to_screen_px, Viewport};
