mod input;
mod loop_runner;
mod metrics;
mod rendering;

pub use input::{apply_input, GameInput, InputEffect};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{camera_origin_tiles, tile_to_screen_px, Renderer, Viewport};
