use super::TILE_SIZE_PX;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn tiles(self) -> (u32, u32) {
        (
            self.width.div_ceil(TILE_SIZE_PX),
            self.height.div_ceil(TILE_SIZE_PX),
        )
    }
}
