use super::{Position, TileType, Viewport};

pub const TILE_SIZE_PX: u32 = 32;
pub const VIEWPORT_PADDING_TILES: u32 = 2;
/// Minimum filler border (both sides combined) around the zone interior.
pub const ZONE_PADDING_TILES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDescriptor {
    pub width: u32,
    pub height: u32,
    pub zone_origin: Position,
}

/// Grid dimensions for a viewport: large enough to fill the screen and never
/// smaller than the zone plus its filler border. The zone is centered.
pub fn layout(viewport: Viewport, zone_width: u32, zone_height: u32) -> GridDescriptor {
    let width = (viewport.width.div_ceil(TILE_SIZE_PX) + VIEWPORT_PADDING_TILES)
        .max(zone_width + ZONE_PADDING_TILES);
    let height = (viewport.height.div_ceil(TILE_SIZE_PX) + VIEWPORT_PADDING_TILES)
        .max(zone_height + ZONE_PADDING_TILES);
    GridDescriptor {
        width,
        height,
        zone_origin: Position::new(
            ((width - zone_width) / 2) as i32,
            ((height - zone_height) / 2) as i32,
        ),
    }
}

/// Out-of-range reads return filler; out-of-range writes are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicZoneMap {
    width: u32,
    height: u32,
    zone_width: u32,
    zone_height: u32,
    zone_origin: Position,
    tiles: Vec<Vec<TileType>>,
}

impl DynamicZoneMap {
    pub fn new(zone_width: u32, zone_height: u32, viewport: Viewport) -> Self {
        let descriptor = layout(viewport, zone_width, zone_height);
        Self {
            width: descriptor.width,
            height: descriptor.height,
            zone_width,
            zone_height,
            zone_origin: descriptor.zone_origin,
            tiles: filler_grid(descriptor.width, descriptor.height),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn zone_width(&self) -> u32 {
        self.zone_width
    }

    pub fn zone_height(&self) -> u32 {
        self.zone_height
    }

    pub fn zone_origin(&self) -> Position {
        self.zone_origin
    }

    pub fn descriptor(&self) -> GridDescriptor {
        GridDescriptor {
            width: self.width,
            height: self.height,
            zone_origin: self.zone_origin,
        }
    }

    pub fn rows(&self) -> &[Vec<TileType>] {
        &self.tiles
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    pub fn tile_at(&self, pos: Position) -> TileType {
        if !self.contains(pos) {
            return TileType::FILLER;
        }
        self.tiles[pos.y as usize][pos.x as usize]
    }

    pub fn set_tile_at(&mut self, pos: Position, tile: TileType) {
        if !self.contains(pos) {
            return;
        }
        self.tiles[pos.y as usize][pos.x as usize] = tile;
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        self.contains(pos) && self.tile_at(pos).is_walkable()
    }

    pub fn zone_to_absolute(&self, zx: i32, zy: i32) -> Position {
        Position::new(zx + self.zone_origin.x, zy + self.zone_origin.y)
    }

    pub fn absolute_to_zone(&self, pos: Position) -> Option<Position> {
        let relative = Position::new(pos.x - self.zone_origin.x, pos.y - self.zone_origin.y);
        let inside = relative.x >= 0
            && relative.y >= 0
            && (relative.x as u32) < self.zone_width
            && (relative.y as u32) < self.zone_height;
        inside.then_some(relative)
    }

    /// Grows the grid to at least `width x height`. Existing tiles and the
    /// zone origin stay put; new cells are filler. Never shrinks.
    pub fn expand_dimensions(&mut self, width: u32, height: u32) {
        let new_width = width.max(self.width);
        let new_height = height.max(self.height);
        if new_width == self.width && new_height == self.height {
            return;
        }
        for row in &mut self.tiles {
            row.resize(new_width as usize, TileType::FILLER);
        }
        self.tiles
            .resize(new_height as usize, vec![TileType::FILLER; new_width as usize]);
        self.width = new_width;
        self.height = new_height;
    }

    /// Destructive: a changed layout refills the grid and the caller must
    /// repaint its terrain.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        let descriptor = layout(viewport, self.zone_width, self.zone_height);
        if descriptor.width == self.width && descriptor.height == self.height {
            return false;
        }
        self.width = descriptor.width;
        self.height = descriptor.height;
        self.zone_origin = descriptor.zone_origin;
        self.tiles = filler_grid(descriptor.width, descriptor.height);
        true
    }
}

fn filler_grid(width: u32, height: u32) -> Vec<Vec<TileType>> {
    vec![vec![TileType::FILLER; width as usize]; height as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(width: u32, height: u32) -> Viewport {
        Viewport { width, height }
    }

    #[test]
    fn layout_fills_large_viewport() {
        let grid = layout(viewport(1280, 720), 10, 8);
        assert_eq!(grid.width, 1280 / 32 + 2);
        assert_eq!(grid.height, 720 / 32 + 1 + 2);
        assert_eq!(grid.zone_origin, Position::new((42 - 10) / 2, (25 - 8) / 2));
    }

    #[test]
    fn layout_never_smaller_than_zone_plus_padding() {
        let grid = layout(viewport(64, 64), 30, 20);
        assert_eq!(grid.width, 30 + ZONE_PADDING_TILES);
        assert_eq!(grid.height, 20 + ZONE_PADDING_TILES);
        assert_eq!(grid.zone_origin, Position::new(5, 5));
    }

    #[test]
    fn zone_origin_floors_odd_remainders() {
        let grid = layout(viewport(0, 0), 9, 7);
        assert_eq!(grid.width, 19);
        assert_eq!(grid.zone_origin, Position::new(5, 5));
        let wide = layout(viewport(32 * 20, 0), 9, 7);
        assert_eq!(wide.width, 22);
        assert_eq!(wide.zone_origin.x, (22 - 9) / 2);
    }

    #[test]
    fn out_of_bounds_access_is_soft() {
        let mut map = DynamicZoneMap::new(4, 4, viewport(0, 0));
        for pos in [
            Position::new(-1, 0),
            Position::new(0, -1),
            Position::new(i32::MIN, i32::MAX),
            Position::new(map.width() as i32, 0),
            Position::new(0, map.height() as i32),
        ] {
            assert_eq!(map.tile_at(pos), TileType::FILLER);
            assert!(!map.is_walkable(pos));
            map.set_tile_at(pos, TileType::Grass);
        }
        assert!(map
            .rows()
            .iter()
            .flatten()
            .all(|tile| *tile == TileType::FILLER));
    }

    #[test]
    fn zone_translation_round_trips_over_interior() {
        let mut map = DynamicZoneMap::new(6, 3, viewport(800, 600));
        let mut seen = std::collections::HashSet::new();
        for zy in 0..3 {
            for zx in 0..6 {
                let abs = map.zone_to_absolute(zx, zy);
                assert!(seen.insert(abs));
                assert_eq!(map.absolute_to_zone(abs), Some(Position::new(zx, zy)));
                map.set_tile_at(abs, TileType::Dirt);
                assert_eq!(map.tile_at(abs), TileType::Dirt);
            }
        }
        let outside = map.zone_to_absolute(6, 0);
        assert_eq!(map.absolute_to_zone(outside), None);
    }

    #[test]
    fn expand_preserves_tiles_and_fills_new_cells() {
        let mut map = DynamicZoneMap::new(2, 2, viewport(0, 0));
        let anchor = map.zone_to_absolute(1, 1);
        map.set_tile_at(anchor, TileType::Stone);
        let (old_w, old_h) = (map.width(), map.height());

        map.expand_dimensions(old_w + 5, old_h + 3);
        assert_eq!(map.width(), old_w + 5);
        assert_eq!(map.height(), old_h + 3);
        assert_eq!(map.tile_at(anchor), TileType::Stone);
        assert_eq!(
            map.tile_at(Position::new(old_w as i32 + 4, old_h as i32 + 2)),
            TileType::FILLER
        );
        assert!(map.rows().iter().all(|row| row.len() == map.width() as usize));
    }

    #[test]
    fn expand_never_shrinks() {
        let mut map = DynamicZoneMap::new(2, 2, viewport(0, 0));
        let before = map.descriptor();
        map.expand_dimensions(1, 1);
        assert_eq!(map.descriptor(), before);
    }

    #[test]
    fn resize_rebuilds_only_when_dimensions_change() {
        let mut map = DynamicZoneMap::new(4, 4, viewport(320, 320));
        let abs = map.zone_to_absolute(0, 0);
        map.set_tile_at(abs, TileType::Grass);

        assert!(!map.resize(viewport(310, 310)));
        assert_eq!(map.tile_at(abs), TileType::Grass);

        assert!(map.resize(viewport(1280, 960)));
        assert!(map
            .rows()
            .iter()
            .flatten()
            .all(|tile| *tile == TileType::FILLER));
        assert_eq!(map.descriptor(), layout(viewport(1280, 960), 4, 4));
    }
}
