use crate::world::{Position, TILE_SIZE_PX};

pub use crate::world::Viewport;

/// Top-left tile of the camera: the cursor stays centered until the view
/// reaches a map edge, then the camera clamps.
pub fn camera_origin_tiles(
    cursor: Position,
    map_size: (u32, u32),
    view_tiles: (u32, u32),
) -> Position {
    let axis = |cursor: i32, map: u32, view: u32| -> i32 {
        let max_origin = map.saturating_sub(view) as i32;
        (cursor - view as i32 / 2).clamp(0, max_origin)
    };
    Position::new(
        axis(cursor.x, map_size.0, view_tiles.0),
        axis(cursor.y, map_size.1, view_tiles.1),
    )
}

pub fn tile_to_screen_px(tile: Position, camera_origin: Position) -> (i32, i32) {
    let size = TILE_SIZE_PX as i32;
    (
        (tile.x - camera_origin.x) * size,
        (tile.y - camera_origin.y) * size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_is_centered_away_from_edges() {
        let origin = camera_origin_tiles(Position::new(30, 20), (60, 40), (20, 10));
        assert_eq!(origin, Position::new(20, 15));
    }

    #[test]
    fn camera_clamps_at_map_edges() {
        assert_eq!(
            camera_origin_tiles(Position::new(1, 1), (60, 40), (20, 10)),
            Position::new(0, 0)
        );
        assert_eq!(
            camera_origin_tiles(Position::new(59, 39), (60, 40), (20, 10)),
            Position::new(40, 30)
        );
    }

    #[test]
    fn map_smaller_than_view_pins_origin() {
        assert_eq!(
            camera_origin_tiles(Position::new(5, 5), (10, 10), (20, 20)),
            Position::new(0, 0)
        );
    }

    #[test]
    fn tile_screen_position_is_relative_to_camera() {
        assert_eq!(
            tile_to_screen_px(Position::new(12, 7), Position::new(10, 5)),
            (64, 64)
        );
    }
}
