use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::metrics::LoopMetricsSnapshot;
use crate::session::RenderSnapshot;
use crate::world::{Position, TileType, TILE_SIZE_PX};

use super::text::{
    draw_filled_rect, draw_rect_outline, draw_text_clipped, text_width_px, wrap_text,
    GLYPH_ADVANCE, GLYPH_HEIGHT, LINE_ADVANCE, TEXT_SCALE,
};
use super::transform::{camera_origin_tiles, tile_to_screen_px};
use super::Viewport;

const CLEAR_COLOR: [u8; 4] = [16, 18, 24, 255];
const TILE: i32 = TILE_SIZE_PX as i32;
const GLYPH_PX_HEIGHT: i32 = GLYPH_HEIGHT * TEXT_SCALE;

const KEY_COLOR: [u8; 4] = [250, 204, 60, 255];
const KEY_BORDER_COLOR: [u8; 4] = [150, 110, 20, 255];
const KEY_TEXT_COLOR: [u8; 4] = [40, 30, 10, 255];
const COLLECTIBLE_COLOR: [u8; 4] = [200, 120, 230, 255];
const NPC_COLOR: [u8; 4] = [90, 200, 220, 255];
const NPC_TEXT_COLOR: [u8; 4] = [10, 40, 50, 255];
const GATE_CLOSED_COLOR: [u8; 4] = [130, 70, 40, 255];
const GATE_BAR_COLOR: [u8; 4] = [70, 35, 20, 255];
const GATE_OPEN_COLOR: [u8; 4] = [250, 230, 150, 255];
const CURSOR_COLOR: [u8; 4] = [240, 240, 255, 255];
const CURSOR_BORDER_COLOR: [u8; 4] = [20, 20, 30, 255];
const LABEL_BG_COLOR: [u8; 4] = [0, 0, 0, 150];
const TEXT_COLOR: [u8; 4] = [230, 230, 230, 255];
const ACCENT_TEXT_COLOR: [u8; 4] = [255, 214, 90, 255];
const HINT_TEXT_COLOR: [u8; 4] = [150, 160, 175, 255];
const PANEL_BG_COLOR: [u8; 4] = [10, 12, 18, 225];
const PANEL_BORDER_COLOR: [u8; 4] = [90, 100, 120, 255];
const CUTSCENE_DIM_COLOR: [u8; 4] = [0, 0, 0, 170];

const PANEL_INSET: i32 = 6;
const SCREEN_MARGIN: i32 = 12;
const BOTTOM_PANEL_MAX_LINES: usize = 5;
const MESSAGE_LINES_SHOWN: usize = 3;
const DIALOGUE_PANEL_MAX_WIDTH: i32 = 520;
const CUTSCENE_PANEL_MAX_WIDTH: i32 = 640;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DebugOverlay {
    pub(crate) metrics: LoopMetricsSnapshot,
    pub(crate) render_fps_cap: Option<u32>,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render(
        &mut self,
        snapshot: &RenderSnapshot<'_>,
        overlay: Option<&DebugOverlay>,
    ) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        draw_scene(self.pixels.frame_mut(), self.viewport, snapshot, overlay);
        self.pixels.render()
    }
}

struct Canvas<'f> {
    frame: &'f mut [u8],
    width: u32,
    height: u32,
    camera: Position,
}

impl Canvas<'_> {
    fn fill(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        draw_filled_rect(self.frame, self.width, self.height, x, y, w, h, color);
    }

    fn outline(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        draw_rect_outline(self.frame, self.width, self.height, x, y, w, h, color);
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: [u8; 4]) {
        draw_text_clipped(self.frame, self.width, self.height, x, y, text, color);
    }

    fn panel(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.fill(x, y, w, h, PANEL_BG_COLOR);
        self.outline(x, y, w, h, PANEL_BORDER_COLOR);
    }

    fn tile_origin(&self, tile: Position) -> (i32, i32) {
        tile_to_screen_px(tile, self.camera)
    }

    fn tile_caption(&mut self, tile: Position, text: &str, color: [u8; 4]) {
        let (x, y) = self.tile_origin(tile);
        let text_w = text_width_px(text) - TEXT_SCALE;
        self.text(
            x + (TILE - text_w) / 2,
            y + (TILE - GLYPH_PX_HEIGHT) / 2,
            text,
            color,
        );
    }

    fn chars_per_line(panel_width: i32) -> usize {
        ((panel_width - PANEL_INSET * 2) / GLYPH_ADVANCE).max(1) as usize
    }
}

pub(crate) fn draw_scene(
    frame: &mut [u8],
    viewport: Viewport,
    snapshot: &RenderSnapshot<'_>,
    overlay: Option<&DebugOverlay>,
) {
    if viewport.width == 0 || viewport.height == 0 {
        return;
    }
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&CLEAR_COLOR);
    }

    let camera = camera_origin_tiles(
        snapshot.cursor,
        (snapshot.map.width(), snapshot.map.height()),
        viewport.tiles(),
    );
    let mut canvas = Canvas {
        frame,
        width: viewport.width,
        height: viewport.height,
        camera,
    };

    draw_tiles(&mut canvas, snapshot, viewport);
    draw_gate(&mut canvas, snapshot);
    draw_pickups(&mut canvas, snapshot);
    draw_npcs(&mut canvas, snapshot);
    draw_labels(&mut canvas, snapshot);
    draw_cursor(&mut canvas, snapshot.cursor);

    draw_hud(&mut canvas, snapshot);
    draw_message_panel(&mut canvas, snapshot);
    if let Some(dialogue) = &snapshot.dialogue {
        draw_dialogue(&mut canvas, dialogue.speaker, dialogue.lines);
    }
    if snapshot.game_complete {
        draw_banner(&mut canvas, "QUEST COMPLETE!", "Esc to quit");
    }
    if let Some(overlay) = overlay {
        draw_debug_overlay(&mut canvas, snapshot, overlay);
    }
    if let Some(story) = snapshot.cutscene {
        draw_cutscene(&mut canvas, &story.kind().to_string(), story.script());
    }
}

fn draw_tiles(canvas: &mut Canvas<'_>, snapshot: &RenderSnapshot<'_>, viewport: Viewport) {
    let (view_w, view_h) = viewport.tiles();
    for row in 0..view_h as i32 {
        for col in 0..view_w as i32 {
            let pos = Position::new(canvas.camera.x + col, canvas.camera.y + row);
            if !snapshot.map.contains(pos) {
                continue;
            }
            let (x, y) = canvas.tile_origin(pos);
            draw_tile(canvas, x, y, snapshot.map.tile_at(pos), pos);
        }
    }
}

fn tile_color(tile: TileType) -> [u8; 4] {
    match tile {
        TileType::Water => [40, 90, 170, 255],
        TileType::Grass => [74, 140, 60, 255],
        TileType::Dirt => [120, 90, 60, 255],
        TileType::Stone => [118, 120, 128, 255],
        TileType::Tree => [52, 110, 48, 255],
        TileType::Path => [170, 150, 100, 255],
        TileType::Sand => [214, 194, 134, 255],
        TileType::Flowers => [84, 150, 66, 255],
        TileType::Bridge => [140, 100, 60, 255],
        TileType::Wall => [70, 70, 82, 255],
    }
}

fn draw_tile(canvas: &mut Canvas<'_>, x: i32, y: i32, tile: TileType, pos: Position) {
    canvas.fill(x, y, TILE, TILE, tile_color(tile));
    match tile {
        TileType::Water if (pos.x + pos.y) % 2 == 0 => {
            canvas.fill(x + 6, y + 12, 12, 2, [90, 140, 210, 255]);
        }
        TileType::Tree => {
            canvas.fill(x + 13, y + 20, 6, 10, [90, 60, 30, 255]);
            canvas.fill(x + 5, y + 3, 22, 18, [24, 70, 30, 255]);
        }
        TileType::Stone => canvas.fill(x + 8, y + 8, 16, 14, [150, 152, 160, 255]),
        TileType::Flowers => {
            canvas.fill(x + 6, y + 6, 4, 4, [240, 90, 110, 255]);
            canvas.fill(x + 20, y + 10, 4, 4, [250, 230, 90, 255]);
            canvas.fill(x + 12, y + 22, 4, 4, [230, 230, 250, 255]);
        }
        TileType::Bridge => {
            for plank in 0..4 {
                canvas.fill(x, y + 3 + plank * 8, TILE, 1, [90, 60, 35, 255]);
            }
        }
        TileType::Wall => {
            canvas.fill(x, y + 15, TILE, 2, [50, 50, 60, 255]);
            canvas.fill(x + 15, y, 2, 15, [50, 50, 60, 255]);
        }
        _ => {}
    }
}

fn draw_gate(canvas: &mut Canvas<'_>, snapshot: &RenderSnapshot<'_>) {
    let Some(gate) = snapshot.gate else {
        return;
    };
    let (x, y) = canvas.tile_origin(gate.position());
    if gate.is_open() {
        canvas.outline(x + 2, y + 2, TILE - 4, TILE - 4, GATE_OPEN_COLOR);
        canvas.outline(x + 3, y + 3, TILE - 6, TILE - 6, GATE_OPEN_COLOR);
        return;
    }
    canvas.fill(x + 2, y + 2, TILE - 4, TILE - 4, GATE_CLOSED_COLOR);
    for bar in 0..3 {
        canvas.fill(x + 7 + bar * 8, y + 2, 2, TILE - 4, GATE_BAR_COLOR);
    }
    if snapshot.gate_ready {
        canvas.outline(x, y, TILE, TILE, GATE_OPEN_COLOR);
    }
}

fn draw_pickups(canvas: &mut Canvas<'_>, snapshot: &RenderSnapshot<'_>) {
    for vim_key in snapshot.vim_keys {
        let (x, y) = canvas.tile_origin(vim_key.position);
        canvas.fill(x + 5, y + 5, TILE - 10, TILE - 10, KEY_COLOR);
        canvas.outline(x + 5, y + 5, TILE - 10, TILE - 10, KEY_BORDER_COLOR);
        canvas.tile_caption(vim_key.position, &vim_key.key, KEY_TEXT_COLOR);
    }
    for collectible in snapshot.collectibles {
        let (x, y) = canvas.tile_origin(collectible.position);
        canvas.fill(x + 10, y + 8, TILE - 20, TILE - 16, COLLECTIBLE_COLOR);
        canvas.fill(x + 8, y + 10, TILE - 16, TILE - 20, COLLECTIBLE_COLOR);
    }
}

fn draw_npcs(canvas: &mut Canvas<'_>, snapshot: &RenderSnapshot<'_>) {
    for npc in &snapshot.npcs {
        let (x, y) = canvas.tile_origin(npc.position);
        canvas.fill(x + 6, y + 4, TILE - 12, TILE - 8, NPC_COLOR);
        let initial: String = npc.name.chars().take(1).collect();
        canvas.tile_caption(npc.position, &initial, NPC_TEXT_COLOR);
    }
}

fn draw_labels(canvas: &mut Canvas<'_>, snapshot: &RenderSnapshot<'_>) {
    for label in snapshot.text_labels {
        let (x, y) = canvas.tile_origin(label.position);
        let text_y = y + (TILE - GLYPH_PX_HEIGHT) / 2;
        canvas.fill(
            x - 2,
            text_y - 3,
            text_width_px(&label.text) + 2,
            GLYPH_PX_HEIGHT + 6,
            LABEL_BG_COLOR,
        );
        canvas.text(x, text_y, &label.text, TEXT_COLOR);
    }
}

fn draw_cursor(canvas: &mut Canvas<'_>, cursor: Position) {
    let (x, y) = canvas.tile_origin(cursor);
    canvas.outline(x + 2, y + 2, TILE - 4, TILE - 4, CURSOR_BORDER_COLOR);
    canvas.fill(x + 3, y + 3, TILE - 6, TILE - 6, CURSOR_COLOR);
}

fn hud_lines(snapshot: &RenderSnapshot<'_>) -> [String; 2] {
    let keys = if snapshot.collected_keys.is_empty() {
        "-".to_string()
    } else {
        snapshot
            .collected_keys
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let gate = match snapshot.gate {
        None => "none",
        Some(gate) if gate.is_open() => "open",
        Some(_) if snapshot.gate_ready => "ready",
        Some(_) => "locked",
    };
    let mut status = format!("Keys: {keys}   Gate: {gate}");
    if let Some(count) = snapshot.pending_count {
        status.push_str(&format!("   Count: {count}"));
    }
    [
        format!(
            "{} > {} > {}",
            snapshot.game_name, snapshot.level_name, snapshot.zone_name
        ),
        status,
    ]
}

fn draw_hud(canvas: &mut Canvas<'_>, snapshot: &RenderSnapshot<'_>) {
    let [title, status] = hud_lines(snapshot);
    let height = LINE_ADVANCE * 2 + PANEL_INSET * 2;
    canvas.panel(0, 0, canvas.width as i32, height);
    canvas.text(SCREEN_MARGIN, PANEL_INSET + 2, &title, ACCENT_TEXT_COLOR);
    canvas.text(
        SCREEN_MARGIN,
        PANEL_INSET + 2 + LINE_ADVANCE,
        &status,
        TEXT_COLOR,
    );
}

fn message_panel_lines(snapshot: &RenderSnapshot<'_>, max_chars: usize) -> Vec<String> {
    let recent = snapshot
        .messages
        .len()
        .saturating_sub(MESSAGE_LINES_SHOWN);
    let lines: Vec<String> = snapshot
        .narration
        .iter()
        .chain(&snapshot.messages[recent..])
        .flat_map(|line| wrap_text(line, max_chars))
        .collect();
    let overflow = lines.len().saturating_sub(BOTTOM_PANEL_MAX_LINES);
    lines[overflow..].to_vec()
}

fn draw_message_panel(canvas: &mut Canvas<'_>, snapshot: &RenderSnapshot<'_>) {
    let width = canvas.width as i32;
    let lines = message_panel_lines(snapshot, Canvas::chars_per_line(width - SCREEN_MARGIN));
    if lines.is_empty() {
        return;
    }
    let height = lines.len() as i32 * LINE_ADVANCE + PANEL_INSET * 2;
    let top = canvas.height as i32 - height;
    canvas.panel(0, top, width, height);
    for (index, line) in lines.iter().enumerate() {
        let y = top + PANEL_INSET + 2 + index as i32 * LINE_ADVANCE;
        canvas.text(SCREEN_MARGIN, y, line, TEXT_COLOR);
    }
}

fn draw_centered_panel(
    canvas: &mut Canvas<'_>,
    max_width: i32,
    heading: &str,
    body: &[String],
    hint: &str,
) {
    let width = (canvas.width as i32 - SCREEN_MARGIN * 2).min(max_width);
    let max_chars = Canvas::chars_per_line(width);
    let wrapped: Vec<String> = body
        .iter()
        .flat_map(|line| wrap_text(line, max_chars))
        .collect();
    let rows = wrapped.len() as i32 + 3;
    let height = rows * LINE_ADVANCE + PANEL_INSET * 2;
    let left = (canvas.width as i32 - width) / 2;
    let top = (canvas.height as i32 - height) / 2;
    canvas.panel(left, top, width, height);

    let text_left = left + PANEL_INSET;
    let mut y = top + PANEL_INSET + 2;
    canvas.text(text_left, y, heading, ACCENT_TEXT_COLOR);
    y += LINE_ADVANCE * 2;
    for line in &wrapped {
        canvas.text(text_left, y, line, TEXT_COLOR);
        y += LINE_ADVANCE;
    }
    canvas.text(text_left, y, hint, HINT_TEXT_COLOR);
}

fn draw_dialogue(canvas: &mut Canvas<'_>, speaker: &str, lines: &[String]) {
    draw_centered_panel(
        canvas,
        DIALOGUE_PANEL_MAX_WIDTH,
        speaker,
        lines,
        "Enter: close",
    );
}

fn draw_cutscene(canvas: &mut Canvas<'_>, kind: &str, script: &[String]) {
    let (width, height) = (canvas.width as i32, canvas.height as i32);
    canvas.fill(0, 0, width, height, CUTSCENE_DIM_COLOR);
    draw_centered_panel(
        canvas,
        CUTSCENE_PANEL_MAX_WIDTH,
        &kind.to_uppercase(),
        script,
        "Enter: continue   Esc: skip",
    );
}

fn draw_banner(canvas: &mut Canvas<'_>, title: &str, hint: &str) {
    draw_centered_panel(canvas, DIALOGUE_PANEL_MAX_WIDTH, title, &[], hint);
}

fn debug_overlay_lines(
    snapshot: &RenderSnapshot<'_>,
    overlay: &DebugOverlay,
    camera: Position,
) -> Vec<String> {
    let cap = match overlay.render_fps_cap {
        Some(cap) => cap.to_string(),
        None => "off".to_string(),
    };
    let relative = snapshot
        .map
        .absolute_to_zone(snapshot.cursor)
        .map_or_else(|| "outside".to_string(), |pos| format!("{},{}", pos.x, pos.y));
    let origin = snapshot.map.zone_origin();
    vec![
        format!("FPS: {:.1} (cap {cap})", overlay.metrics.fps),
        format!("Frame: {:.2} ms", overlay.metrics.frame_time_ms),
        format!("Input/s: {:.1}", overlay.metrics.inputs_per_sec),
        format!(
            "Cursor: {relative} (abs {},{})",
            snapshot.cursor.x, snapshot.cursor.y
        ),
        format!(
            "Map: {}x{} origin {},{}",
            snapshot.map.width(),
            snapshot.map.height(),
            origin.x,
            origin.y
        ),
        format!("Camera: {},{}", camera.x, camera.y),
    ]
}

fn draw_debug_overlay(canvas: &mut Canvas<'_>, snapshot: &RenderSnapshot<'_>, overlay: &DebugOverlay) {
    let lines = debug_overlay_lines(snapshot, overlay, canvas.camera);
    let longest = lines
        .iter()
        .map(|line| line.chars().count() as i32)
        .max()
        .unwrap_or(0);
    let width = longest * GLYPH_ADVANCE + PANEL_INSET * 2;
    let height = lines.len() as i32 * LINE_ADVANCE + PANEL_INSET * 2;
    let left = canvas.width as i32 - width - SCREEN_MARGIN;
    let top = LINE_ADVANCE * 2 + PANEL_INSET * 2 + SCREEN_MARGIN;
    canvas.panel(left, top, width, height);
    for (index, line) in lines.iter().enumerate() {
        let y = top + PANEL_INSET + 2 + index as i32 * LINE_ADVANCE;
        canvas.text(left + PANEL_INSET, y, line, TEXT_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{quiet_session, session};

    const VIEW: Viewport = Viewport {
        width: 320,
        height: 240,
    };

    fn frame_for(viewport: Viewport) -> Vec<u8> {
        vec![0u8; viewport.width as usize * viewport.height as usize * 4]
    }

    fn has_color(frame: &[u8], color: [u8; 4]) -> bool {
        frame.chunks_exact(4).any(|px| px == color)
    }

    #[test]
    fn draws_cursor_and_keys() {
        let session = quiet_session();
        let mut frame = frame_for(VIEW);
        draw_scene(&mut frame, VIEW, &session.snapshot(), None);
        assert!(has_color(&frame, CURSOR_COLOR));
        assert!(has_color(&frame, KEY_COLOR));
        assert!(has_color(&frame, GATE_CLOSED_COLOR));
        assert!(has_color(&frame, NPC_COLOR));
    }

    #[test]
    fn cursor_tile_center_is_cursor_colored() {
        let session = quiet_session();
        let snapshot = session.snapshot();
        let viewport = Viewport {
            width: 640,
            height: 640,
        };
        let mut frame = frame_for(viewport);
        draw_scene(&mut frame, viewport, &snapshot, None);

        let camera = camera_origin_tiles(
            snapshot.cursor,
            (snapshot.map.width(), snapshot.map.height()),
            viewport.tiles(),
        );
        let (x, y) = tile_to_screen_px(snapshot.cursor, camera);
        let (cx, cy) = ((x + TILE / 2) as usize, (y + TILE / 2) as usize);
        let offset = (cy * viewport.width as usize + cx) * 4;
        assert_eq!(frame[offset..offset + 4], CURSOR_COLOR);
    }

    #[test]
    fn cutscene_dims_the_world() {
        let session = session();
        assert!(session.active_cutscene().is_some());
        let mut frame = frame_for(VIEW);
        draw_scene(&mut frame, VIEW, &session.snapshot(), None);
        assert!(!has_color(&frame, CURSOR_COLOR));
        assert!(!has_color(&frame, KEY_COLOR));
    }

    #[test]
    fn tiny_and_empty_viewports_are_safe() {
        let session = quiet_session();
        let snapshot = session.snapshot();
        let tiny = Viewport {
            width: 3,
            height: 2,
        };
        let mut frame = frame_for(tiny);
        draw_scene(&mut frame, tiny, &snapshot, Some(&DebugOverlay::default()));
        let mut empty = Vec::new();
        draw_scene(&mut empty, Viewport::default(), &snapshot, None);
        assert!(empty.is_empty());
    }

    #[test]
    fn hud_reports_keys_gate_and_count() {
        let mut session = quiet_session();
        session.handle_key('l');
        session.handle_key('2');
        let [title, status] = hud_lines(&session.snapshot());
        assert_eq!(title, "Test Game > Level One > Zone z1");
        assert_eq!(status, "Keys: h   Gate: locked   Count: 2");
    }

    #[test]
    fn message_panel_keeps_most_recent_lines() {
        let session = quiet_session();
        let snapshot = session.snapshot();
        let lines = message_panel_lines(&snapshot, 80);
        assert!(lines.len() <= BOTTOM_PANEL_MAX_LINES);
        assert_eq!(lines.last().map(String::as_str), Some("Welcome to z1"));
    }

    #[test]
    fn debug_overlay_reports_zone_relative_cursor() {
        let session = quiet_session();
        let snapshot = session.snapshot();
        let lines = debug_overlay_lines(
            &snapshot,
            &DebugOverlay {
                metrics: LoopMetricsSnapshot::default(),
                render_fps_cap: Some(60),
            },
            Position::new(0, 0),
        );
        assert_eq!(lines[0], "FPS: 0.0 (cap 60)");
        assert!(lines[3].starts_with("Cursor: 0,0 "), "{}", lines[3]);
    }

    #[test]
    fn every_tile_type_has_an_opaque_color() {
        for tile in [
            TileType::Water,
            TileType::Grass,
            TileType::Dirt,
            TileType::Stone,
            TileType::Tree,
            TileType::Path,
            TileType::Sand,
            TileType::Flowers,
            TileType::Bridge,
            TileType::Wall,
        ] {
            assert_eq!(tile_color(tile)[3], 255, "{}", tile.name());
        }
    }
}
