//! 3x5 bitmap font covering printable ASCII, drawn at an integer scale into
//! an RGBA frame. Every draw call clips against the frame.
pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;
pub(crate) const TEXT_SCALE: i32 = 2;
pub(crate) const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
pub(crate) const LINE_ADVANCE: i32 = (GLYPH_HEIGHT + 2) * TEXT_SCALE;

type Glyph = [u8; GLYPH_HEIGHT as usize];

const SPACE_GLYPH: Glyph = [0; GLYPH_HEIGHT as usize];

// Indexed by `ch as usize - 0x20`.
const ASCII_GLYPHS: [Glyph; 95] = [
    [0b000, 0b000, 0b000, 0b000, 0b000], // space
    [0b010, 0b010, 0b010, 0b000, 0b010], // !
    [0b101, 0b101, 0b000, 0b000, 0b000], // "
    [0b101, 0b111, 0b101, 0b111, 0b101], // #
    [0b111, 0b110, 0b111, 0b011, 0b111], // $
    [0b101, 0b001, 0b010, 0b100, 0b101], // %
    [0b010, 0b101, 0b010, 0b101, 0b011], // &
    [0b010, 0b010, 0b000, 0b000, 0b000], // '
    [0b001, 0b010, 0b010, 0b010, 0b001], // (
    [0b100, 0b010, 0b010, 0b010, 0b100], // )
    [0b000, 0b101, 0b010, 0b101, 0b000], // *
    [0b000, 0b010, 0b111, 0b010, 0b000], // +
    [0b000, 0b000, 0b000, 0b010, 0b100], // ,
    [0b000, 0b000, 0b111, 0b000, 0b000], // -
    [0b000, 0b000, 0b000, 0b000, 0b010], // .
    [0b001, 0b001, 0b010, 0b100, 0b100], // /
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
    [0b000, 0b010, 0b000, 0b010, 0b000], // :
    [0b000, 0b010, 0b000, 0b010, 0b100], // ;
    [0b001, 0b010, 0b100, 0b010, 0b001], // <
    [0b000, 0b111, 0b000, 0b111, 0b000], // =
    [0b100, 0b010, 0b001, 0b010, 0b100], // >
    [0b111, 0b001, 0b011, 0b000, 0b010], // ?
    [0b111, 0b101, 0b111, 0b100, 0b111], // @
    [0b010, 0b101, 0b111, 0b101, 0b101], // A
    [0b110, 0b101, 0b110, 0b101, 0b110], // B
    [0b111, 0b100, 0b100, 0b100, 0b111], // C
    [0b110, 0b101, 0b101, 0b101, 0b110], // D
    [0b111, 0b100, 0b110, 0b100, 0b111], // E
    [0b111, 0b100, 0b110, 0b100, 0b100], // F
    [0b111, 0b100, 0b101, 0b101, 0b111], // G
    [0b101, 0b101, 0b111, 0b101, 0b101], // H
    [0b111, 0b010, 0b010, 0b010, 0b111], // I
    [0b111, 0b001, 0b001, 0b101, 0b111], // J
    [0b101, 0b101, 0b110, 0b101, 0b101], // K
    [0b100, 0b100, 0b100, 0b100, 0b111], // L
    [0b101, 0b111, 0b111, 0b101, 0b101], // M
    [0b101, 0b111, 0b111, 0b111, 0b101], // N
    [0b111, 0b101, 0b101, 0b101, 0b111], // O
    [0b110, 0b101, 0b110, 0b100, 0b100], // P
    [0b111, 0b101, 0b101, 0b111, 0b001], // Q
    [0b110, 0b101, 0b110, 0b101, 0b101], // R
    [0b111, 0b100, 0b111, 0b001, 0b111], // S
    [0b111, 0b010, 0b010, 0b010, 0b010], // T
    [0b101, 0b101, 0b101, 0b101, 0b111], // U
    [0b101, 0b101, 0b101, 0b101, 0b010], // V
    [0b101, 0b101, 0b111, 0b111, 0b101], // W
    [0b101, 0b101, 0b010, 0b101, 0b101], // X
    [0b101, 0b101, 0b010, 0b010, 0b010], // Y
    [0b111, 0b001, 0b010, 0b100, 0b111], // Z
    [0b110, 0b100, 0b100, 0b100, 0b110], // [
    [0b100, 0b100, 0b010, 0b001, 0b001], // \
    [0b011, 0b001, 0b001, 0b001, 0b011], // ]
    [0b010, 0b101, 0b000, 0b000, 0b000], // ^
    [0b000, 0b000, 0b000, 0b000, 0b111], // _
    [0b100, 0b010, 0b000, 0b000, 0b000], // `
    [0b000, 0b111, 0b001, 0b111, 0b111], // a
    [0b100, 0b100, 0b110, 0b101, 0b110], // b
    [0b000, 0b111, 0b100, 0b100, 0b111], // c
    [0b001, 0b001, 0b111, 0b101, 0b111], // d
    [0b000, 0b111, 0b110, 0b100, 0b111], // e
    [0b011, 0b100, 0b110, 0b100, 0b100], // f
    [0b000, 0b111, 0b101, 0b111, 0b001], // g
    [0b100, 0b100, 0b110, 0b101, 0b101], // h
    [0b010, 0b000, 0b010, 0b010, 0b010], // i
    [0b001, 0b000, 0b001, 0b101, 0b010], // j
    [0b100, 0b101, 0b110, 0b101, 0b101], // k
    [0b100, 0b100, 0b100, 0b100, 0b111], // l
    [0b000, 0b110, 0b111, 0b101, 0b101], // m
    [0b000, 0b110, 0b101, 0b101, 0b101], // n
    [0b000, 0b111, 0b101, 0b101, 0b111], // o
    [0b000, 0b110, 0b101, 0b110, 0b100], // p
    [0b000, 0b111, 0b101, 0b111, 0b001], // q
    [0b000, 0b110, 0b101, 0b100, 0b100], // r
    [0b000, 0b111, 0b110, 0b001, 0b111], // s
    [0b010, 0b111, 0b010, 0b010, 0b011], // t
    [0b000, 0b101, 0b101, 0b101, 0b111], // u
    [0b000, 0b101, 0b101, 0b101, 0b010], // v
    [0b000, 0b101, 0b101, 0b111, 0b010], // w
    [0b000, 0b101, 0b010, 0b010, 0b101], // x
    [0b000, 0b101, 0b101, 0b111, 0b001], // y
    [0b000, 0b111, 0b001, 0b010, 0b111], // z
    [0b011, 0b010, 0b110, 0b010, 0b011], // {
    [0b010, 0b010, 0b010, 0b010, 0b010], // |
    [0b110, 0b010, 0b011, 0b010, 0b110], // }
    [0b000, 0b011, 0b110, 0b000, 0b000], // ~
];

fn glyph_for(ch: char) -> Option<Glyph> {
    match ch {
        ' '..='~' => Some(ASCII_GLYPHS[ch as usize - 0x20]),
        _ => None,
    }
}

pub(crate) fn text_width_px(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE
}

/// Greedy word wrap to at most `max_chars` per line. Words longer than a
/// line are split.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if current.is_empty() {
            word.len()
        } else {
            current.chars().count() + 1 + word.len()
        };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(crate) fn draw_text_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    mut x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
) {
    for ch in text.chars() {
        let glyph = glyph_for(ch).unwrap_or(SPACE_GLYPH);
        draw_glyph_clipped(frame, width, height, x, y, glyph, color);
        x += GLYPH_ADVANCE;
    }
}

fn draw_glyph_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    glyph: Glyph,
    color: [u8; 4],
) {
    if width == 0 || height == 0 {
        return;
    }

    for (row_index, row_bits) in glyph.iter().enumerate() {
        let glyph_y = y + row_index as i32 * TEXT_SCALE;
        for col in 0..GLYPH_WIDTH {
            if (row_bits & (1 << (GLYPH_WIDTH - 1 - col))) == 0 {
                continue;
            }
            let glyph_x = x + col * TEXT_SCALE;
            draw_filled_rect(
                frame, width, height, glyph_x, glyph_y, TEXT_SCALE, TEXT_SCALE, color,
            );
        }
    }
}

pub(crate) fn write_pixel_rgba(frame: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 4]) {
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }

    frame[byte_offset..end].copy_from_slice(&color);
}

pub(crate) fn blend_pixel_rgba(frame: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 4]) {
    let Some(byte_offset) = y
        .checked_mul(width)
        .and_then(|row| row.checked_add(x))
        .and_then(|pixel| pixel.checked_mul(4))
    else {
        return;
    };
    let Some(pixel) = frame.get_mut(byte_offset..byte_offset + 4) else {
        return;
    };
    let alpha = color[3] as u32;
    for channel in 0..3 {
        let src = color[channel] as u32;
        let dst = pixel[channel] as u32;
        pixel[channel] = ((src * alpha + dst * (255 - alpha)) / 255) as u8;
    }
    pixel[3] = 255;
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_filled_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = x.saturating_add(rect_width).min(width as i32);
    let end_y = y.saturating_add(rect_height).min(height as i32);
    if end_x <= start_x || end_y <= start_y {
        return;
    }

    let width_usize = width as usize;
    let opaque = color[3] == u8::MAX;
    for py in start_y..end_y {
        for px in start_x..end_x {
            if opaque {
                write_pixel_rgba(frame, width_usize, px as usize, py as usize, color);
            } else {
                blend_pixel_rgba(frame, width_usize, px as usize, py as usize, color);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_rect_outline(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    if rect_width <= 1 || rect_height <= 1 {
        return;
    }
    draw_filled_rect(frame, width, height, x, y, rect_width, 1, color);
    draw_filled_rect(frame, width, height, x, y + rect_height - 1, rect_width, 1, color);
    draw_filled_rect(frame, width, height, x, y, 1, rect_height, color);
    draw_filled_rect(frame, width, height, x + rect_width - 1, y, 1, rect_height, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    #[test]
    fn glyph_lookup_covers_ascii_printable_range() {
        for code in 32u8..=126u8 {
            let ch = char::from(code);
            assert!(glyph_for(ch).is_some(), "missing glyph for ASCII code {code}");
        }
        assert!(glyph_for('\u{7f}').is_none());
    }

    #[test]
    fn unknown_character_draws_like_space() {
        let mut frame = vec![0u8; 16 * 16 * 4];
        draw_text_clipped(&mut frame, 16, 16, 0, 0, "\u{1f642}", WHITE);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn clipped_draws_never_write_out_of_bounds() {
        let mut frame = vec![0u8; 8 * 8 * 4];
        draw_text_clipped(&mut frame, 8, 8, -2, -2, "KEY", WHITE);
        draw_text_clipped(&mut frame, 8, 8, 64, 64, "KEY", WHITE);
        let mut empty = vec![];
        draw_text_clipped(&mut empty, 0, 8, 0, 0, "Gate", WHITE);
        assert_eq!(frame.len(), 8 * 8 * 4);
    }

    #[test]
    fn letter_l_lights_expected_pixels() {
        let mut frame = vec![0u8; 8 * 12 * 4];
        draw_text_clipped(&mut frame, 8, 12, 0, 0, "l", WHITE);
        let lit = |x: usize, y: usize| frame[(y * 8 + x) * 4] == 255;
        assert_eq!(glyph_for('l'), Some([0b100, 0b100, 0b100, 0b100, 0b111]));
        assert!(lit(0, 0));
        assert!(!lit(2, 0));
        assert!(lit(4, 8));
    }

    #[test]
    fn wrap_text_respects_width_and_splits_long_words() {
        assert_eq!(
            wrap_text("press l to walk right", 10),
            vec!["press l to", "walk right"]
        );
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("   ", 5).is_empty());
    }

    #[test]
    fn translucent_fill_blends_with_background() {
        let mut frame = vec![0u8; 4];
        draw_filled_rect(&mut frame, 1, 1, 0, 0, 1, 1, [200, 100, 0, 128]);
        assert_eq!(frame, vec![100, 50, 0, 255]);
    }

    #[test]
    fn layout_metrics_follow_text_scale() {
        assert_eq!(GLYPH_ADVANCE, 8);
        assert_eq!(LINE_ADVANCE, 14);
        assert_eq!(text_width_px("hjkl"), 32);
    }
}
