//! Text rasterization.
//!
//! Two glyph sources:
//! - the built-in Spleen 12x24 bitmap font, scaled to the requested pixel
//!   size with nearest neighbor — always available, no font files needed;
//! - TTF/OTF families loaded at startup from a fonts directory and rendered
//!   via `ab_glyph`, used when a text style names a family the store has.
//!
//! Alignment, multi-line content and the line-height multiplier are handled
//! here; variable resolution happens before the text reaches this module.

use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{Font, FontArc, ScaleFont};
use image::{Rgba, RgbaImage};
use spleen_font::{PSF2Font, FONT_12X24};

use crate::document::{FontWeight, TextAlign, TextStyle, VerticalAlign};

use super::parse_color;

const SPLEEN_W: usize = 12;
const SPLEEN_H: usize = 24;

/// Runtime-loaded TTF families, keyed by lowercased file stem.
pub struct FontStore {
    families: HashMap<String, FontArc>,
}

impl FontStore {
    /// A store with no TTF families; all text uses the bitmap font.
    pub fn empty() -> Self {
        Self {
            families: HashMap::new(),
        }
    }

    /// Load every `.ttf`/`.otf` in a directory. The family name is the file
    /// stem, matched case-insensitively. Unreadable files are skipped with
    /// a warning; a missing directory yields an empty store.
    pub fn load_dir(dir: &Path) -> Self {
        let mut families = HashMap::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "fonts directory not readable");
                return Self::empty();
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            if !matches!(ext.as_deref(), Some("ttf") | Some("otf")) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match std::fs::read(&path) {
                Ok(bytes) => match FontArc::try_from_vec(bytes) {
                    Ok(font) => {
                        tracing::debug!(family = stem, "loaded font");
                        families.insert(stem.to_ascii_lowercase(), font);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "invalid font file")
                    }
                },
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "font not readable"),
            }
        }
        Self { families }
    }

    pub fn family(&self, name: &str) -> Option<&FontArc> {
        self.families.get(&name.to_ascii_lowercase())
    }

    pub fn family_names(&self) -> Vec<&str> {
        self.families.keys().map(String::as_str).collect()
    }
}

/// Width of one line at the given style, in pixels.
fn measure_line(line: &str, style: &TextStyle, fonts: &FontStore) -> f32 {
    if let Some(font) = style.family.as_deref().and_then(|f| fonts.family(f)) {
        let scaled = font.as_scaled(style.size);
        line.chars()
            .map(|ch| scaled.h_advance(font.glyph_id(ch)))
            .sum()
    } else {
        let char_w = (style.size / 2.0).round().max(1.0);
        line.chars().count() as f32 * char_w
    }
}

/// Draw multi-line text into the element buffer.
pub fn draw_text(buffer: &mut RgbaImage, content: &str, style: &TextStyle, fonts: &FontStore) {
    let Some(color) = parse_color(&style.color) else {
        return;
    };
    if style.size <= 0.0 || content.is_empty() {
        return;
    }
    let (w, h) = (buffer.width() as f32, buffer.height() as f32);
    let line_height = style.size * style.line_height.max(0.1);
    let lines: Vec<&str> = content.split('\n').collect();
    let total_height = lines.len() as f32 * line_height;

    let mut y = match style.valign {
        VerticalAlign::Top => 0.0,
        VerticalAlign::Middle => (h - total_height) / 2.0,
        VerticalAlign::Bottom => h - total_height,
    };

    for line in lines {
        let line_w = measure_line(line, style, fonts);
        let x = match style.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (w - line_w) / 2.0,
            TextAlign::Right => w - line_w,
        };
        match style.family.as_deref().and_then(|f| fonts.family(f)) {
            Some(font) => draw_ttf_line(buffer, font, line, style, color, x, y),
            None => draw_bitmap_line(buffer, line, style, color, x, y),
        }
        y += line_height;
    }
}

fn draw_ttf_line(
    buffer: &mut RgbaImage,
    font: &FontArc,
    line: &str,
    style: &TextStyle,
    color: Rgba<u8>,
    origin_x: f32,
    origin_y: f32,
) {
    let scaled = font.as_scaled(style.size);
    let baseline = origin_y + scaled.ascent();
    let mut pen_x = origin_x;
    let passes: &[f32] = if style.weight == FontWeight::Bold {
        &[0.0, 0.7]
    } else {
        &[0.0]
    };
    for ch in line.chars() {
        let id = font.glyph_id(ch);
        for &offset in passes {
            let glyph = id.with_scale_and_position(
                style.size,
                ab_glyph::point(pen_x + offset, baseline),
            );
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let px = bounds.min.x + gx as f32;
                    let py = bounds.min.y + gy as f32;
                    if px < 0.0 || py < 0.0 {
                        return;
                    }
                    let (px, py) = (px as u32, py as u32);
                    if px < buffer.width() && py < buffer.height() && coverage > 0.0 {
                        let alpha = (coverage.min(1.0) * color[3] as f32) as u8;
                        let existing = buffer.get_pixel(px, py);
                        if alpha > existing[3] || existing[3] == 0 {
                            *buffer.get_pixel_mut(px, py) =
                                Rgba([color[0], color[1], color[2], alpha.max(existing[3])]);
                        }
                    }
                });
            }
        }
        pen_x += scaled.h_advance(id);
    }
}

fn draw_bitmap_line(
    buffer: &mut RgbaImage,
    line: &str,
    style: &TextStyle,
    color: Rgba<u8>,
    origin_x: f32,
    origin_y: f32,
) {
    // Embedded PSF2 data, infallible.
    let mut spleen = PSF2Font::new(FONT_12X24).unwrap();
    let char_h = style.size.round().max(1.0) as usize;
    let char_w = (style.size / 2.0).round().max(1.0) as usize;

    let mut pen_x = origin_x.round() as i64;
    let pen_y = origin_y.round() as i64;
    for ch in line.chars() {
        let utf8 = ch.to_string();
        let mut src = vec![0u8; SPLEEN_W * SPLEEN_H];
        match spleen.glyph_for_utf8(utf8.as_bytes()) {
            Some(glyph) => {
                for (row_y, row) in glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        if row_y < SPLEEN_H && col_x < SPLEEN_W && on {
                            src[row_y * SPLEEN_W + col_x] = 1;
                        }
                    }
                }
            }
            None => {
                // Unknown glyph: hollow box.
                for x in 0..SPLEEN_W {
                    src[x] = 1;
                    src[(SPLEEN_H - 1) * SPLEEN_W + x] = 1;
                }
                for y in 0..SPLEEN_H {
                    src[y * SPLEEN_W] = 1;
                    src[y * SPLEEN_W + SPLEEN_W - 1] = 1;
                }
            }
        }

        let mut dst = vec![0u8; char_w * char_h];
        scale_bitmap(&src, SPLEEN_W, SPLEEN_H, &mut dst, char_w, char_h);
        let bold = style.weight == FontWeight::Bold;
        for (i, &on) in dst.iter().enumerate() {
            if on == 0 {
                continue;
            }
            let gx = (i % char_w) as i64;
            let gy = (i / char_w) as i64;
            put_signed(buffer, pen_x + gx, pen_y + gy, color);
            if bold {
                put_signed(buffer, pen_x + gx + 1, pen_y + gy, color);
            }
        }
        pen_x += char_w as i64;
    }
}

fn put_signed(buffer: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < buffer.width() && (y as u32) < buffer.height() {
        *buffer.get_pixel_mut(x as u32, y as u32) = color;
    }
}

/// Nearest-neighbor bitmap scale.
fn scale_bitmap(src: &[u8], src_w: usize, src_h: usize, dst: &mut [u8], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx * src_w / dst_w;
            let sy = dy * src_h / dst_h;
            let src_idx = sy * src_w + sx;
            let dst_idx = dy * dst_w + dx;
            if src_idx < src.len() && dst_idx < dst.len() {
                dst[dst_idx] = src[src_idx];
            }
        }
    }
}
