//! Shape rasterization: rectangles, ellipses, lines.
//!
//! All drawing happens into the element's own RGBA buffer; the caller
//! handles placement, rotation and opacity.

use image::{Rgba, RgbaImage};

use crate::document::{Border, BorderStyle, LineElement, ShapeElement, StrokeStyle};

use super::parse_color;

/// Dash length for dashed borders/strokes, as a multiple of the stroke width.
const DASH_FACTOR: f64 = 3.0;

fn put(buffer: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>) {
    if x < buffer.width() && y < buffer.height() {
        *buffer.get_pixel_mut(x, y) = color;
    }
}

/// Whether a dashed pattern is "on" at a run position.
fn dash_on(along: f64, dash_len: f64) -> bool {
    if dash_len <= 0.0 {
        return true;
    }
    (along / dash_len).floor() as i64 % 2 == 0
}

/// Filled rectangle covering the whole buffer, with optional inset border.
pub fn draw_rectangle(buffer: &mut RgbaImage, shape: &ShapeElement) {
    let (w, h) = buffer.dimensions();
    if let Some(fill) = parse_color(&shape.fill) {
        if fill[3] > 0 {
            for y in 0..h {
                for x in 0..w {
                    put(buffer, x, y, fill);
                }
            }
        }
    }
    if let Some(border) = &shape.border {
        draw_rect_border(buffer, border);
    }
}

fn draw_rect_border(buffer: &mut RgbaImage, border: &Border) {
    let Some(color) = parse_color(&border.color) else {
        return;
    };
    let (w, h) = buffer.dimensions();
    let bw = border.width.max(1.0);
    let dash_len = bw * DASH_FACTOR;
    for y in 0..h {
        for x in 0..w {
            let left = x as f64;
            let top = y as f64;
            let right = (w - 1 - x) as f64;
            let bottom = (h - 1 - y) as f64;
            let d = left.min(top).min(right).min(bottom);
            if d >= bw {
                continue;
            }
            if border.style == BorderStyle::Dashed {
                // Run position along whichever edge this pixel belongs to.
                let along = if d == left || d == right {
                    y as f64
                } else {
                    x as f64
                };
                if !dash_on(along, dash_len) {
                    continue;
                }
            }
            put(buffer, x, y, color);
        }
    }
}

/// Filled ellipse inscribed in the buffer, with optional border.
pub fn draw_ellipse(buffer: &mut RgbaImage, shape: &ShapeElement) {
    let (w, h) = buffer.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let (rx, ry) = (cx.max(0.5), cy.max(0.5));
    let fill = parse_color(&shape.fill);
    let border = shape
        .border
        .as_ref()
        .and_then(|b| parse_color(&b.color).map(|c| (b, c)));

    for y in 0..h {
        for x in 0..w {
            let nx = (x as f64 + 0.5 - cx) / rx;
            let ny = (y as f64 + 0.5 - cy) / ry;
            let dist = nx * nx + ny * ny;
            if dist > 1.0 {
                continue;
            }
            if let Some((b, color)) = &border {
                let bw = b.width.max(1.0);
                let inner_rx = (rx - bw).max(0.0);
                let inner_ry = (ry - bw).max(0.0);
                let ix = (x as f64 + 0.5 - cx) / inner_rx.max(0.001);
                let iy = (y as f64 + 0.5 - cy) / inner_ry.max(0.001);
                if ix * ix + iy * iy > 1.0 {
                    let on = match b.style {
                        BorderStyle::Solid => true,
                        BorderStyle::Dashed => {
                            // Parametrize dashes by arc position.
                            let angle = ny.atan2(nx).rem_euclid(std::f64::consts::TAU);
                            let arc = angle * (rx + ry) / 2.0;
                            dash_on(arc, bw * DASH_FACTOR)
                        }
                    };
                    if on {
                        put(buffer, x, y, *color);
                    }
                    continue;
                }
            }
            if let Some(fill) = fill {
                if fill[3] > 0 {
                    put(buffer, x, y, fill);
                }
            }
        }
    }
}

/// Horizontal rule across the buffer, vertically centered. Diagonals come
/// from element rotation, not from this routine.
pub fn draw_line(buffer: &mut RgbaImage, line: &LineElement) {
    let Some(color) = parse_color(&line.color) else {
        return;
    };
    let (w, h) = buffer.dimensions();
    let thickness = line.thickness.max(1.0).min(h as f64);
    let top = ((h as f64 - thickness) / 2.0).round().max(0.0) as u32;
    let bottom = ((top as f64 + thickness).round() as u32).min(h);
    for x in 0..w {
        let on = match line.stroke {
            StrokeStyle::Solid => true,
            StrokeStyle::Dashed => dash_on(x as f64, thickness * DASH_FACTOR),
            StrokeStyle::Dotted => {
                // Dot of one thickness, gap of one thickness.
                ((x as f64 / thickness).floor() as i64) % 2 == 0
            }
        };
        if !on {
            continue;
        }
        for y in top..bottom {
            put(buffer, x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0]))
    }

    #[test]
    fn rectangle_fills_whole_buffer() {
        let mut buf = blank(10, 8);
        draw_rectangle(
            &mut buf,
            &ShapeElement {
                fill: "#ff0000".into(),
                border: None,
            },
        );
        assert_eq!(*buf.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*buf.get_pixel(9, 7), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn transparent_fill_leaves_buffer_clear() {
        let mut buf = blank(10, 8);
        draw_rectangle(
            &mut buf,
            &ShapeElement {
                fill: "transparent".into(),
                border: Some(Border {
                    width: 2.0,
                    style: BorderStyle::Solid,
                    color: "#000000".into(),
                }),
            },
        );
        assert_eq!(*buf.get_pixel(5, 4), Rgba([0, 0, 0, 0]));
        assert_eq!(*buf.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*buf.get_pixel(1, 4), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn ellipse_fills_center_not_corners() {
        let mut buf = blank(40, 40);
        draw_ellipse(
            &mut buf,
            &ShapeElement {
                fill: "#00ff00".into(),
                border: None,
            },
        );
        assert_eq!(*buf.get_pixel(20, 20), Rgba([0, 255, 0, 255]));
        assert_eq!(*buf.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*buf.get_pixel(39, 39), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn ellipse_border_rings_the_fill() {
        let mut buf = blank(40, 40);
        draw_ellipse(
            &mut buf,
            &ShapeElement {
                fill: "#ffffff".into(),
                border: Some(Border {
                    width: 3.0,
                    style: BorderStyle::Solid,
                    color: "#000000".into(),
                }),
            },
        );
        assert_eq!(*buf.get_pixel(20, 20), Rgba([255, 255, 255, 255]));
        // Rightmost point of the ellipse is border.
        assert_eq!(*buf.get_pixel(38, 20), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn line_is_vertically_centered() {
        let mut buf = blank(30, 20);
        draw_line(
            &mut buf,
            &LineElement {
                thickness: 4.0,
                color: "#000000".into(),
                stroke: StrokeStyle::Solid,
            },
        );
        assert_eq!(*buf.get_pixel(15, 10), Rgba([0, 0, 0, 255]));
        assert_eq!(*buf.get_pixel(15, 2), Rgba([0, 0, 0, 0]));
        assert_eq!(*buf.get_pixel(15, 18), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn dashed_line_has_gaps() {
        let mut buf = blank(60, 10);
        draw_line(
            &mut buf,
            &LineElement {
                thickness: 2.0,
                color: "#000000".into(),
                stroke: StrokeStyle::Dashed,
            },
        );
        let row: Vec<bool> = (0..60).map(|x| buf.get_pixel(x, 5)[3] > 0).collect();
        assert!(row.iter().any(|&b| b));
        assert!(row.iter().any(|&b| !b));
        // First dash is on.
        assert!(row[0]);
    }
}
