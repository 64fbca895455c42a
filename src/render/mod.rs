//! # Rasterization
//!
//! Renders a resolved document to an `image::RgbaImage`: white page,
//! elements painted in z-order, per-element opacity alpha-blended, rotation
//! applied by inverse-mapping the element's own buffer around its center.
//!
//! Asset fetching is async and happens *before* rendering (see [`resolve`]);
//! the renderer itself is synchronous and pure so the same code path serves
//! the preview endpoint and the batch generator.

pub mod resolve;
pub mod shapes;
pub mod text;

pub use resolve::AssetCache;
pub use text::FontStore;

use std::collections::HashMap;

use image::{DynamicImage, Rgba, RgbaImage};

use crate::binding::{merged_fallback, resolve as resolve_text, DataRow};
use crate::document::{Document, ElementKind};
use crate::LaureaError;

/// Parse a CSS-style color: `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`.
pub fn parse_color(s: &str) -> Option<Rgba<u8>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("transparent") {
        return Some(Rgba([0, 0, 0, 0]));
    }
    let hex = s.strip_prefix('#')?;
    let nibble = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
    let byte = |hi: u8, lo: u8| Some(nibble(hi)? * 16 + nibble(lo)?);
    let b = hex.as_bytes();
    match b.len() {
        3 => Some(Rgba([
            nibble(b[0])? * 17,
            nibble(b[1])? * 17,
            nibble(b[2])? * 17,
            255,
        ])),
        6 => Some(Rgba([
            byte(b[0], b[1])?,
            byte(b[2], b[3])?,
            byte(b[4], b[5])?,
            255,
        ])),
        8 => Some(Rgba([
            byte(b[0], b[1])?,
            byte(b[2], b[3])?,
            byte(b[4], b[5])?,
            byte(b[6], b[7])?,
        ])),
        _ => None,
    }
}

/// Alpha-composite `src` over `dst`, with an extra opacity multiplier.
fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let sa = (src[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for i in 0..3 {
        let sc = src[i] as f32 / 255.0;
        let dc = dst[i] as f32 / 255.0;
        let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        dst[i] = (out * 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

/// Composite an element buffer onto the page at (x, y) with opacity.
fn blit(page: &mut RgbaImage, buffer: &RgbaImage, x: i64, y: i64, opacity: f32) {
    for (bx, by, &px) in buffer.enumerate_pixels() {
        let tx = x + bx as i64;
        let ty = y + by as i64;
        if tx >= 0 && ty >= 0 && (tx as u32) < page.width() && (ty as u32) < page.height() {
            blend_pixel(page.get_pixel_mut(tx as u32, ty as u32), px, opacity);
        }
    }
}

/// Composite an element buffer rotated by `degrees` around its center.
///
/// Inverse mapping with nearest-neighbor sampling: for each page pixel in
/// the rotated bounding box, rotate back into buffer space and sample.
fn blit_rotated(
    page: &mut RgbaImage,
    buffer: &RgbaImage,
    x: f64,
    y: f64,
    degrees: f64,
    opacity: f32,
) {
    let (bw, bh) = (buffer.width() as f64, buffer.height() as f64);
    let (cx, cy) = (x + bw / 2.0, y + bh / 2.0);
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();

    // Bounding box of the rotated rect.
    let half_w = (bw * cos.abs() + bh * sin.abs()) / 2.0;
    let half_h = (bw * sin.abs() + bh * cos.abs()) / 2.0;
    let x0 = ((cx - half_w).floor() as i64).max(0);
    let y0 = ((cy - half_h).floor() as i64).max(0);
    let x1 = ((cx + half_w).ceil() as i64).min(page.width() as i64);
    let y1 = ((cy + half_h).ceil() as i64).min(page.height() as i64);

    for py in y0..y1 {
        for px in x0..x1 {
            let dx = px as f64 + 0.5 - cx;
            let dy = py as f64 + 0.5 - cy;
            // Rotate back by -theta.
            let sx = dx * cos + dy * sin + bw / 2.0;
            let sy = -dx * sin + dy * cos + bh / 2.0;
            if sx >= 0.0 && sy >= 0.0 && sx < bw && sy < bh {
                let src = *buffer.get_pixel(sx as u32, sy as u32);
                blend_pixel(page.get_pixel_mut(px as u32, py as u32), src, opacity);
            }
        }
    }
}

/// Draw an image with cover fit: scale to fill the box (largest of the two
/// axis ratios), center-crop the overflow.
fn draw_cover(target: &mut RgbaImage, source: &DynamicImage) {
    let (tw, th) = (target.width(), target.height());
    if tw == 0 || th == 0 || source.width() == 0 || source.height() == 0 {
        return;
    }
    let scale = (tw as f64 / source.width() as f64).max(th as f64 / source.height() as f64);
    let scaled_w = (source.width() as f64 * scale).round().max(1.0) as u32;
    let scaled_h = (source.height() as f64 * scale).round().max(1.0) as u32;
    let scaled = source
        .resize_exact(scaled_w, scaled_h, image::imageops::FilterType::Lanczos3)
        .to_rgba8();
    let off_x = (scaled_w.saturating_sub(tw)) / 2;
    let off_y = (scaled_h.saturating_sub(th)) / 2;
    for y in 0..th {
        for x in 0..tw {
            *target.get_pixel_mut(x, y) = *scaled.get_pixel(x + off_x, y + off_y);
        }
    }
}

/// Placeholder for images whose asset is missing: light gray with a frame.
fn draw_missing_asset(target: &mut RgbaImage) {
    let fill = Rgba([220, 220, 220, 255]);
    let frame = Rgba([150, 150, 150, 255]);
    let (w, h) = (target.width(), target.height());
    for y in 0..h {
        for x in 0..w {
            let edge = x == 0 || y == 0 || x == w - 1 || y == h - 1;
            *target.get_pixel_mut(x, y) = if edge { frame } else { fill };
        }
    }
}

/// Rasterize a document against one data row.
///
/// `assets` maps image `source` strings to decoded images (see
/// [`AssetCache::resolve_document`]); sources missing from the map draw a
/// placeholder. `row` may be empty for a plain preview.
pub fn render_document(
    doc: &Document,
    row: &DataRow,
    assets: &HashMap<String, DynamicImage>,
    fonts: &FontStore,
) -> Result<RgbaImage, LaureaError> {
    let page_w = doc.width.round().max(1.0) as u32;
    let page_h = doc.height.round().max(1.0) as u32;
    if page_w > 20_000 || page_h > 20_000 {
        return Err(LaureaError::Render(format!(
            "page size {}x{} is out of range",
            page_w, page_h
        )));
    }
    let mut page = RgbaImage::from_pixel(page_w, page_h, Rgba([255, 255, 255, 255]));
    let fallback = merged_fallback(&doc.variables);

    // Anything past the page extent can never land on the page, so cap the
    // per-element buffer there; this keeps oversized geometry from blowing up
    // the allocation (`1e12 as u32` saturates to u32::MAX).
    let buffer_cap = page_w.max(page_h);

    for index in doc.paint_order() {
        let el = &doc.elements[index];
        let w = (el.width.round() as u32).min(buffer_cap);
        let h = (el.height.round() as u32).min(buffer_cap);
        if w == 0 || h == 0 || el.opacity <= 0.0 {
            continue;
        }
        let mut buffer = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0]));

        match &el.kind {
            ElementKind::Text(text) => {
                let content = resolve_text(
                    &text.content,
                    text.is_variable,
                    text.variable.as_deref(),
                    row,
                    &fallback,
                );
                text::draw_text(&mut buffer, &content, &text.style, fonts);
            }
            ElementKind::Image(img) => match assets.get(&img.source) {
                Some(source) => draw_cover(&mut buffer, source),
                None => draw_missing_asset(&mut buffer),
            },
            ElementKind::Rectangle(rect) => shapes::draw_rectangle(&mut buffer, &rect.shape),
            ElementKind::Circle(circle) => shapes::draw_ellipse(&mut buffer, &circle.shape),
            ElementKind::Line(line) => shapes::draw_line(&mut buffer, line),
        }

        if el.rotation.rem_euclid(360.0) == 0.0 {
            blit(
                &mut page,
                &buffer,
                el.x.round() as i64,
                el.y.round() as i64,
                el.opacity,
            );
        } else {
            blit_rotated(&mut page, &buffer, el.x, el.y, el.rotation, el.opacity);
        }
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        DesignElement, ElementPatch, RectangleElement, ShapeElement, TextElement,
    };
    use pretty_assertions::assert_eq;

    fn rect_doc(fill: &str) -> Document {
        let mut doc = Document::new();
        doc.width = 100.0;
        doc.height = 80.0;
        let mut el = DesignElement::new_at(
            ElementKind::Rectangle(RectangleElement {
                shape: ShapeElement {
                    fill: fill.into(),
                    border: None,
                },
            }),
            10.0,
            10.0,
        );
        el.id = "r".into();
        el.width = 40.0;
        el.height = 30.0;
        doc.add(el).unwrap();
        doc
    }

    #[test]
    fn parse_color_forms() {
        assert_eq!(parse_color("#f00"), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(parse_color("#00ff00"), Some(Rgba([0, 255, 0, 255])));
        assert_eq!(parse_color("#0000ff80"), Some(Rgba([0, 0, 255, 128])));
        assert_eq!(parse_color("transparent"), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_color("#12345"), None);
    }

    #[test]
    fn page_starts_white_and_rect_paints() {
        let doc = rect_doc("#ff0000");
        let page =
            render_document(&doc, &DataRow::new(), &HashMap::new(), &FontStore::empty()).unwrap();
        assert_eq!(page.dimensions(), (100, 80));
        assert_eq!(*page.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*page.get_pixel(30, 25), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn opacity_blends_toward_background() {
        let mut doc = rect_doc("#000000");
        doc.update(
            "r",
            &ElementPatch {
                opacity: Some(0.5),
                ..Default::default()
            },
        );
        let page =
            render_document(&doc, &DataRow::new(), &HashMap::new(), &FontStore::empty()).unwrap();
        let px = page.get_pixel(30, 25);
        assert!(px[0] > 100 && px[0] < 160, "expected mid-gray, got {:?}", px);
    }

    #[test]
    fn z_order_decides_overlap() {
        let mut doc = rect_doc("#ff0000");
        let mut top = DesignElement::new_at(
            ElementKind::Rectangle(RectangleElement {
                shape: ShapeElement {
                    fill: "#0000ff".into(),
                    border: None,
                },
            }),
            10.0,
            10.0,
        );
        top.id = "top".into();
        top.width = 40.0;
        top.height = 30.0;
        top.z = 5;
        doc.add(top).unwrap();
        let page =
            render_document(&doc, &DataRow::new(), &HashMap::new(), &FontStore::empty()).unwrap();
        assert_eq!(*page.get_pixel(30, 25), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn rotated_rect_covers_center_but_not_old_corner() {
        let mut doc = Document::new();
        doc.width = 200.0;
        doc.height = 200.0;
        let mut el = DesignElement::new_at(
            ElementKind::Rectangle(RectangleElement {
                shape: ShapeElement {
                    fill: "#000000".into(),
                    border: None,
                },
            }),
            50.0,
            90.0,
        );
        el.id = "r".into();
        el.width = 100.0;
        el.height = 20.0;
        el.rotation = 90.0;
        doc.add(el).unwrap();
        let page =
            render_document(&doc, &DataRow::new(), &HashMap::new(), &FontStore::empty()).unwrap();
        // Center survives rotation.
        assert_eq!(*page.get_pixel(100, 100), Rgba([0, 0, 0, 255]));
        // A point near the unrotated left edge is now empty.
        assert_eq!(*page.get_pixel(55, 100), Rgba([255, 255, 255, 255]));
        // The rotated extent reaches above the original box.
        assert_eq!(*page.get_pixel(100, 60), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn oversized_element_renders_within_page_bounds() {
        let mut doc = rect_doc("#ff0000");
        doc.update(
            "r",
            &ElementPatch {
                x: Some(0.0),
                y: Some(0.0),
                width: Some(1e12),
                height: Some(1e12),
                ..Default::default()
            },
        );
        let page =
            render_document(&doc, &DataRow::new(), &HashMap::new(), &FontStore::empty()).unwrap();
        assert_eq!(page.dimensions(), (100, 80));
        // The visible portion still paints edge to edge.
        assert_eq!(*page.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*page.get_pixel(99, 79), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn text_renders_resolved_content() {
        let mut doc = Document::new();
        doc.width = 400.0;
        doc.height = 100.0;
        let mut el = DesignElement::new_at(
            ElementKind::Text(TextElement::new("Hello {{name}}")),
            10.0,
            10.0,
        );
        el.id = "t".into();
        el.width = 380.0;
        el.height = 80.0;
        doc.add(el).unwrap();
        let mut row = DataRow::new();
        row.insert("name".into(), serde_json::json!("Alice"));
        let page = render_document(&doc, &row, &HashMap::new(), &FontStore::empty()).unwrap();
        let dark = page.pixels().filter(|p| p[0] < 128 && p[3] > 128).count();
        assert!(dark > 50, "expected text pixels, found {}", dark);
    }

    #[test]
    fn different_rows_render_different_pixels() {
        let mut doc = Document::new();
        doc.width = 400.0;
        doc.height = 100.0;
        let mut el =
            DesignElement::new_at(ElementKind::Text(TextElement::bound("name")), 10.0, 10.0);
        el.id = "t".into();
        el.width = 380.0;
        el.height = 80.0;
        doc.add(el).unwrap();

        let mut alice = DataRow::new();
        alice.insert("name".into(), serde_json::json!("Alice"));
        let mut bob = DataRow::new();
        bob.insert("name".into(), serde_json::json!("Bob"));

        let a = render_document(&doc, &alice, &HashMap::new(), &FontStore::empty()).unwrap();
        let b = render_document(&doc, &bob, &HashMap::new(), &FontStore::empty()).unwrap();
        assert_ne!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn missing_asset_draws_placeholder() {
        let mut doc = Document::new();
        doc.width = 100.0;
        doc.height = 100.0;
        let mut el = DesignElement::new_at(
            ElementKind::Image(crate::document::ImageElement {
                source: "https://example.com/x.png".into(),
            }),
            10.0,
            10.0,
        );
        el.id = "i".into();
        el.width = 50.0;
        el.height = 50.0;
        doc.add(el).unwrap();
        let page =
            render_document(&doc, &DataRow::new(), &HashMap::new(), &FontStore::empty()).unwrap();
        assert_eq!(*page.get_pixel(30, 30), Rgba([220, 220, 220, 255]));
    }
}
