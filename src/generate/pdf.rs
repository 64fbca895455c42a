//! PDF packaging: wraps a rendered page raster in a single-page PDF.
//!
//! `genpdf` needs a registered font family even for an image-only page, so
//! PDF output requires a fonts directory with at least one family laid out
//! the genpdf way (`Name-Regular.ttf` etc.).

use std::path::Path;

use image::RgbaImage;
use tempfile::NamedTempFile;

use crate::LaureaError;

/// Raster resolution embedded in the PDF.
const PDF_DPI: f64 = 150.0;
const MM_PER_INCH: f64 = 25.4;

/// Find a loadable genpdf font family in `dir`: families are advertised by
/// their `*-Regular.ttf` file, with `LiberationSans` preferred.
fn load_font_family(
    dir: &Path,
) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, LaureaError> {
    if let Ok(family) = genpdf::fonts::from_files(dir, "LiberationSans", None) {
        return Ok(family);
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| LaureaError::Render(format!("fonts directory unreadable: {}", e)))?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(base) = name.strip_suffix("-Regular.ttf") {
            if let Ok(family) = genpdf::fonts::from_files(dir, base, None) {
                return Ok(family);
            }
        }
    }
    Err(LaureaError::Render(format!(
        "no usable font family in {}",
        dir.display()
    )))
}

/// Build a one-page PDF whose page exactly fits the raster at `PDF_DPI`.
pub fn raster_to_pdf(page: &RgbaImage, fonts_dir: &Path) -> Result<Vec<u8>, LaureaError> {
    let family = load_font_family(fonts_dir)?;
    let mut doc = genpdf::Document::new(family);
    doc.set_title("Certificate");

    let width_mm = page.width() as f64 / PDF_DPI * MM_PER_INCH;
    let height_mm = page.height() as f64 / PDF_DPI * MM_PER_INCH;
    doc.set_paper_size(genpdf::Size::new(width_mm, height_mm));

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(0);
    doc.set_page_decorator(decorator);

    // genpdf embeds images from disk; flatten alpha over white first since
    // PDF viewers disagree about transparency in embedded PNGs.
    let (w, h) = page.dimensions();
    let mut background = RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, page, 0, 0);
    let rgb = image::DynamicImage::ImageRgba8(background).to_rgb8();

    let mut tmp = NamedTempFile::new().map_err(LaureaError::Io)?;
    image::DynamicImage::ImageRgb8(rgb)
        .write_to(tmp.as_file_mut(), image::ImageFormat::Png)
        .map_err(|e| LaureaError::Render(format!("PNG staging failed: {}", e)))?;

    let mut img_elem = genpdf::elements::Image::from_path(tmp.path())
        .map_err(|e| LaureaError::Render(format!("image embedding failed: {}", e)))?;
    img_elem.set_dpi(PDF_DPI);
    doc.push(img_elem);

    let mut bytes = Vec::new();
    doc.render(&mut bytes)
        .map_err(|e| LaureaError::Render(format!("PDF render failed: {}", e)))?;
    // tmp must outlive render; dropped here.
    drop(tmp);
    Ok(bytes)
}
