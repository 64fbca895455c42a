//! # Batch Certificate Generation
//!
//! Renders one certificate per dataset row and packages the results:
//! exactly one row yields the bare file, more rows yield a zip archive
//! with one uniquely-named entry per row, in dataset order.
//!
//! Rows are rendered sequentially with a `yield_now` between them so a
//! long batch doesn't starve the server's event loop. Progress is reported
//! as an integer percent after each completed row. Any row failure aborts
//! the whole batch; there is no partial output.

mod pdf;

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::binding::{value_to_string, Dataset};
use crate::document::Document;
use crate::render::{render_document, AssetCache, FontStore};
use crate::LaureaError;

/// Output encoding for generated certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpg,
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpg => "image/jpeg",
            OutputFormat::Pdf => "application/pdf",
        }
    }
}

fn default_quality() -> u8 {
    90
}

/// Options for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// JPEG quality, 0-100. Ignored for PNG and PDF.
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Dataset column whose value names each file. Missing or empty values
    /// fall back to `certificate-<n>`.
    #[serde(default)]
    pub filename_field: Option<String>,
}

impl OutputOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            quality: default_quality(),
            filename_field: None,
        }
    }
}

/// Credit precondition: the whole batch must be affordable before any row
/// is rendered. Balance mutation itself lives with the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreditCheck {
    pub cost_per_certificate: u64,
    pub available_points: u64,
}

/// Cooperative cancellation, checked between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// One generated file, named and typed.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The result of a batch: a bare file for one row, an archive otherwise.
#[derive(Debug)]
pub enum BatchOutput {
    Single(GeneratedFile),
    Archive(GeneratedFile),
}

impl BatchOutput {
    pub fn file(&self) -> &GeneratedFile {
        match self {
            BatchOutput::Single(f) | BatchOutput::Archive(f) => f,
        }
    }
}

/// Batch generator: rendering resources plus packaging policy.
pub struct Generator {
    fonts: Arc<FontStore>,
    assets: AssetCache,
    /// Directory holding at least one TTF, required for PDF output.
    pdf_fonts_dir: Option<PathBuf>,
}

impl Generator {
    pub fn new(fonts: Arc<FontStore>, assets: AssetCache) -> Self {
        Self {
            fonts,
            assets,
            pdf_fonts_dir: None,
        }
    }

    pub fn with_pdf_fonts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pdf_fonts_dir = Some(dir.into());
        self
    }

    /// Run one batch.
    ///
    /// Preconditions are checked before any rendering: a design with no
    /// elements, an empty dataset, or an unaffordable batch fail fast.
    /// `progress` receives the percent complete after each row.
    pub async fn generate(
        &self,
        doc: &Document,
        dataset: &Dataset,
        options: &OutputOptions,
        credit: Option<CreditCheck>,
        cancel: Option<&CancelToken>,
        mut progress: impl FnMut(u8),
    ) -> Result<BatchOutput, LaureaError> {
        if doc.elements.is_empty() {
            return Err(LaureaError::EmptyDesign);
        }
        let total = dataset.rows.len();
        if total == 0 {
            return Err(LaureaError::NoData);
        }
        if let Some(credit) = credit {
            let required = credit.cost_per_certificate.saturating_mul(total as u64);
            if required > credit.available_points {
                return Err(LaureaError::InsufficientPoints {
                    required,
                    available: credit.available_points,
                });
            }
        }

        let assets = self.assets.resolve_document(doc).await?;

        tracing::info!(rows = total, format = ?options.format, "starting batch");
        let mut files: Vec<GeneratedFile> = Vec::with_capacity(total);
        let mut used_names: HashSet<String> = HashSet::new();

        for (index, row) in dataset.rows.iter().enumerate() {
            if cancel.map(CancelToken::is_cancelled).unwrap_or(false) {
                return Err(LaureaError::Cancelled);
            }

            let page = render_document(doc, row, &assets, &self.fonts)?;
            let bytes = self.encode(&page, options)?;

            let requested = options
                .filename_field
                .as_deref()
                .and_then(|field| row.get(field))
                .filter(|v| !v.is_null())
                .map(value_to_string)
                .map(|v| sanitize_filename(&v))
                .filter(|v| !v.is_empty());
            let base = requested.unwrap_or_else(|| format!("certificate-{}", index + 1));
            let name = dedupe_name(&base, options.format.extension(), &mut used_names);

            files.push(GeneratedFile {
                name,
                content_type: options.format.content_type().to_string(),
                bytes,
            });

            progress(((index + 1) as f32 / total as f32 * 100.0) as u8);
            tokio::task::yield_now().await;
        }

        if files.len() == 1 {
            let file = files.pop().ok_or(LaureaError::NoData)?;
            return Ok(BatchOutput::Single(file));
        }
        Ok(BatchOutput::Archive(pack_zip(files)?))
    }

    fn encode(&self, page: &RgbaImage, options: &OutputOptions) -> Result<Vec<u8>, LaureaError> {
        let mut bytes = Vec::new();
        match options.format {
            OutputFormat::Png => {
                image::DynamicImage::ImageRgba8(page.clone())
                    .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                    .map_err(|e| LaureaError::Render(format!("PNG encode failed: {}", e)))?;
            }
            OutputFormat::Jpg => {
                let rgb = image::DynamicImage::ImageRgba8(page.clone()).to_rgb8();
                let mut cursor = Cursor::new(&mut bytes);
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut cursor,
                    options.quality.min(100),
                );
                rgb.write_with_encoder(encoder)
                    .map_err(|e| LaureaError::Render(format!("JPEG encode failed: {}", e)))?;
            }
            OutputFormat::Pdf => {
                let dir = self.pdf_fonts_dir.as_deref().ok_or_else(|| {
                    LaureaError::Render("PDF output requires a fonts directory".into())
                })?;
                bytes = pdf::raster_to_pdf(page, dir)?;
            }
        }
        Ok(bytes)
    }
}

/// Keep filename-safe characters, replace runs of anything else with `-`.
fn sanitize_filename(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_dash = true;
    for ch in value.trim().chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == '-' {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out.truncate(100);
    out
}

/// Reserve a unique `<base>.<ext>`, suffixing `-2`, `-3`, … on collision.
fn dedupe_name(base: &str, ext: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = format!("{}.{}", base, ext);
    let mut counter = 2;
    while used.contains(&candidate) {
        candidate = format!("{}-{}.{}", base, counter, ext);
        counter += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Pack files into a single in-memory zip, preserving order.
fn pack_zip(files: Vec<GeneratedFile>) -> Result<GeneratedFile, LaureaError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let zip_options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for file in &files {
        writer
            .start_file(file.name.clone(), zip_options)
            .map_err(|e| LaureaError::Archive(e.to_string()))?;
        writer
            .write_all(&file.bytes)
            .map_err(|e| LaureaError::Archive(e.to_string()))?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| LaureaError::Archive(e.to_string()))?;
    Ok(GeneratedFile {
        name: "certificates.zip".to_string(),
        content_type: "application/zip".to_string(),
        bytes: cursor.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DesignElement, ElementKind, TextElement};
    use pretty_assertions::assert_eq;

    fn one_text_doc() -> Document {
        let mut doc = Document::new();
        doc.width = 300.0;
        doc.height = 100.0;
        let mut el =
            DesignElement::new_at(ElementKind::Text(TextElement::bound("name")), 10.0, 10.0);
        el.id = "t".into();
        doc.add(el).unwrap();
        doc
    }

    fn names_dataset(names: &[&str]) -> Dataset {
        let mut csv = String::from("name\n");
        for n in names {
            csv.push_str(n);
            csv.push('\n');
        }
        Dataset::from_csv(csv.as_bytes()).unwrap()
    }

    fn generator() -> Generator {
        Generator::new(Arc::new(FontStore::empty()), AssetCache::new())
    }

    #[test]
    fn sanitize_keeps_safe_chars_and_collapses_junk() {
        assert_eq!(sanitize_filename("Alice Smith"), "Alice-Smith");
        assert_eq!(sanitize_filename("  a/b\\c : d  "), "a-b-c-d");
        assert_eq!(sanitize_filename("n_1-ok"), "n_1-ok");
        assert_eq!(sanitize_filename("!!!"), "");
    }

    #[test]
    fn dedupe_appends_numeric_suffix() {
        let mut used = HashSet::new();
        assert_eq!(dedupe_name("alice", "png", &mut used), "alice.png");
        assert_eq!(dedupe_name("alice", "png", &mut used), "alice-2.png");
        assert_eq!(dedupe_name("alice", "png", &mut used), "alice-3.png");
        assert_eq!(dedupe_name("bob", "png", &mut used), "bob.png");
    }

    #[tokio::test]
    async fn empty_design_fails_before_rendering() {
        let err = generator()
            .generate(
                &Document::new(),
                &names_dataset(&["Alice"]),
                &OutputOptions::new(OutputFormat::Png),
                None,
                None,
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LaureaError::EmptyDesign));
    }

    #[tokio::test]
    async fn empty_dataset_fails_before_rendering() {
        let err = generator()
            .generate(
                &one_text_doc(),
                &names_dataset(&[]),
                &OutputOptions::new(OutputFormat::Png),
                None,
                None,
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LaureaError::NoData));
    }

    #[tokio::test]
    async fn insufficient_points_reports_required_and_available() {
        let err = generator()
            .generate(
                &one_text_doc(),
                &names_dataset(&["Alice", "Bob", "Cleo"]),
                &OutputOptions::new(OutputFormat::Png),
                Some(CreditCheck {
                    cost_per_certificate: 10,
                    available_points: 25,
                }),
                None,
                |_| {},
            )
            .await
            .unwrap_err();
        match err {
            LaureaError::InsufficientPoints {
                required,
                available,
            } => {
                assert_eq!(required, 30);
                assert_eq!(available, 25);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn sufficient_points_proceed() {
        let out = generator()
            .generate(
                &one_text_doc(),
                &names_dataset(&["Alice"]),
                &OutputOptions::new(OutputFormat::Png),
                Some(CreditCheck {
                    cost_per_certificate: 10,
                    available_points: 10,
                }),
                None,
                |_| {},
            )
            .await
            .unwrap();
        assert!(matches!(out, BatchOutput::Single(_)));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_the_batch() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = generator()
            .generate(
                &one_text_doc(),
                &names_dataset(&["Alice", "Bob"]),
                &OutputOptions::new(OutputFormat::Png),
                None,
                Some(&cancel),
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LaureaError::Cancelled));
    }

    #[tokio::test]
    async fn progress_reaches_hundred_in_order() {
        let mut reported = Vec::new();
        generator()
            .generate(
                &one_text_doc(),
                &names_dataset(&["Alice", "Bob", "Cleo", "Dana"]),
                &OutputOptions::new(OutputFormat::Png),
                None,
                None,
                |p| reported.push(p),
            )
            .await
            .unwrap();
        assert_eq!(reported, vec![25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn single_row_yields_bare_file() {
        let out = generator()
            .generate(
                &one_text_doc(),
                &names_dataset(&["Alice"]),
                &OutputOptions::new(OutputFormat::Png),
                None,
                None,
                |_| {},
            )
            .await
            .unwrap();
        match out {
            BatchOutput::Single(file) => {
                assert_eq!(file.name, "certificate-1.png");
                assert_eq!(file.content_type, "image/png");
                assert!(!file.bytes.is_empty());
            }
            BatchOutput::Archive(_) => panic!("one row must not produce an archive"),
        }
    }

    #[tokio::test]
    async fn filename_field_names_files_with_dedupe() {
        let mut options = OutputOptions::new(OutputFormat::Png);
        options.filename_field = Some("name".into());
        let out = generator()
            .generate(
                &one_text_doc(),
                &names_dataset(&["Alice", "Alice", "Bob"]),
                &options,
                None,
                None,
                |_| {},
            )
            .await
            .unwrap();
        let file = out.file();
        let reader = zip::ZipArchive::new(Cursor::new(file.bytes.clone())).unwrap();
        let names: Vec<&str> = reader.file_names().collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"Alice.png"));
        assert!(names.contains(&"Alice-2.png"));
        assert!(names.contains(&"Bob.png"));
    }

    #[tokio::test]
    async fn jpg_output_is_encoded_jpeg() {
        let mut options = OutputOptions::new(OutputFormat::Jpg);
        options.quality = 80;
        let out = generator()
            .generate(
                &one_text_doc(),
                &names_dataset(&["Alice"]),
                &options,
                None,
                None,
                |_| {},
            )
            .await
            .unwrap();
        let file = out.file();
        assert_eq!(file.content_type, "image/jpeg");
        assert_eq!(&file.bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn pdf_without_fonts_dir_is_a_render_error() {
        let err = generator()
            .generate(
                &one_text_doc(),
                &names_dataset(&["Alice"]),
                &OutputOptions::new(OutputFormat::Pdf),
                None,
                None,
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LaureaError::Render(_)));
    }
}
