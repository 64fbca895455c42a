//! # Laurea - Certificate Design & Generation Engine
//!
//! Laurea is the headless engine of a browser-based certificate design
//! tool. It provides:
//!
//! - **Document model**: positioned text, image, shape and line elements
//!   with a flat JSON representation
//! - **History**: snapshot-based undo/redo
//! - **Editing**: the canvas interaction state machine (drag, resize,
//!   inline text and variable editing)
//! - **Variable binding**: `{{name}}` interpolation against CSV datasets
//! - **Rendering**: rasterization to RGBA pages
//! - **Generation**: one certificate per data row, packaged as PNG, JPEG
//!   or PDF, zipped for multi-row batches
//!
//! ## Quick Start
//!
//! ```no_run
//! use laurea::binding::Dataset;
//! use laurea::document::{DesignElement, Document, ElementKind, TextElement};
//! use laurea::generate::{Generator, OutputFormat, OutputOptions};
//! use laurea::render::{AssetCache, FontStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), laurea::LaureaError> {
//! let mut doc = Document::new();
//! doc.add(DesignElement::new_at(
//!     ElementKind::Text(TextElement::new("Awarded to {{name}}")),
//!     200.0,
//!     300.0,
//! ))?;
//!
//! let dataset = Dataset::from_csv(b"name\nAlice\nBob\n")?;
//! let generator = Generator::new(Arc::new(FontStore::empty()), AssetCache::new());
//! let output = generator
//!     .generate(
//!         &doc,
//!         &dataset,
//!         &OutputOptions::new(OutputFormat::Png),
//!         None,
//!         None,
//!         |percent| println!("{}%", percent),
//!     )
//!     .await?;
//! # let _ = output;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Element model, document, history |
//! | [`editor`] | Canvas interaction state machine |
//! | [`binding`] | Variable resolution and CSV datasets |
//! | [`render`] | Rasterization, fonts, asset fetching |
//! | [`generate`] | Batch generation and packaging |
//! | [`server`] | Axum JSON API |
//! | [`error`] | Error types |

pub mod binding;
pub mod document;
pub mod editor;
pub mod error;
pub mod generate;
pub mod render;
pub mod server;

// Re-exports for convenience
pub use document::{DesignElement, Document, ElementKind};
pub use editor::EditorSession;
pub use error::LaureaError;
