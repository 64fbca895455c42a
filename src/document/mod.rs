//! # Design Document Model
//!
//! A single type hierarchy that is both the Rust API and the JSON API.
//! `Document` is constructible in Rust and deserializable from JSON.
//!
//! ```ignore
//! use laurea::document::*;
//!
//! // Rust construction
//! let mut doc = Document::new();
//! doc.add(DesignElement::new_at(
//!     ElementKind::Text(TextElement::new("Hello {{name}}")),
//!     100.0,
//!     80.0,
//! ))?;
//!
//! // JSON deserialization
//! let doc: Document = serde_json::from_str(
//!     r#"{"elements":[{"id":"a","type":"text","x":0,"y":0,"width":240,"height":60,"content":"hi"}]}"#,
//! )?;
//! ```
//!
//! The collection is owned by one editing session at a time; all mutation
//! happens on the main thread in response to pointer/keyboard events, so the
//! model carries no locking.

pub mod history;
pub mod types;

pub use history::{History, Snapshot};
pub use types::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Define the ElementKind enum and all dispatch methods from a single list.
///
/// Adding a new kind: add one line here, then define the struct in
/// `types.rs` with `impl ElementMeta`. That's it.
macro_rules! define_element_kinds {
    ($($variant:ident($inner:ty)),+ $(,)?) => {
        /// The element payload union.
        ///
        /// `#[serde(tag = "type")]` together with the flatten on
        /// [`DesignElement`] yields flat JSON objects tagged with
        /// `{"type": "text", ...}`.
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(tag = "type", rename_all = "snake_case")]
        pub enum ElementKind {
            $($variant($inner),)+
        }

        impl ElementKind {
            /// Human-readable display label (from [`ElementMeta::label`]).
            pub fn label(&self) -> &'static str {
                match self { $(ElementKind::$variant(_) => <$inner>::label(),)+ }
            }

            /// Starter size for creation tools (from [`ElementMeta::default_size`]).
            pub fn default_size(&self) -> (f64, f64) {
                match self { $(ElementKind::$variant(_) => <$inner>::default_size(),)+ }
            }

            /// Editor defaults for every element kind (from
            /// [`ElementMeta::editor_default`]).
            ///
            /// Single source of truth — [`element_kinds`] and
            /// [`default_element`] both derive from this.
            pub fn all_editor_defaults() -> Vec<Self> {
                vec![$(ElementKind::$variant(<$inner>::editor_default()),)+]
            }
        }
    };
}

define_element_kinds! {
    Text(TextElement),
    Image(ImageElement),
    Rectangle(RectangleElement),
    Circle(CircleElement),
    Line(LineElement),
}

fn default_page_width() -> f64 {
    1123.0
}

fn default_page_height() -> f64 {
    794.0
}

/// A certificate design: an ordered collection of elements plus page size.
///
/// Order is insertion order; visual stacking is by z-order (ties broken by
/// insertion order). Created empty or seeded from a template, replaced
/// wholesale when a template is applied, dropped when the session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Page width in document units (defaults to A4 landscape at 96 dpi).
    #[serde(default = "default_page_width")]
    pub width: f64,
    /// Page height in document units.
    #[serde(default = "default_page_height")]
    pub height: f64,
    pub elements: Vec<DesignElement>,
    /// Document-level static variables for `{{name}}` interpolation.
    /// Row values override these; these override the built-in date helpers.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            width: default_page_width(),
            height: default_page_height(),
            elements: Vec::new(),
            variables: HashMap::new(),
        }
    }
}

/// Partial update for [`Document::update`]. `None` fields are left untouched.
///
/// `variable: Some("")` clears the binding name; this keeps the patch
/// deserializable from flat JSON without nested optionals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub opacity: Option<f32>,
    pub z: Option<i32>,
    pub locked: Option<bool>,
    /// Text elements only; ignored for other kinds.
    pub content: Option<String>,
    pub is_variable: Option<bool>,
    pub variable: Option<String>,
    pub style: Option<TextStyle>,
    /// Rectangle/circle elements only.
    pub fill: Option<String>,
    /// Image elements only.
    pub source: Option<String>,
}

impl ElementPatch {
    /// A patch that only moves the element.
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    /// A patch that moves and resizes in one step (used by resize gestures).
    pub fn geometry(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }
}

impl Document {
    /// Create a new empty document with the default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fully-formed element.
    ///
    /// Fails with [`LaureaError::Validation`] when geometry fields are
    /// missing or non-finite; the document is left unmodified in that case.
    ///
    /// [`LaureaError::Validation`]: crate::LaureaError::Validation
    pub fn add(&mut self, element: DesignElement) -> Result<(), crate::LaureaError> {
        element
            .validate()
            .map_err(crate::LaureaError::Validation)?;
        self.elements.push(element);
        Ok(())
    }

    /// Merge a partial patch into the element matching `id`.
    ///
    /// Returns `true` when an element was found and patched. An unknown id
    /// is a silent no-op (`false`) — UI event handlers may race a concurrent
    /// delete, and that must not be an error.
    ///
    /// Patched geometry is sanitized rather than rejected: non-finite values
    /// are dropped, negative sizes clamp to zero.
    pub fn update(&mut self, id: &str, patch: &ElementPatch) -> bool {
        let Some(el) = self.elements.iter_mut().find(|e| e.id == id) else {
            return false;
        };

        fn set_finite(target: &mut f64, value: Option<f64>) {
            if let Some(v) = value {
                if v.is_finite() {
                    *target = v;
                }
            }
        }

        set_finite(&mut el.x, patch.x);
        set_finite(&mut el.y, patch.y);
        set_finite(&mut el.width, patch.width.map(|w| w.max(0.0)));
        set_finite(&mut el.height, patch.height.map(|h| h.max(0.0)));
        set_finite(&mut el.rotation, patch.rotation);
        if let Some(o) = patch.opacity {
            if o.is_finite() {
                el.opacity = o.clamp(0.0, 1.0);
            }
        }
        if let Some(z) = patch.z {
            el.z = z;
        }
        if let Some(locked) = patch.locked {
            el.locked = locked;
        }

        match &mut el.kind {
            ElementKind::Text(text) => {
                if let Some(content) = &patch.content {
                    text.content = content.clone();
                }
                if let Some(is_variable) = patch.is_variable {
                    text.is_variable = is_variable;
                }
                if let Some(variable) = &patch.variable {
                    let trimmed = variable.trim();
                    text.variable = if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed.to_string())
                    };
                }
                if let Some(style) = &patch.style {
                    text.style = style.clone();
                }
            }
            ElementKind::Rectangle(rect) => {
                if let Some(fill) = &patch.fill {
                    rect.shape.fill = fill.clone();
                }
            }
            ElementKind::Circle(circle) => {
                if let Some(fill) = &patch.fill {
                    circle.shape.fill = fill.clone();
                }
            }
            ElementKind::Image(image) => {
                if let Some(source) = &patch.source {
                    image.source = source.clone();
                }
            }
            ElementKind::Line(_) => {}
        }

        true
    }

    /// Remove the element matching `id`. Silent no-op if absent.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.elements.len();
        self.elements.retain(|e| e.id != id);
        self.elements.len() != before
    }

    /// Look up an element by id.
    pub fn element(&self, id: &str) -> Option<&DesignElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Indices into `elements` in painting order: ascending z, insertion
    /// order for ties.
    pub fn paint_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.elements.len()).collect();
        order.sort_by_key(|&i| self.elements[i].z);
        order
    }

    /// Topmost element whose box contains the document-space point.
    ///
    /// When `skip_locked` is set, locked elements are transparent to the hit
    /// test — a click on the locked background falls through to whatever is
    /// beneath it (usually nothing).
    pub fn element_at(&self, x: f64, y: f64, skip_locked: bool) -> Option<&DesignElement> {
        self.paint_order()
            .into_iter()
            .rev()
            .map(|i| &self.elements[i])
            .find(|e| e.contains(x, y) && !(skip_locked && e.locked))
    }

    /// Full copy of the element collection, for history snapshots.
    pub fn snapshot(&self) -> Snapshot {
        self.elements.clone()
    }

    /// Replace the element collection with a snapshot (undo/redo restore).
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.elements = snapshot;
    }
}

/// Element kind metadata for the editor palette.
#[derive(Debug, Clone, Serialize)]
pub struct ElementKindMeta {
    #[serde(rename = "type")]
    pub type_name: String,
    pub label: String,
}

/// Extract the serde type tag from an ElementKind (the `"type"` field).
fn serde_type_name(kind: &ElementKind) -> String {
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v["type"].as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Element kind metadata for the frontend palette.
///
/// Derived from [`ElementKind::all_editor_defaults`] — type names come from
/// serde serialization, labels from [`ElementKind::label`]. Both are
/// exhaustive matches on the enum, so the compiler catches new variants.
pub fn element_kinds() -> Vec<ElementKindMeta> {
    ElementKind::all_editor_defaults()
        .iter()
        .map(|k| ElementKindMeta {
            type_name: serde_type_name(k),
            label: k.label().to_string(),
        })
        .collect()
}

/// Create an element with editor defaults by kind name, placed at a position.
///
/// Returns `None` for unknown kind names.
pub fn default_element(type_name: &str, x: f64, y: f64) -> Option<DesignElement> {
    ElementKind::all_editor_defaults()
        .into_iter()
        .find(|k| serde_type_name(k) == type_name)
        .map(|kind| DesignElement::new_at(kind, x, y))
}
