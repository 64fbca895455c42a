//! Element struct types for the design document model.
//!
//! All types derive `Serialize + Deserialize` so the same types work for
//! both Rust API construction and JSON deserialization.
//!
//! Each element kind implements [`ElementMeta`] to declare its display label,
//! editor default and starter size. This metadata is used by the web editor
//! palette and by the creation tools.

use serde::{Deserialize, Serialize};

use super::ElementKind;

/// Smallest width/height (in document units) an interactive resize may
/// produce, enforced per axis.
pub const MIN_ELEMENT_SIZE: f64 = 20.0;

/// Metadata that every element payload struct must provide.
///
/// The label and editor default live next to each struct definition,
/// so adding a new element kind is self-contained — implement this
/// trait and the compiler will guide you to the remaining exhaustive
/// matches in `ElementKind`.
pub trait ElementMeta: Sized {
    /// Human-readable display label (e.g. "Text", "Rectangle").
    fn label() -> &'static str;

    /// Sensible starter value for the web editor.
    ///
    /// Distinct from `Default` — editor defaults have example content
    /// so new elements are immediately useful, not empty.
    fn editor_default() -> Self;

    /// Starter (width, height) in document units for creation tools.
    fn default_size() -> (f64, f64);
}

fn default_opacity() -> f32 {
    1.0
}

/// One positioned visual object on the design canvas.
///
/// Common geometry and stacking attributes live on the struct; the
/// kind-specific payload is flattened in, so the JSON shape is a flat
/// object with a `"type"` tag:
///
/// ```json
/// {"id": "…", "type": "text", "x": 100, "y": 80, "width": 240, "height": 60,
///  "content": "Hello {{name}}"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignElement {
    /// Opaque identifier, unique within a document's lifetime (never reused).
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees around the element's center.
    #[serde(default)]
    pub rotation: f64,
    /// Opacity (0.0 = transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Stacking order. Higher paints later; ties break by insertion order.
    #[serde(default)]
    pub z: i32,
    /// Locked elements are excluded from drag, resize and delete.
    #[serde(default)]
    pub locked: bool,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl DesignElement {
    /// Create an element of the given kind at a position, with a fresh id
    /// and the kind's starter size.
    pub fn new_at(kind: ElementKind, x: f64, y: f64) -> Self {
        let (width, height) = kind.default_size();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            x,
            y,
            width,
            height,
            rotation: 0.0,
            opacity: 1.0,
            z: 1,
            locked: false,
            kind,
        }
    }

    /// Check geometry invariants: all fields finite, sizes non-negative.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("element id must not be empty".into());
        }
        for (name, v) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
            ("rotation", self.rotation),
        ] {
            if !v.is_finite() {
                return Err(format!("{} must be finite, got {}", name, v));
            }
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(format!(
                "size must be non-negative, got {}x{}",
                self.width, self.height
            ));
        }
        if !self.opacity.is_finite() {
            return Err("opacity must be finite".into());
        }
        Ok(())
    }

    /// Axis-aligned bounds as (x, y, width, height).
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.x, self.y, self.width, self.height)
    }

    /// Whether a document-space point falls inside the element's box.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

// ============================================================================
// TEXT
// ============================================================================

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical text alignment within the element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Font weight. Only two steps — certificates rarely need more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

fn default_font_size() -> f32 {
    32.0
}

fn default_line_height() -> f32 {
    1.2
}

fn default_text_color() -> String {
    "#000000".into()
}

/// Text styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    /// Optional TTF family name, looked up in the configured fonts directory.
    /// When absent (or not found) the built-in bitmap font is used.
    #[serde(default)]
    pub family: Option<String>,
    /// Font size in document units (pixels at 1:1 zoom).
    #[serde(default = "default_font_size")]
    pub size: f32,
    #[serde(default)]
    pub weight: FontWeight,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default)]
    pub align: TextAlign,
    /// Line height as a multiplier of the font size.
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    #[serde(default)]
    pub valign: VerticalAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            family: None,
            size: 32.0,
            weight: FontWeight::Normal,
            color: "#000000".into(),
            align: TextAlign::Left,
            line_height: 1.2,
            valign: VerticalAlign::Top,
        }
    }
}

/// Text element with optional variable binding.
///
/// When `is_variable` is true and the data row carries a value for
/// `variable`, the whole content is replaced at generation time.
/// Independent of that, `{{name}}` placeholders inside `content` are
/// substituted per row.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TextElement {
    pub content: String,
    #[serde(default)]
    pub is_variable: bool,
    /// Bound dataset column name. Meaningful only when `is_variable` is set.
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub style: TextStyle,
}

impl ElementMeta for TextElement {
    fn label() -> &'static str {
        "Text"
    }
    fn editor_default() -> Self {
        Self {
            content: "Certificate text".into(),
            ..Default::default()
        }
    }
    fn default_size() -> (f64, f64) {
        (240.0, 60.0)
    }
}

impl TextElement {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// A text element whose content is replaced wholesale by a bound column.
    pub fn bound(variable: impl Into<String>) -> Self {
        let variable = variable.into();
        Self {
            content: format!("{{{{{}}}}}", variable),
            is_variable: true,
            variable: Some(variable),
            ..Default::default()
        }
    }
}

// ============================================================================
// IMAGE
// ============================================================================

/// Image element. `source` is a URL or a `data:` URI; the renderer draws it
/// with cover fit (scale to fill the box, center-crop the overflow).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImageElement {
    pub source: String,
}

impl ElementMeta for ImageElement {
    fn label() -> &'static str {
        "Image"
    }
    fn editor_default() -> Self {
        Self::default()
    }
    fn default_size() -> (f64, f64) {
        (200.0, 200.0)
    }
}

// ============================================================================
// SHAPES
// ============================================================================

/// Border style for rectangle and circle elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
}

/// Optional shape border.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Border {
    pub width: f64,
    #[serde(default)]
    pub style: BorderStyle,
    pub color: String,
}

fn default_fill() -> String {
    "#e8e8e8".into()
}

/// Filled shape: used for both the rectangle and circle kinds.
/// A circle fills the ellipse inscribed in its box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeElement {
    #[serde(default = "default_fill")]
    pub fill: String,
    #[serde(default)]
    pub border: Option<Border>,
}

impl Default for ShapeElement {
    fn default() -> Self {
        Self {
            fill: default_fill(),
            border: None,
        }
    }
}

/// Rectangle payload — a [`ShapeElement`] with rectangle metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RectangleElement {
    #[serde(flatten)]
    pub shape: ShapeElement,
}

impl ElementMeta for RectangleElement {
    fn label() -> &'static str {
        "Rectangle"
    }
    fn editor_default() -> Self {
        Self::default()
    }
    fn default_size() -> (f64, f64) {
        (200.0, 120.0)
    }
}

/// Circle payload — a [`ShapeElement`] drawn as the inscribed ellipse.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CircleElement {
    #[serde(flatten)]
    pub shape: ShapeElement,
}

impl ElementMeta for CircleElement {
    fn label() -> &'static str {
        "Circle"
    }
    fn editor_default() -> Self {
        Self::default()
    }
    fn default_size() -> (f64, f64) {
        (160.0, 160.0)
    }
}

// ============================================================================
// LINE
// ============================================================================

/// Stroke style for line elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

fn default_thickness() -> f64 {
    2.0
}

fn default_line_color() -> String {
    "#000000".into()
}

/// Line element: a horizontal rule across the element box, vertically
/// centered. Rotation on the common attributes produces diagonal lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineElement {
    #[serde(default = "default_thickness")]
    pub thickness: f64,
    #[serde(default = "default_line_color")]
    pub color: String,
    #[serde(default)]
    pub stroke: StrokeStyle,
}

impl Default for LineElement {
    fn default() -> Self {
        Self {
            thickness: 2.0,
            color: "#000000".into(),
            stroke: StrokeStyle::Solid,
        }
    }
}

impl ElementMeta for LineElement {
    fn label() -> &'static str {
        "Line"
    }
    fn editor_default() -> Self {
        Self::default()
    }
    fn default_size() -> (f64, f64) {
        (200.0, 20.0)
    }
}
