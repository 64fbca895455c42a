//! # Editor Session
//!
//! The canvas interaction controller: one session per open design, owning
//! the document, its history, and the in-flight gesture state.
//!
//! Gesture state is a single [`Interaction`] enum. A session is always in
//! exactly one interaction; impossible combinations (dragging while editing
//! text) are unrepresentable.
//!
//! Pointer positions arrive in *screen* space; the session divides by the
//! zoom factor to get document space. History granularity is one entry per
//! completed gesture: drags and resizes commit on pointer-up, text and
//! variable edits on confirm, creation clicks immediately.

use crate::document::{
    default_element, DesignElement, Document, ElementKind, ElementPatch, History, Snapshot,
    MIN_ELEMENT_SIZE,
};

/// Corner-handle hit tolerance, in screen pixels (zoom-independent).
const HANDLE_HIT_PX: f64 = 8.0;

const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 8.0;

/// The active canvas tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Pan,
    Text,
    Image,
    Rectangle,
    Circle,
    Line,
}

impl Tool {
    /// The element kind name a creation tool instantiates, if any.
    fn creates(self) -> Option<&'static str> {
        match self {
            Tool::Text => Some("text"),
            Tool::Image => Some("image"),
            Tool::Rectangle => Some("rectangle"),
            Tool::Circle => Some("circle"),
            Tool::Line => Some("line"),
            Tool::Select | Tool::Pan => None,
        }
    }
}

/// A screen-space position in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Corners of an element's box, for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Corner {
    const ALL: [Corner; 4] = [
        Corner::NorthWest,
        Corner::NorthEast,
        Corner::SouthWest,
        Corner::SouthEast,
    ];

    /// Document-space position of this corner on an element.
    fn position(self, el: &DesignElement) -> (f64, f64) {
        match self {
            Corner::NorthWest => (el.x, el.y),
            Corner::NorthEast => (el.x + el.width, el.y),
            Corner::SouthWest => (el.x, el.y + el.height),
            Corner::SouthEast => (el.x + el.width, el.y + el.height),
        }
    }

    fn opposite(self) -> Corner {
        match self {
            Corner::NorthWest => Corner::SouthEast,
            Corner::NorthEast => Corner::SouthWest,
            Corner::SouthWest => Corner::NorthEast,
            Corner::SouthEast => Corner::NorthWest,
        }
    }
}

/// Keyboard modifier state accompanying an event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    /// The platform primary modifier: Ctrl on Linux/Windows, Cmd on macOS.
    pub fn primary(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Keys the session responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Z,
    Y,
    Delete,
    Backspace,
    Enter,
    Escape,
}

/// The in-flight gesture, if any.
#[derive(Debug)]
pub enum Interaction {
    Idle,
    /// Moving an element under the pointer. `grab` is the document-space
    /// offset from the element origin to the press point, so the element
    /// doesn't jump to the cursor.
    Dragging {
        id: String,
        grab: (f64, f64),
        before: Snapshot,
        moved: bool,
    },
    /// Resizing from one corner; the opposite corner stays fixed.
    Resizing {
        id: String,
        anchor: (f64, f64),
        before: Snapshot,
        changed: bool,
    },
    /// Inline text editing with a draft buffer.
    EditingText {
        id: String,
        draft: String,
        original: String,
    },
    /// Editing the variable binding name of a text element.
    EditingVariable { id: String, draft: String },
}

impl Interaction {
    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }
}

/// One editing session: document + history + tool + gesture state.
pub struct EditorSession {
    pub document: Document,
    history: History,
    pub tool: Tool,
    zoom: f64,
    selection: Option<String>,
    interaction: Interaction,
}

impl EditorSession {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            history: History::new(),
            tool: Tool::Select,
            zoom: 1.0,
            selection: None,
            interaction: Interaction::Idle,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom factor, clamped to a sane range.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Switching tools cancels any in-flight gesture without committing.
    pub fn set_tool(&mut self, tool: Tool) {
        self.interaction = Interaction::Idle;
        self.tool = tool;
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn selected_element(&self) -> Option<&DesignElement> {
        self.selection
            .as_deref()
            .and_then(|id| self.document.element(id))
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn to_doc(&self, p: Point) -> (f64, f64) {
        (p.x / self.zoom, p.y / self.zoom)
    }

    /// The corner handle of the current selection under a screen point,
    /// if any. Handles are square, `HANDLE_HIT_PX` screen pixels around
    /// each corner regardless of zoom.
    fn handle_at(&self, p: Point) -> Option<(String, Corner)> {
        let el = self.selected_element().filter(|e| !e.locked)?;
        let (dx, dy) = self.to_doc(p);
        let tolerance = HANDLE_HIT_PX / self.zoom;
        for corner in Corner::ALL {
            let (cx, cy) = corner.position(el);
            if (dx - cx).abs() <= tolerance && (dy - cy).abs() <= tolerance {
                return Some((el.id.clone(), corner));
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Pointer events
    // ------------------------------------------------------------------

    pub fn pointer_down(&mut self, p: Point) {
        match self.interaction {
            // Clicking away from an open editor commits the draft, like
            // blurring an input field.
            Interaction::EditingText { .. } | Interaction::EditingVariable { .. } => {
                self.commit_edit();
            }
            // A stray down during another gesture restarts cleanly.
            _ => self.interaction = Interaction::Idle,
        }

        if let Some(kind) = self.tool.creates() {
            let (x, y) = self.to_doc(p);
            if let Some(el) = default_element(kind, x, y) {
                let before = self.document.snapshot();
                let id = el.id.clone();
                if self.document.add(el).is_ok() {
                    self.history.commit(before);
                    self.selection = Some(id);
                }
            }
            return;
        }

        if self.tool != Tool::Select {
            return;
        }

        if let Some((id, corner)) = self.handle_at(p) {
            let anchor = self
                .document
                .element(&id)
                .map(|el| corner.opposite().position(el));
            if let Some(anchor) = anchor {
                self.interaction = Interaction::Resizing {
                    id,
                    anchor,
                    before: self.document.snapshot(),
                    changed: false,
                };
            }
            return;
        }

        let (x, y) = self.to_doc(p);
        match self.document.element_at(x, y, true) {
            Some(el) => {
                let id = el.id.clone();
                let grab = (x - el.x, y - el.y);
                self.selection = Some(id.clone());
                self.interaction = Interaction::Dragging {
                    id,
                    grab,
                    before: self.document.snapshot(),
                    moved: false,
                };
            }
            None => {
                self.selection = None;
            }
        }
    }

    pub fn pointer_move(&mut self, p: Point) {
        let (x, y) = self.to_doc(p);
        // Compute the target geometry first; the patch and the `moved`
        // flag both need `&mut self` afterwards.
        let pending = match &self.interaction {
            Interaction::Dragging { id, grab, .. } => {
                Some((id.clone(), ElementPatch::position(x - grab.0, y - grab.1)))
            }
            Interaction::Resizing { id, anchor, .. } => {
                let (ax, ay) = *anchor;
                let width = (x - ax).abs().max(MIN_ELEMENT_SIZE);
                let height = (y - ay).abs().max(MIN_ELEMENT_SIZE);
                let nx = if x < ax { ax - width } else { ax };
                let ny = if y < ay { ay - height } else { ay };
                Some((id.clone(), ElementPatch::geometry(nx, ny, width, height)))
            }
            _ => None,
        };
        let Some((id, patch)) = pending else {
            return;
        };

        let differs = self
            .document
            .element(&id)
            .map(|el| {
                patch.x.map(|v| v != el.x).unwrap_or(false)
                    || patch.y.map(|v| v != el.y).unwrap_or(false)
                    || patch.width.map(|v| v != el.width).unwrap_or(false)
                    || patch.height.map(|v| v != el.height).unwrap_or(false)
            })
            .unwrap_or(false);
        if differs {
            self.document.update(&id, &patch);
            match &mut self.interaction {
                Interaction::Dragging { moved, .. } => *moved = true,
                Interaction::Resizing { changed, .. } => *changed = true,
                _ => {}
            }
        }
    }

    pub fn pointer_up(&mut self, _p: Point) {
        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::Dragging { before, moved, .. } if moved => {
                self.history.commit(before);
            }
            Interaction::Resizing {
                before, changed, ..
            } if changed => {
                self.history.commit(before);
            }
            // Motionless press-release is a selection click; editing states
            // survive pointer-up (they end via commit/cancel).
            other @ (Interaction::EditingText { .. } | Interaction::EditingVariable { .. }) => {
                self.interaction = other;
            }
            _ => {}
        }
    }

    /// Double-click: plain on a text element opens inline text editing;
    /// with the primary modifier it opens variable-binding editing.
    pub fn double_click(&mut self, p: Point, mods: Modifiers) {
        let (x, y) = self.to_doc(p);
        let Some(el) = self.document.element_at(x, y, true) else {
            return;
        };
        let ElementKind::Text(text) = &el.kind else {
            return;
        };
        let id = el.id.clone();
        self.selection = Some(id.clone());
        self.interaction = if mods.primary() {
            Interaction::EditingVariable {
                id,
                draft: text.variable.clone().unwrap_or_default(),
            }
        } else {
            Interaction::EditingText {
                id,
                original: text.content.clone(),
                draft: text.content.clone(),
            }
        };
    }

    /// Context menu "bind variable" on the selected text element.
    pub fn edit_variable(&mut self) {
        let target = self.selected_element().and_then(|el| match &el.kind {
            ElementKind::Text(text) => {
                Some((el.id.clone(), text.variable.clone().unwrap_or_default()))
            }
            _ => None,
        });
        if let Some((id, draft)) = target {
            self.interaction = Interaction::EditingVariable { id, draft };
        }
    }

    /// Replace the draft buffer while an edit is open. No-op otherwise.
    pub fn input(&mut self, value: &str) {
        match &mut self.interaction {
            Interaction::EditingText { draft, .. }
            | Interaction::EditingVariable { draft, .. } => {
                *draft = value.to_string();
            }
            _ => {}
        }
    }

    /// Confirm the open edit (Enter or blur). One history entry when the
    /// edit actually changed something.
    pub fn commit_edit(&mut self) {
        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::EditingText {
                id,
                draft,
                original,
            } => {
                if draft != original {
                    let before = self.document.snapshot();
                    if self.document.update(
                        &id,
                        &ElementPatch {
                            content: Some(draft),
                            ..Default::default()
                        },
                    ) {
                        self.history.commit(before);
                    }
                }
            }
            Interaction::EditingVariable { id, draft } => {
                let name = draft.trim().to_string();
                let is_variable = !name.is_empty();
                let unchanged = self
                    .document
                    .element(&id)
                    .map(|el| match &el.kind {
                        ElementKind::Text(t) => {
                            t.is_variable == is_variable
                                && t.variable.as_deref().unwrap_or("") == name
                        }
                        _ => true,
                    })
                    .unwrap_or(true);
                if !unchanged {
                    let before = self.document.snapshot();
                    if self.document.update(
                        &id,
                        &ElementPatch {
                            is_variable: Some(is_variable),
                            variable: Some(name),
                            ..Default::default()
                        },
                    ) {
                        self.history.commit(before);
                    }
                }
            }
            other => self.interaction = other,
        }
    }

    /// Abandon the open edit (Escape); the document is untouched.
    pub fn cancel_edit(&mut self) {
        if matches!(
            self.interaction,
            Interaction::EditingText { .. } | Interaction::EditingVariable { .. }
        ) {
            self.interaction = Interaction::Idle;
        }
    }

    // ------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------

    pub fn key(&mut self, key: Key, mods: Modifiers) {
        match key {
            Key::Escape => {
                if self.interaction.is_idle() {
                    self.selection = None;
                } else {
                    // Drops drag/resize state too; mid-gesture geometry stays
                    // as last moved, uncommitted.
                    self.cancel_edit();
                    if !self.interaction.is_idle() {
                        self.interaction = Interaction::Idle;
                    }
                }
            }
            // Shift+Enter is reserved for newlines inside a text draft.
            Key::Enter if !mods.shift => self.commit_edit(),
            Key::Z if mods.primary() && mods.shift => self.redo(),
            Key::Z if mods.primary() => self.undo(),
            Key::Y if mods.primary() => self.redo(),
            Key::Delete | Key::Backspace if mods.primary() => self.delete_selection(),
            _ => {}
        }
    }

    /// Delete the current selection. Locked elements are not deletable.
    pub fn delete_selection(&mut self) {
        let Some(id) = self.selection.clone() else {
            return;
        };
        if self
            .document
            .element(&id)
            .map(|el| el.locked)
            .unwrap_or(true)
        {
            return;
        }
        let before = self.document.snapshot();
        if self.document.remove(&id) {
            self.history.commit(before);
            self.selection = None;
        }
    }

    pub fn undo(&mut self) {
        if let Some(snapshot) = self.history.undo(self.document.snapshot()) {
            self.document.restore(snapshot);
            self.interaction = Interaction::Idle;
            self.prune_selection();
        }
    }

    pub fn redo(&mut self) {
        if let Some(snapshot) = self.history.redo(self.document.snapshot()) {
            self.document.restore(snapshot);
            self.interaction = Interaction::Idle;
            self.prune_selection();
        }
    }

    fn prune_selection(&mut self) {
        if let Some(id) = &self.selection {
            if self.document.element(id).is_none() {
                self.selection = None;
            }
        }
    }

    // ------------------------------------------------------------------
    // Programmatic mutations (used by the HTTP surface)
    // ------------------------------------------------------------------

    /// Add an element as one history step.
    pub fn add_element(&mut self, element: DesignElement) -> Result<(), crate::LaureaError> {
        let before = self.document.snapshot();
        self.document.add(element)?;
        self.history.commit(before);
        Ok(())
    }

    /// Patch an element as one history step. Unknown ids are a no-op.
    pub fn update_element(&mut self, id: &str, patch: &ElementPatch) {
        let before = self.document.snapshot();
        if self.document.update(id, patch) {
            self.history.commit(before);
        }
    }

    /// Set a document-level static interpolation variable.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.document.variables.insert(name.into(), value.into());
    }

    /// History depths as (undo, redo), for UI affordances.
    pub fn history_depths(&self) -> (usize, usize) {
        self.history.depths()
    }
}
