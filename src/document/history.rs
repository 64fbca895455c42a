//! Undo/redo history for the element collection.
//!
//! Whole-collection snapshots, not deltas. Documents are tens of elements,
//! clones are cheap, and snapshot restore can never drift out of sync the
//! way inverse-operation replay can.

use super::DesignElement;

/// A full copy of a document's element collection.
pub type Snapshot = Vec<DesignElement>;

/// Oldest entries are evicted beyond this depth.
const MAX_DEPTH: usize = 100;

/// Two stacks of snapshots.
///
/// The undo stack holds pre-mutation states: callers snapshot the document
/// *before* a change and [`commit`] it once the change lands. Undo pops the
/// most recent pre-state and parks the current state on the redo stack;
/// redo is the mirror image.
///
/// [`commit`]: History::commit
#[derive(Debug, Default)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state a just-applied change started from.
    ///
    /// Clears the redo stack: once the timeline diverges, the abandoned
    /// branch is unreachable.
    pub fn commit(&mut self, before: Snapshot) {
        self.undo.push(before);
        self.redo.clear();
        if self.undo.len() > MAX_DEPTH {
            self.undo.remove(0);
        }
    }

    /// Step back: returns the snapshot to restore, or `None` when there is
    /// nothing to undo. `current` is parked for redo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.undo.pop()?;
        self.redo.push(current);
        Some(restored)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.redo.pop()?;
        self.undo.push(current);
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// (undo depth, redo depth) — used by the session to report UI state.
    pub fn depths(&self) -> (usize, usize) {
        (self.undo.len(), self.redo.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ElementKind, TextElement};
    use pretty_assertions::assert_eq;

    fn snap(ids: &[&str]) -> Snapshot {
        ids.iter()
            .map(|id| {
                let mut el = crate::document::DesignElement::new_at(
                    ElementKind::Text(TextElement::new(*id)),
                    0.0,
                    0.0,
                );
                el.id = id.to_string();
                el
            })
            .collect()
    }

    fn ids(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn undo_restores_committed_state() {
        let mut h = History::new();
        h.commit(snap(&["a"]));
        let restored = h.undo(snap(&["a", "b"])).unwrap();
        assert_eq!(ids(&restored), vec!["a"]);
    }

    #[test]
    fn undo_then_redo_is_identity() {
        let mut h = History::new();
        h.commit(snap(&["a"]));
        let current = snap(&["a", "b"]);
        let undone = h.undo(current.clone()).unwrap();
        let redone = h.redo(undone).unwrap();
        assert_eq!(ids(&redone), ids(&current));
        assert!(h.can_undo());
        assert!(!h.can_redo());
    }

    #[test]
    fn undo_redo_on_empty_stacks_return_none() {
        let mut h = History::new();
        assert!(h.undo(snap(&["x"])).is_none());
        assert!(h.redo(snap(&["x"])).is_none());
        // Failed undo must not pollute the redo stack.
        assert!(!h.can_redo());
    }

    #[test]
    fn commit_after_undo_clears_redo() {
        let mut h = History::new();
        h.commit(snap(&["a"]));
        h.undo(snap(&["a", "b"])).unwrap();
        assert!(h.can_redo());
        h.commit(snap(&["a"]));
        assert!(!h.can_redo());
    }

    #[test]
    fn stack_shape_after_interleaved_commits_and_undos() {
        // 3 commits, 2 undos, 1 commit: undo depth 2, redo depth 0.
        let mut h = History::new();
        h.commit(snap(&[]));
        h.commit(snap(&["a"]));
        h.commit(snap(&["a", "b"]));
        h.undo(snap(&["a", "b", "c"])).unwrap();
        h.undo(snap(&["a", "b"])).unwrap();
        h.commit(snap(&["a"]));
        assert_eq!(h.depths(), (2, 0));
    }

    #[test]
    fn depth_is_capped() {
        let mut h = History::new();
        for i in 0..150 {
            h.commit(snap(&[i.to_string().as_str()]));
        }
        assert_eq!(h.depths().0, 100);
        // Oldest entries were evicted: the deepest undo lands on commit #50.
        let mut last = None;
        for i in (0..150).rev() {
            if let Some(s) = h.undo(snap(&[i.to_string().as_str()])) {
                last = Some(s);
            } else {
                break;
            }
        }
        assert_eq!(ids(&last.unwrap()), vec!["50"]);
    }
}
