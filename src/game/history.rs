//! Confirmed-move history store
//!
//! The ordered, append-only record of what the server has confirmed.
//! Index = ply - 1. Only server updates grow it; user intents never touch
//! it directly. The transport promises non-decreasing lengths, and this
//! store enforces that promise rather than trusting it: a shorter or
//! equal-length update is a no-op.
//!
//! `revision` increments on every accepted change to the token sequence
//! and is what the reconstructor keys its memo on. Annotations are display
//! metadata and do not bump the revision.

use tracing::warn;

use crate::game::types::{Annotation, MoveRecord};

#[derive(Debug, Default)]
pub struct MoveHistory {
    moves: Vec<MoveRecord>,
    revision: u64,
}

impl MoveHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn get(&self, index: usize) -> Option<&MoveRecord> {
        self.moves.get(index)
    }

    pub fn token_at(&self, index: usize) -> Option<&str> {
        self.moves.get(index).map(|m| m.token.as_str())
    }

    /// Identity of the current token sequence; changes iff the sequence
    /// changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a confirmed-history broadcast. Returns true if the history
    /// grew; shorter or equal-length updates are ignored.
    pub fn apply_update(&mut self, moves: Vec<MoveRecord>) -> bool {
        if moves.len() <= self.moves.len() {
            if moves.len() < self.moves.len() {
                warn!(
                    "[HISTORY] Ignoring non-increasing update: {} -> {}",
                    self.moves.len(),
                    moves.len()
                );
            }
            return false;
        }
        self.moves = moves;
        self.revision += 1;
        true
    }

    /// Wholesale replacement from a session snapshot; any length accepted.
    pub fn reset(&mut self, moves: Vec<MoveRecord>) {
        self.moves = moves;
        self.revision += 1;
    }

    /// Attach a late-arriving engine evaluation to one ply. The move token
    /// itself stays immutable.
    pub fn annotate(&mut self, index: usize, annotation: Annotation) -> bool {
        match self.moves.get_mut(index) {
            Some(record) => {
                record.annotation = Some(annotation);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(tokens: &[&str]) -> Vec<MoveRecord> {
        tokens.iter().map(|t| MoveRecord::plain(*t)).collect()
    }

    #[test]
    fn test_starts_empty() {
        let history = MoveHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
        assert_eq!(history.revision(), 0);
    }

    #[test]
    fn test_growth_accepted() {
        let mut history = MoveHistory::new();
        assert!(history.apply_update(records(&["7g7f"])));
        assert!(history.apply_update(records(&["7g7f", "3c3d"])));
        assert_eq!(history.len(), 2);
        assert_eq!(history.token_at(1), Some("3c3d"));
        assert_eq!(history.revision(), 2);
    }

    #[test]
    fn test_non_increasing_update_is_noop() {
        let mut history = MoveHistory::new();
        history.apply_update(records(&["7g7f", "3c3d"]));
        let revision = history.revision();

        assert!(!history.apply_update(records(&["7g7f"])));
        assert!(!history.apply_update(records(&["7g7f", "3c3d"])));
        assert_eq!(history.len(), 2);
        assert_eq!(history.revision(), revision, "No-op must not invalidate memos");
    }

    #[test]
    fn test_reset_accepts_any_length() {
        let mut history = MoveHistory::new();
        history.apply_update(records(&["7g7f", "3c3d", "8h2b+"]));
        history.reset(records(&["7g7f"]));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_annotate_keeps_revision() {
        let mut history = MoveHistory::new();
        history.apply_update(records(&["7g7f"]));
        let revision = history.revision();

        assert!(history.annotate(0, Annotation::default()));
        assert!(!history.annotate(5, Annotation::default()));
        assert!(history.get(0).unwrap().annotation.is_some());
        assert_eq!(history.revision(), revision);
    }
}
