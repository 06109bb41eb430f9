//! Per-session one-shot gate
//!
//! Some events must fire exactly once per game session no matter how many
//! consumers re-evaluate the state that produces them (the finished-game
//! notification is the canonical case). Instead of an ambient global flag,
//! the gate is an owned object injected into whoever needs it, and reset
//! wholesale when the session changes.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct SessionGate {
    fired: HashSet<String>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a key is seen in this session, false on
    /// every later call with the same key.
    pub fn fire_once(&mut self, key: &str) -> bool {
        self.fired.insert(key.to_string())
    }

    /// True if the key has already fired this session.
    pub fn has_fired(&self, key: &str) -> bool {
        self.fired.contains(key)
    }

    /// Forget everything; called on session/game change.
    pub fn reset(&mut self) {
        self.fired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_exactly_once() {
        let mut gate = SessionGate::new();
        assert!(gate.fire_once("game_finished"));
        assert!(!gate.fire_once("game_finished"));
        assert!(gate.has_fired("game_finished"));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut gate = SessionGate::new();
        assert!(gate.fire_once("a"));
        assert!(gate.fire_once("b"));
        assert!(!gate.fire_once("a"));
    }

    #[test]
    fn test_reset_rearms() {
        let mut gate = SessionGate::new();
        assert!(gate.fire_once("game_finished"));
        gate.reset();
        assert!(!gate.has_fired("game_finished"));
        assert!(gate.fire_once("game_finished"));
    }
}
