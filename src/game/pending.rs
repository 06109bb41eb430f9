//! Optimistic move pipeline
//!
//! Staging for the one live move the local player may have in flight:
//! `Idle -> Confirm (only in confirmation mode) -> Sent -> Idle`. The
//! pipeline resolves back to idle when the confirmed history grows past
//! the recorded base length, or when the timeout window expires without
//! server reflection, whichever comes first, and exactly once.
//!
//! The predicted position shown while waiting is computed once, from the
//! position captured when the move was staged, and is purely cosmetic: it
//! is discarded wholesale the moment authoritative data arrives, never
//! merged.

use tracing::debug;

use crate::game::engine::{apply_token, NotationCodec, PositionEngine};
use crate::game::types::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStage {
    Confirm,
    Sent,
}

#[derive(Debug, Clone)]
pub struct PendingMove {
    pub token: String,
    pub base_position: Position,
    pub base_history_len: usize,
    pub stage: PendingStage,
    pub created_ms: u64,
}

/// What a submission did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Staged; waiting for the user to confirm. Nothing emitted.
    AwaitingConfirm,
    /// Staged and ready to send: emit this token now.
    Emit(String),
    /// A move is already outstanding; input dropped.
    Ignored,
}

/// Why the pipeline went back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The confirmed history now reflects the move.
    Confirmed,
    /// The server never reflected it inside the window; lock released so
    /// the user can retry.
    TimedOut,
}

#[derive(Debug)]
pub struct MovePipeline {
    pending: Option<PendingMove>,
    preview: Option<Position>,
    sent_ms: Option<u64>,
    confirmation_mode: bool,
    timeout_ms: u64,
}

impl MovePipeline {
    pub fn new(confirmation_mode: bool, timeout_ms: u64) -> Self {
        Self {
            pending: None,
            preview: None,
            sent_ms: None,
            confirmation_mode,
            timeout_ms,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn stage(&self) -> Option<PendingStage> {
        self.pending.as_ref().map(|p| p.stage)
    }

    /// The cosmetic predicted position, present only in the Sent stage.
    pub fn preview_position(&self) -> Option<&Position> {
        self.preview.as_ref()
    }

    /// Stage a new live move. `base_position` must be the position
    /// reconstructed from the current confirmed state.
    pub fn submit(
        &mut self,
        engine: &dyn PositionEngine,
        codec: &dyn NotationCodec,
        token: String,
        base_position: Position,
        history_len: usize,
        now_ms: u64,
    ) -> StageOutcome {
        if self.pending.is_some() {
            debug!("[PENDING] Input ignored, a move is already outstanding");
            return StageOutcome::Ignored;
        }

        let stage = if self.confirmation_mode {
            PendingStage::Confirm
        } else {
            PendingStage::Sent
        };
        self.pending = Some(PendingMove {
            token: token.clone(),
            base_position,
            base_history_len: history_len,
            stage,
            created_ms: now_ms,
        });

        if self.confirmation_mode {
            StageOutcome::AwaitingConfirm
        } else {
            self.mark_sent(engine, codec, now_ms);
            StageOutcome::Emit(token)
        }
    }

    /// User confirmed the staged move: transition Confirm -> Sent and
    /// return the token to emit.
    pub fn confirm(
        &mut self,
        engine: &dyn PositionEngine,
        codec: &dyn NotationCodec,
        now_ms: u64,
    ) -> Option<String> {
        match &self.pending {
            Some(p) if p.stage == PendingStage::Confirm => {
                self.mark_sent(engine, codec, now_ms);
                self.pending.as_ref().map(|p| p.token.clone())
            }
            _ => None,
        }
    }

    /// Discard a move still awaiting confirmation (user cancel, or
    /// interaction disabled externally). Nothing was emitted, nothing is.
    pub fn cancel(&mut self) -> bool {
        match &self.pending {
            Some(p) if p.stage == PendingStage::Confirm => {
                self.clear();
                true
            }
            _ => false,
        }
    }

    /// Confirmed history is now `len` plies long. Resolves the pipeline
    /// if the move got reflected.
    pub fn on_history_len(&mut self, len: usize) -> Option<Resolution> {
        match &self.pending {
            Some(p) if len > p.base_history_len => {
                self.clear();
                Some(Resolution::Confirmed)
            }
            _ => None,
        }
    }

    /// Periodic check for the fallback unlock.
    pub fn tick(&mut self, now_ms: u64) -> Option<Resolution> {
        let timed_out = matches!(
            (&self.pending, self.sent_ms),
            (Some(p), Some(sent)) if p.stage == PendingStage::Sent
                && now_ms.saturating_sub(sent) >= self.timeout_ms
        );
        if timed_out {
            debug!("[PENDING] Timeout, releasing optimistic lock");
            self.clear();
            return Some(Resolution::TimedOut);
        }
        None
    }

    /// Drop everything (session change, interaction disabled mid-send).
    pub fn reset(&mut self) {
        self.clear();
    }

    fn mark_sent(&mut self, engine: &dyn PositionEngine, codec: &dyn NotationCodec, now_ms: u64) {
        if let Some(p) = &mut self.pending {
            p.stage = PendingStage::Sent;
            self.sent_ms = Some(now_ms);
            self.preview = apply_token(engine, codec, &p.base_position, &p.token);
        }
    }

    fn clear(&mut self) {
        self.pending = None;
        self.preview = None;
        self.sent_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixture::{FixtureCodec, FixtureEngine};

    fn pipeline(confirmation: bool) -> MovePipeline {
        MovePipeline::new(confirmation, 8_000)
    }

    fn submit(p: &mut MovePipeline, token: &str, now: u64) -> StageOutcome {
        p.submit(
            &FixtureEngine,
            &FixtureCodec,
            token.to_string(),
            Position::standard_start(),
            0,
            now,
        )
    }

    #[test]
    fn test_direct_send_without_confirmation() {
        let mut p = pipeline(false);
        let outcome = submit(&mut p, "7g7f", 100);
        assert_eq!(outcome, StageOutcome::Emit("7g7f".to_string()));
        assert_eq!(p.stage(), Some(PendingStage::Sent));
        assert!(p.preview_position().is_some(), "Predicted position shown while waiting");
    }

    #[test]
    fn test_confirmation_mode_two_steps() {
        let mut p = pipeline(true);
        assert_eq!(submit(&mut p, "7g7f", 100), StageOutcome::AwaitingConfirm);
        assert_eq!(p.stage(), Some(PendingStage::Confirm));
        assert!(p.preview_position().is_none(), "Nothing predicted before send");

        let token = p.confirm(&FixtureEngine, &FixtureCodec, 200);
        assert_eq!(token, Some("7g7f".to_string()));
        assert_eq!(p.stage(), Some(PendingStage::Sent));
        assert!(p.preview_position().is_some());
    }

    #[test]
    fn test_cancel_discards_silently() {
        let mut p = pipeline(true);
        submit(&mut p, "7g7f", 100);
        assert!(p.cancel());
        assert!(p.is_idle());

        // Cancel only applies to the confirm stage.
        submit(&mut p, "7g7f", 300);
        p.confirm(&FixtureEngine, &FixtureCodec, 300);
        assert!(!p.cancel());
        assert!(!p.is_idle());
    }

    #[test]
    fn test_second_input_ignored() {
        let mut p = pipeline(false);
        submit(&mut p, "7g7f", 100);
        assert_eq!(submit(&mut p, "2g2f", 150), StageOutcome::Ignored);
        assert_eq!(p.pending().unwrap().token, "7g7f");
    }

    #[test]
    fn test_resolved_by_history_growth_exactly_once() {
        let mut p = pipeline(false);
        submit(&mut p, "7g7f", 100);

        assert_eq!(p.on_history_len(1), Some(Resolution::Confirmed));
        assert!(p.is_idle());
        assert!(p.preview_position().is_none(), "Prediction discarded, not merged");

        // The later timeout check must not fire a second resolution.
        assert_eq!(p.tick(100 + 9_000), None);
        assert_eq!(p.on_history_len(2), None);
    }

    #[test]
    fn test_timeout_releases_lock_exactly_once() {
        let mut p = pipeline(false);
        submit(&mut p, "7g7f", 100);

        assert_eq!(p.tick(7_000), None, "Window not yet elapsed");
        assert_eq!(p.tick(8_100), Some(Resolution::TimedOut));
        assert!(p.is_idle());
        assert_eq!(p.on_history_len(1), None, "Growth after timeout must not re-resolve");

        // Lock released: the user can retry.
        assert_eq!(submit(&mut p, "7g7f", 9_000), StageOutcome::Emit("7g7f".to_string()));
    }

    #[test]
    fn test_confirm_stage_never_times_out() {
        let mut p = pipeline(true);
        submit(&mut p, "7g7f", 100);
        assert_eq!(p.tick(60_000), None);
        assert_eq!(p.stage(), Some(PendingStage::Confirm));
    }

    #[test]
    fn test_history_at_base_length_does_not_resolve() {
        let mut p = pipeline(false);
        p.submit(
            &FixtureEngine,
            &FixtureCodec,
            "3c3d".to_string(),
            Position::standard_start(),
            2,
            100,
        );
        assert_eq!(p.on_history_len(2), None, "Must exceed the recorded base length");
        assert_eq!(p.on_history_len(3), Some(Resolution::Confirmed));
    }
}
