//! Position reconstruction
//!
//! Replays a prefix of the confirmed move list against a start position to
//! produce the position at any ply. Replay is pure and restartable: callers
//! may ask for any `k` in any order with no side effects. Each call replays
//! from ply 0, which is O(k) and acceptable for bounded game lengths; a
//! small memo keyed on (history revision, k) makes the common case (a fixed
//! period timer re-asking for the same ply) free.
//!
//! A malformed token or an engine-rejected move stops the replay at that
//! ply and flags the result; it never panics and never applies moves past
//! the failure.

use tracing::warn;

use crate::game::engine::{apply_token, NotationCodec, PositionEngine};
use crate::game::types::{MoveRecord, Position};

/// Whether a replay consumed its whole prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
    Ok,
    /// Replay stopped early: `at_ply` is the index of the record that
    /// failed to parse or apply.
    Truncated { at_ply: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub position: Position,
    pub plies_applied: usize,
    pub integrity: Integrity,
}

/// Start-position inputs, in priority order: an explicit handicap start
/// beats everything; a known authoritative final position may stand in
/// only when the *entire* history is requested; otherwise the standard
/// start applies.
#[derive(Debug, Default, Clone, Copy)]
pub struct StartContext<'a> {
    pub alternate_start: Option<&'a Position>,
    pub known_final: Option<&'a Position>,
}

/// Pure replay of `records[0..k)` from `start`.
pub fn replay(
    engine: &dyn PositionEngine,
    codec: &dyn NotationCodec,
    start: &Position,
    records: &[MoveRecord],
    k: usize,
) -> Replay {
    let k = k.min(records.len());
    let mut position = start.clone();

    for (ply, record) in records[..k].iter().enumerate() {
        match apply_token(engine, codec, &position, &record.token) {
            Some(next) => position = next,
            None => {
                warn!("[REPLAY] Halting at ply {}: unusable token {:?}", ply, record.token);
                return Replay {
                    position,
                    plies_applied: ply,
                    integrity: Integrity::Truncated { at_ply: ply },
                };
            }
        }
    }

    Replay {
        position,
        plies_applied: k,
        integrity: Integrity::Ok,
    }
}

/// Memoizing front-end over [`replay`].
#[derive(Debug, Default)]
pub struct Reconstructor {
    memo_revision: u64,
    memo: Vec<(usize, Replay)>,
}

/// A fixed-period display timer plus a review cursor ask for at most a
/// couple of distinct plies per revision.
const MEMO_CAP: usize = 8;

impl Reconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position after `records[0..k)`, memoized by `(revision, k)`.
    ///
    /// `revision` must change whenever the token sequence or the start
    /// context changes; [`crate::game::history::MoveHistory`] provides it.
    pub fn position_at(
        &mut self,
        engine: &dyn PositionEngine,
        codec: &dyn NotationCodec,
        ctx: StartContext<'_>,
        records: &[MoveRecord],
        revision: u64,
        k: usize,
    ) -> Replay {
        let k = k.min(records.len());

        if self.memo_revision != revision {
            self.memo.clear();
            self.memo_revision = revision;
        }
        if let Some((_, cached)) = self.memo.iter().find(|(ck, _)| *ck == k) {
            return cached.clone();
        }

        let result = if let Some(alternate) = ctx.alternate_start {
            replay(engine, codec, alternate, records, k)
        } else if k == records.len() && ctx.known_final.is_some() {
            // The authoritative current position already is the answer.
            Replay {
                position: ctx.known_final.cloned().unwrap_or_else(Position::standard_start),
                plies_applied: k,
                integrity: Integrity::Ok,
            }
        } else {
            replay(engine, codec, &Position::standard_start(), records, k)
        };

        if self.memo.len() >= MEMO_CAP {
            self.memo.remove(0);
        }
        self.memo.push((k, result.clone()));
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::game::fixture::{FixtureCodec, FixtureEngine};
    use crate::game::types::{PieceKind, Side, Square};

    fn records(tokens: &[&str]) -> Vec<MoveRecord> {
        tokens.iter().map(|t| MoveRecord::plain(*t)).collect()
    }

    /// Engine wrapper counting apply calls, for memo verification.
    struct CountingEngine<'a> {
        inner: &'a FixtureEngine,
        applies: &'a Cell<usize>,
    }

    impl PositionEngine for CountingEngine<'_> {
        fn apply_move(&self, position: &Position, token: &str) -> Option<Position> {
            self.applies.set(self.applies.get() + 1);
            self.inner.apply_move(position, token)
        }

        fn apply_drop(
            &self,
            position: &Position,
            target: Square,
            kind: PieceKind,
        ) -> Option<Position> {
            self.applies.set(self.applies.get() + 1);
            self.inner.apply_drop(position, target, kind)
        }
    }

    #[test]
    fn test_stepwise_replay_matches_full_replay() {
        // applyMove(reconstruct(start, H[0..k]), H[k]) == reconstruct(start, H[0..k+1])
        let engine = FixtureEngine;
        let codec = FixtureCodec;
        let history = records(&["7g7f", "3c3d", "8h2b+", "3a2b"]);
        let start = Position::standard_start();

        for k in 0..history.len() {
            let prefix = replay(&engine, &codec, &start, &history, k);
            assert_eq!(prefix.integrity, Integrity::Ok);

            let stepped =
                apply_token(&engine, &codec, &prefix.position, &history[k].token).unwrap();
            let full = replay(&engine, &codec, &start, &history, k + 1);
            assert_eq!(stepped, full.position);
        }
    }

    #[test]
    fn test_bishop_exchange_reaches_hands() {
        let engine = FixtureEngine;
        let codec = FixtureCodec;
        let history = records(&["7g7f", "3c3d", "8h2b+", "3a2b"]);

        let result = replay(&engine, &codec, &Position::standard_start(), &history, 4);
        assert_eq!(result.integrity, Integrity::Ok);
        // Sente captured the 2b bishop, then gote's silver captured back.
        assert_eq!(result.position.hand(Side::Sente).count(PieceKind::Bishop), 1);
        assert_eq!(result.position.hand(Side::Gote).count(PieceKind::Bishop), 1);
        assert_eq!(result.position.side_to_move(), Side::Sente);
    }

    #[test]
    fn test_malformed_token_truncates() {
        let engine = FixtureEngine;
        let codec = FixtureCodec;
        let history = records(&["7g7f", "not-a-move", "3c3d"]);

        let result = replay(&engine, &codec, &Position::standard_start(), &history, 3);
        assert_eq!(result.integrity, Integrity::Truncated { at_ply: 1 });
        assert_eq!(result.plies_applied, 1);

        // The position is exactly the one before the bad ply.
        let good = replay(&engine, &codec, &Position::standard_start(), &history, 1);
        assert_eq!(result.position, good.position);
    }

    #[test]
    fn test_rejected_move_truncates() {
        let engine = FixtureEngine;
        let codec = FixtureCodec;
        // 5e5d moves from an empty square; the engine rejects it.
        let history = records(&["7g7f", "5e5d"]);

        let result = replay(&engine, &codec, &Position::standard_start(), &history, 2);
        assert_eq!(result.integrity, Integrity::Truncated { at_ply: 1 });
    }

    #[test]
    fn test_k_clamped_to_len() {
        let engine = FixtureEngine;
        let codec = FixtureCodec;
        let history = records(&["7g7f"]);

        let result = replay(&engine, &codec, &Position::standard_start(), &history, 99);
        assert_eq!(result.plies_applied, 1);
        assert_eq!(result.integrity, Integrity::Ok);
    }

    #[test]
    fn test_memo_hit_skips_engine() {
        let inner = FixtureEngine;
        let applies = Cell::new(0);
        let engine = CountingEngine {
            inner: &inner,
            applies: &applies,
        };
        let codec = FixtureCodec;
        let history = records(&["7g7f", "3c3d"]);
        let mut reconstructor = Reconstructor::new();

        let first = reconstructor.position_at(&engine, &codec, StartContext::default(), &history, 1, 2);
        let cost = applies.get();
        assert!(cost > 0);

        let second = reconstructor.position_at(&engine, &codec, StartContext::default(), &history, 1, 2);
        assert_eq!(applies.get(), cost, "Second identical query must be memoized");
        assert_eq!(first, second);

        // A revision bump invalidates.
        reconstructor.position_at(&engine, &codec, StartContext::default(), &history, 2, 2);
        assert!(applies.get() > cost);
    }

    #[test]
    fn test_alternate_start_wins() {
        let engine = FixtureEngine;
        let codec = FixtureCodec;
        let mut handicap = Position::standard_start();
        // Lance handicap: gote plays without the left lance.
        handicap.set_piece(Square::new(1, 1).unwrap(), None);

        let mut reconstructor = Reconstructor::new();
        let ctx = StartContext {
            alternate_start: Some(&handicap),
            known_final: None,
        };
        let result = reconstructor.position_at(&engine, &codec, ctx, &[], 1, 0);
        assert!(result.position.piece_at(Square::new(1, 1).unwrap()).is_none());
    }

    #[test]
    fn test_known_final_used_only_for_full_history() {
        let engine = FixtureEngine;
        let codec = FixtureCodec;
        let history = records(&["7g7f"]);
        let sentinel = Position::empty(Side::Gote);

        let mut reconstructor = Reconstructor::new();
        let ctx = StartContext {
            alternate_start: None,
            known_final: Some(&sentinel),
        };

        let full = reconstructor.position_at(&engine, &codec, ctx, &history, 1, 1);
        assert_eq!(full.position, sentinel);

        let partial = reconstructor.position_at(&engine, &codec, ctx, &history, 1, 0);
        assert_eq!(partial.position, Position::standard_start());
    }
}
