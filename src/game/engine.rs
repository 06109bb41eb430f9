//! External collaborator boundaries
//!
//! The core never computes move legality or board transitions itself and
//! never parses notation beyond what these traits return. A real engine
//! (native, wasm, server-side) is injected by the embedding application;
//! the test suites inject the deterministic stand-ins from
//! [`crate::game::fixture`].

use crate::game::types::{PieceKind, Position, Square};

/// A single move token, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedMove {
    pub is_drop: bool,
    /// Origin square; `None` for drops.
    pub from: Option<Square>,
    pub to: Square,
    /// Dropped piece kind; `None` for board moves.
    pub piece_kind: Option<PieceKind>,
    pub promote: bool,
}

/// Applies single moves/drops to positions. Returning `None` means the
/// engine rejected the move; the caller decides what that implies.
pub trait PositionEngine {
    fn apply_move(&self, position: &Position, token: &str) -> Option<Position>;
    fn apply_drop(&self, position: &Position, target: Square, kind: PieceKind) -> Option<Position>;
}

/// Encodes and decodes compact move tokens, and decodes handicap start
/// encodings carried by game snapshots.
pub trait NotationCodec {
    fn parse(&self, token: &str) -> Option<ParsedMove>;
    fn build_move_token(&self, from: Square, to: Square, promote: bool) -> String;
    fn build_drop_token(&self, kind: PieceKind, to: Square) -> String;
    fn parse_start(&self, encoding: &str) -> Option<Position>;
}

/// Apply one token to a position: parse, then dispatch to the matching
/// engine entry point. `None` on malformed tokens or engine rejection.
pub fn apply_token(
    engine: &dyn PositionEngine,
    codec: &dyn NotationCodec,
    position: &Position,
    token: &str,
) -> Option<Position> {
    let parsed = codec.parse(token)?;
    if parsed.is_drop {
        engine.apply_drop(position, parsed.to, parsed.piece_kind?)
    } else {
        engine.apply_move(position, token)
    }
}
