//! Deterministic engine/codec stand-ins
//!
//! The real position engine and notation codec live outside this crate.
//! These fixtures implement the same boundaries mechanically: tokens are
//! parsed in the compact coordinate form, pieces are picked up and put
//! down, captures land in the mover's hand demoted. No legality rules:
//! a move is rejected only when it is structurally impossible (empty
//! origin square, dropping a piece not in hand, dropping onto an occupied
//! square). That matches the contract: legality is the engine's problem,
//! and this core never second-guesses it.

use crate::game::engine::{NotationCodec, ParsedMove, PositionEngine};
use crate::game::types::{BoardPiece, PieceKind, Position, Square};

pub struct FixtureEngine;

pub struct FixtureCodec;

fn parse_square(file: char, rank: char) -> Option<Square> {
    let file = file.to_digit(10)? as u8;
    if !rank.is_ascii_lowercase() {
        return None;
    }
    let rank = rank as u8 - b'a' + 1;
    Square::new(file, rank)
}

fn parse_token(token: &str) -> Option<ParsedMove> {
    let chars: Vec<char> = token.chars().collect();

    // Drop form: "B*5e"
    if chars.len() == 4 && chars[1] == '*' {
        let kind = PieceKind::from_letter(chars[0])?;
        if kind == PieceKind::King {
            return None;
        }
        let to = parse_square(chars[2], chars[3])?;
        return Some(ParsedMove {
            is_drop: true,
            from: None,
            to,
            piece_kind: Some(kind),
            promote: false,
        });
    }

    // Board-move form: "7g7f" with optional trailing "+"
    let promote = match chars.len() {
        4 => false,
        5 if chars[4] == '+' => true,
        _ => return None,
    };
    let from = parse_square(chars[0], chars[1])?;
    let to = parse_square(chars[2], chars[3])?;
    if from == to {
        return None;
    }
    Some(ParsedMove {
        is_drop: false,
        from: Some(from),
        to,
        piece_kind: None,
        promote,
    })
}

impl NotationCodec for FixtureCodec {
    fn parse(&self, token: &str) -> Option<ParsedMove> {
        parse_token(token)
    }

    fn build_move_token(&self, from: Square, to: Square, promote: bool) -> String {
        if promote {
            format!("{}{}+", from, to)
        } else {
            format!("{}{}", from, to)
        }
    }

    fn build_drop_token(&self, kind: PieceKind, to: Square) -> String {
        format!("{}*{}", kind.letter(), to)
    }

    /// Named handicap starts. The fixture understands the three common
    /// ones; everything else is rejected.
    fn parse_start(&self, encoding: &str) -> Option<Position> {
        let mut position = Position::standard_start();
        let vacate = match encoding {
            "even" => None,
            "lance" => Some(Square::new(1, 1)?),
            "bishop" => Some(Square::new(2, 2)?),
            "rook" => Some(Square::new(8, 2)?),
            _ => return None,
        };
        if let Some(sq) = vacate {
            position.set_piece(sq, None);
        }
        Some(position)
    }
}

impl PositionEngine for FixtureEngine {
    fn apply_move(&self, position: &Position, token: &str) -> Option<Position> {
        let parsed = parse_token(token)?;
        let from = parsed.from?;
        let mut piece = position.piece_at(from)?;

        let mut next = position.clone();
        if let Some(captured) = next.piece_at(parsed.to) {
            next.hand_mut(piece.side).add(captured.kind);
        }
        if parsed.promote {
            piece.promoted = true;
        }
        next.set_piece(from, None);
        next.set_piece(parsed.to, Some(piece));
        next.set_side_to_move(position.side_to_move().opponent());
        Some(next)
    }

    fn apply_drop(&self, position: &Position, target: Square, kind: PieceKind) -> Option<Position> {
        if position.piece_at(target).is_some() {
            return None;
        }
        let side = position.side_to_move();
        let mut next = position.clone();
        if !next.hand_mut(side).take(kind) {
            return None;
        }
        next.set_piece(target, Some(BoardPiece::new(kind, side)));
        next.set_side_to_move(side.opponent());
        Some(next)
    }
}
