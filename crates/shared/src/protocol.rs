use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock_wire::ClockWire;

/// Which player a value belongs to. Sente moves first.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Sente,
    Gote,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Sente => Side::Gote,
            Side::Gote => Side::Sente,
        }
    }

    /// Stable array index for per-side storage (sente = 0, gote = 1).
    pub fn index(self) -> usize {
        match self {
            Side::Sente => 0,
            Side::Gote => 1,
        }
    }
}

/// Engine evaluation attached to a confirmed move.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Score {
    /// Centipawn score from the mover's point of view.
    Cp(i32),
    /// Forced mate in the given number of plies (negative = getting mated).
    Mate(i32),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Done,
    Failed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Annotation {
    #[serde(default)]
    pub score: Option<Score>,
    #[serde(default)]
    pub principal_variation: Vec<String>,
    #[serde(default)]
    pub status: AnalysisStatus,
}

/// One confirmed move in the server-owned history.
///
/// `token` is the compact notation form ("7g7f", "8h2b+", "B*5e"); the
/// annotation is filled in later by the analysis pipeline, if at all.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MoveRecord {
    pub token: String,
    #[serde(default)]
    pub annotation: Option<Annotation>,
}

impl MoveRecord {
    pub fn plain(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            annotation: None,
        }
    }
}

/// Server-replicated state of the post-game shared review board.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SharedBoardWire {
    pub active: bool,
    pub base_index: u64,
    pub moves: Vec<String>,
    pub cursor: u64,
    /// Per-role operate flags, set by the server.
    pub sente_can_operate: bool,
    pub gote_can_operate: bool,
}

/// Client → Server messages. All of these are fire-and-forget proposals;
/// the server's echo is what actually changes replicated state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ClientMessage {
    SubmitMove { token: String },

    // Shared review board proposals (operator only)
    SharedCursor { ply: u64 },
    SharedAppend { token: String },

    // Shared review handshake
    ShareOffer { offer_id: Uuid },
    ShareAccept { offer_id: Uuid },
    ShareDecline { offer_id: Uuid },

    /// Ask for a full `GameSnapshot` (session start, reconnect).
    Resync,
}

/// Server → Client messages.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ServerMessage {
    /// Full state replacement, sent on join and after a `Resync`.
    GameSnapshot {
        moves: Vec<MoveRecord>,
        /// Handicap start encoding; absent for even games.
        alternate_start: Option<String>,
        clock: Option<ClockWire>,
        shared: Option<SharedBoardWire>,
        finished: bool,
    },

    /// Complete confirmed move list. Lengths arrive non-decreasing.
    HistoryUpdate { moves: Vec<MoveRecord> },

    /// Late-arriving engine evaluation for one ply.
    AnalysisUpdate { ply: u64, annotation: Annotation },

    ClockBroadcast { clock: ClockWire },

    SharedBoard { state: SharedBoardWire },

    ShareOffered { offer_id: Uuid, from: Side },
    ShareAccepted { offer_id: Uuid },
    ShareDeclined { offer_id: Uuid },

    GameFinished {
        winner: Option<Side>,
        reason: String,
    },
}
