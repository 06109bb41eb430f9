//! Post-game shared review: the offer/accept handshake and the
//! permission gate in front of the remote-controlled cursor.

pub mod shared_board;

pub use shared_board::{HandshakePhase, SharedReview};
