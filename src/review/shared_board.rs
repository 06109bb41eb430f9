//! Shared review synchronizer
//!
//! After a game ends, either participant can propose a shared review
//! board: one cursor and one branch, replicated to every viewer. The
//! counterpart sees a prompt and may accept or decline. Viewing the
//! shared board is a local-only choice open to anyone; *operating* it
//! (moving the cursor, growing the branch) requires being a participant
//! and having the server-set enable flag for one's role.
//!
//! Unlike the live-move pipeline there is no local optimism here: every
//! mutation is proposed to the server and takes effect only on echo-back,
//! because several viewers have to converge on one authoritative state.
//! Offers carry an id so a stale accept arriving after a re-offer cannot
//! activate the wrong session.

use tracing::debug;
use uuid::Uuid;

use crate::game::branch::ViewerRole;
use crate::game::types::Side;
use shared::{ClientMessage, SharedBoardWire};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Inactive,
    OfferedByLocal { offer_id: Uuid },
    OfferedByRemote { offer_id: Uuid },
    Active,
}

#[derive(Debug)]
pub struct SharedReview {
    phase: HandshakePhase,
    role: ViewerRole,
    /// Local-only display toggle; no permission involved.
    viewing: bool,
    /// Server-set per-role operate flags (sente, gote).
    operate_flags: [bool; 2],
    post_game: bool,
}

impl SharedReview {
    pub fn new(role: ViewerRole) -> Self {
        Self {
            phase: HandshakePhase::Inactive,
            role,
            viewing: false,
            operate_flags: [false; 2],
            post_game: false,
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == HandshakePhase::Active
    }

    pub fn viewing(&self) -> bool {
        self.viewing && self.is_active()
    }

    /// The local display toggle. Anyone may flip it at any time; it only
    /// shows anything while a shared session is active.
    pub fn set_viewing(&mut self, viewing: bool) {
        self.viewing = viewing;
    }

    pub fn set_post_game(&mut self, post_game: bool) {
        self.post_game = post_game;
    }

    /// True when this viewer's mutations would be honored by the server.
    pub fn can_operate(&self) -> bool {
        match self.role.side() {
            Some(side) => self.is_active() && self.operate_flags[side.index()],
            None => false,
        }
    }

    /// Propose enabling the shared view. Participants only, post-game
    /// only, and not while a handshake is already in flight.
    pub fn offer(&mut self) -> Option<ClientMessage> {
        if !self.post_game || !self.role.is_participant() {
            return None;
        }
        if self.phase != HandshakePhase::Inactive {
            return None;
        }
        let offer_id = Uuid::new_v4();
        self.phase = HandshakePhase::OfferedByLocal { offer_id };
        Some(ClientMessage::ShareOffer { offer_id })
    }

    /// The counterpart proposed a shared view; returns true if a prompt
    /// should be surfaced.
    pub fn on_remote_offer(&mut self, offer_id: Uuid, from: Side) -> bool {
        if self.role.side() == Some(from) {
            // Our own offer echoed back; not a prompt.
            return false;
        }
        if matches!(self.phase, HandshakePhase::Active) {
            return false;
        }
        self.phase = HandshakePhase::OfferedByRemote { offer_id };
        true
    }

    /// Accept the pending remote offer: enter the shared view, and if we
    /// are a participant, notify the server.
    pub fn accept(&mut self) -> Option<ClientMessage> {
        let HandshakePhase::OfferedByRemote { offer_id } = self.phase else {
            return None;
        };
        self.phase = HandshakePhase::Active;
        self.viewing = true;
        if self.role.is_participant() {
            Some(ClientMessage::ShareAccept { offer_id })
        } else {
            None
        }
    }

    /// Decline the pending remote offer. No shared state changes.
    pub fn decline(&mut self) -> Option<ClientMessage> {
        let HandshakePhase::OfferedByRemote { offer_id } = self.phase else {
            return None;
        };
        self.phase = HandshakePhase::Inactive;
        if self.role.is_participant() {
            Some(ClientMessage::ShareDecline { offer_id })
        } else {
            None
        }
    }

    /// Server confirmed an accept. Only the offer we actually have in
    /// flight counts; stale ids are ignored.
    pub fn on_accept_echo(&mut self, offer_id: Uuid) {
        match self.phase {
            HandshakePhase::OfferedByLocal { offer_id: ours } if ours == offer_id => {
                self.phase = HandshakePhase::Active;
                self.viewing = true;
            }
            _ => {
                debug!("[SHARE] Ignoring accept for unknown offer {}", offer_id);
            }
        }
    }

    pub fn on_decline_echo(&mut self, offer_id: Uuid) {
        if let HandshakePhase::OfferedByLocal { offer_id: ours } = self.phase {
            if ours == offer_id {
                self.phase = HandshakePhase::Inactive;
            }
        }
    }

    /// Replicated shared-board state: adopt the server's activity flag
    /// and operate permissions.
    pub fn on_server_state(&mut self, wire: &SharedBoardWire) {
        self.operate_flags = [wire.sente_can_operate, wire.gote_can_operate];
        if wire.active {
            self.phase = HandshakePhase::Active;
        } else if self.phase == HandshakePhase::Active {
            self.phase = HandshakePhase::Inactive;
        }
    }

    /// Propose moving the shared cursor. No emission and no local change
    /// unless this viewer is the operator and the target is reachable.
    pub fn request_cursor(&self, ply: usize, max_reachable: usize) -> Option<ClientMessage> {
        if !self.can_operate() {
            debug!("[SHARE] Cursor request dropped: not operator");
            return None;
        }
        if ply > max_reachable {
            debug!("[SHARE] Cursor request dropped: {} unreachable", ply);
            return None;
        }
        Some(ClientMessage::SharedCursor { ply: ply as u64 })
    }

    /// Propose appending to the shared branch. The caller has already
    /// validated the token against the current shared position; this is
    /// the permission gate.
    pub fn request_append(&self, token: &str) -> Option<ClientMessage> {
        if !self.can_operate() {
            debug!("[SHARE] Append dropped: not operator");
            return None;
        }
        Some(ClientMessage::SharedAppend {
            token: token.to_string(),
        })
    }

    /// Session/game change: all handshake state evaporates.
    pub fn reset(&mut self) {
        self.phase = HandshakePhase::Inactive;
        self.viewing = false;
        self.operate_flags = [false; 2];
        self.post_game = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant() -> SharedReview {
        let mut review = SharedReview::new(ViewerRole::Participant(Side::Sente));
        review.set_post_game(true);
        review
    }

    #[test]
    fn test_offer_requires_post_game_participant() {
        let mut live = SharedReview::new(ViewerRole::Participant(Side::Sente));
        assert!(live.offer().is_none(), "No shared review during a live game");

        let mut spectator = SharedReview::new(ViewerRole::Spectator);
        spectator.set_post_game(true);
        assert!(spectator.offer().is_none());

        let mut review = participant();
        let msg = review.offer().expect("Participant can offer post-game");
        assert!(matches!(msg, ClientMessage::ShareOffer { .. }));
        assert!(matches!(review.phase(), HandshakePhase::OfferedByLocal { .. }));

        assert!(review.offer().is_none(), "No double offer while one is in flight");
    }

    #[test]
    fn test_accept_enters_view_and_notifies() {
        let mut review = SharedReview::new(ViewerRole::Participant(Side::Gote));
        review.set_post_game(true);
        let offer_id = Uuid::new_v4();

        assert!(review.on_remote_offer(offer_id, Side::Sente));
        let msg = review.accept().expect("Participant accept notifies the server");
        assert_eq!(msg, ClientMessage::ShareAccept { offer_id });
        assert!(review.is_active());
        assert!(review.viewing());
    }

    #[test]
    fn test_spectator_accept_is_silent() {
        let mut review = SharedReview::new(ViewerRole::Spectator);
        review.set_post_game(true);
        review.on_remote_offer(Uuid::new_v4(), Side::Sente);

        assert!(review.accept().is_none(), "Spectators enter without notifying");
        assert!(review.is_active());
    }

    #[test]
    fn test_decline_changes_nothing() {
        let mut review = SharedReview::new(ViewerRole::Participant(Side::Gote));
        review.set_post_game(true);
        review.on_remote_offer(Uuid::new_v4(), Side::Sente);

        let msg = review.decline();
        assert!(matches!(msg, Some(ClientMessage::ShareDecline { .. })));
        assert_eq!(review.phase(), HandshakePhase::Inactive);
        assert!(!review.viewing());
    }

    #[test]
    fn test_stale_accept_echo_ignored() {
        let mut review = participant();
        review.offer();

        review.on_accept_echo(Uuid::new_v4());
        assert!(!review.is_active(), "Accept for an unknown offer must not activate");

        let HandshakePhase::OfferedByLocal { offer_id } = review.phase() else {
            panic!("Offer should still be in flight");
        };
        review.on_accept_echo(offer_id);
        assert!(review.is_active());
    }

    #[test]
    fn test_own_offer_echo_is_not_a_prompt() {
        let mut review = participant();
        review.offer();
        assert!(!review.on_remote_offer(Uuid::new_v4(), Side::Sente));
    }

    #[test]
    fn test_operate_requires_server_flag() {
        let mut review = participant();
        review.on_server_state(&SharedBoardWire {
            active: true,
            sente_can_operate: false,
            gote_can_operate: true,
            ..Default::default()
        });

        assert!(review.is_active());
        assert!(!review.can_operate(), "Sente's flag is off");
        // No transport emission, no local state change.
        assert!(review.request_cursor(3, 10).is_none());
        assert!(review.request_append("2b3c").is_none());
    }

    #[test]
    fn test_operator_proposals_emitted() {
        let mut review = participant();
        review.on_server_state(&SharedBoardWire {
            active: true,
            sente_can_operate: true,
            ..Default::default()
        });

        assert!(review.can_operate());
        assert_eq!(
            review.request_cursor(3, 10),
            Some(ClientMessage::SharedCursor { ply: 3 })
        );
        assert!(review.request_cursor(11, 10).is_none(), "Unreachable target");
        assert_eq!(
            review.request_append("2b3c"),
            Some(ClientMessage::SharedAppend {
                token: "2b3c".to_string()
            })
        );
    }

    #[test]
    fn test_spectator_never_operates() {
        let mut review = SharedReview::new(ViewerRole::Spectator);
        review.set_post_game(true);
        review.on_server_state(&SharedBoardWire {
            active: true,
            sente_can_operate: true,
            gote_can_operate: true,
            ..Default::default()
        });
        assert!(!review.can_operate());
    }

    #[test]
    fn test_server_deactivation_wins() {
        let mut review = participant();
        review.offer();
        let HandshakePhase::OfferedByLocal { offer_id } = review.phase() else {
            panic!();
        };
        review.on_accept_echo(offer_id);
        assert!(review.is_active());

        review.on_server_state(&SharedBoardWire::default());
        assert!(!review.is_active());
    }

    #[test]
    fn test_reset_clears_handshake() {
        let mut review = participant();
        review.offer();
        review.reset();
        assert_eq!(review.phase(), HandshakePhase::Inactive);
        assert!(review.offer().is_none(), "Post-game flag gone after reset");
    }
}
