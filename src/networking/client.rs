//! The client session: one object owning every model in this crate,
//! fed by inbound server messages and user intents.
//!
//! Everything is single-threaded and message-driven. Each inbound message
//! is applied atomically (by the time `handle` returns, no consumer can
//! observe a half-updated state) and returns the discrete events the
//! rendering layer reacts to. Outbound proposals are queued on an outbox
//! the embedding transport drains and fires off without waiting for a
//! reply; replies, when they matter, arrive as ordinary inbound messages.
//!
//! Time never comes from a wall clock in here: every entry point that
//! needs "now" takes epoch milliseconds from the caller. The embedding
//! application drives [`GameClient::tick`] from its ~250 ms display timer.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::{ClientConfig, ClientError, ClientResult, SessionGate};
use crate::game::branch::{AppendOutcome, Branch, BranchManager, NavCommand, ViewerRole};
use crate::game::clock::{ClockEvent, ClockModel, SideClock};
use crate::game::engine::{apply_token, NotationCodec, PositionEngine};
use crate::game::history::MoveHistory;
use crate::game::pending::{MovePipeline, Resolution, StageOutcome};
use crate::game::reconstruct::{Integrity, Reconstructor, Replay, StartContext};
use crate::game::types::{Annotation, MoveRecord, PieceKind, Position, Side, Square};
use crate::review::SharedReview;
use shared::{ClientMessage, ServerMessage, SharedBoardWire};

/// Which board the display and navigation currently target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveView {
    Live,
    SharedBoard,
}

/// Discrete happenings the rendering boundary consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    HistoryChanged { len: usize },
    PendingResolved(Resolution),
    Clock(ClockEvent),
    SharePrompt { offer_id: Uuid, from: Side },
    SharedChanged,
    GameFinished { winner: Option<Side>, reason: String },
    ConnectionLost,
}

pub struct GameClient {
    engine: Box<dyn PositionEngine>,
    codec: Box<dyn NotationCodec>,
    config: ClientConfig,
    role: ViewerRole,

    history: MoveHistory,
    reconstructor: Reconstructor,
    branches: BranchManager,
    clock: ClockModel,
    pipeline: MovePipeline,
    shared: SharedReview,
    gate: SessionGate,

    alternate_start: Option<Position>,
    finished: bool,
    interaction_enabled: bool,
    outbox: Vec<ClientMessage>,
}

impl GameClient {
    pub fn new(
        engine: Box<dyn PositionEngine>,
        codec: Box<dyn NotationCodec>,
        role: ViewerRole,
        config: ClientConfig,
    ) -> Self {
        let pipeline = MovePipeline::new(config.confirmation_mode, config.move_timeout_ms);
        Self {
            engine,
            codec,
            config,
            role,
            history: MoveHistory::new(),
            reconstructor: Reconstructor::new(),
            branches: BranchManager::new(),
            clock: ClockModel::new(),
            pipeline,
            shared: SharedReview::new(role),
            gate: SessionGate::new(),
            alternate_start: None,
            finished: false,
            interaction_enabled: true,
            outbox: Vec::new(),
        }
    }

    // ----- inbound ---------------------------------------------------------

    /// Apply one server message atomically, returning the events it caused.
    pub fn handle(&mut self, message: ServerMessage, now_ms: u64) -> Vec<ClientEvent> {
        match message {
            ServerMessage::GameSnapshot {
                moves,
                alternate_start,
                clock,
                shared,
                finished,
            } => self.apply_snapshot(moves, alternate_start, clock, shared, finished, now_ms),
            ServerMessage::HistoryUpdate { moves } => self.apply_history(moves),
            ServerMessage::AnalysisUpdate { ply, annotation } => {
                self.apply_annotation(ply as usize, annotation);
                Vec::new()
            }
            ServerMessage::ClockBroadcast { clock } => {
                self.clock.apply_wire(&clock);
                Vec::new()
            }
            ServerMessage::SharedBoard { state } => self.apply_shared_state(state),
            ServerMessage::ShareOffered { offer_id, from } => {
                if self.finished && self.shared.on_remote_offer(offer_id, from) {
                    vec![ClientEvent::SharePrompt { offer_id, from }]
                } else {
                    Vec::new()
                }
            }
            ServerMessage::ShareAccepted { offer_id } => {
                let was_active = self.shared.is_active();
                self.shared.on_accept_echo(offer_id);
                if !was_active && self.shared.is_active() {
                    vec![ClientEvent::SharedChanged]
                } else {
                    Vec::new()
                }
            }
            ServerMessage::ShareDeclined { offer_id } => {
                self.shared.on_decline_echo(offer_id);
                Vec::new()
            }
            ServerMessage::GameFinished { winner, reason } => {
                self.apply_finished(winner, reason, now_ms)
            }
        }
    }

    /// The transport noticed the connection dropping. Clocks freeze and
    /// interaction is disabled until the next snapshot resyncs us.
    pub fn on_connection_lost(&mut self, now_ms: u64) -> Vec<ClientEvent> {
        warn!("[SYNC] Connection lost, freezing state");
        self.interaction_enabled = false;
        self.clock.freeze(now_ms);
        // A move still awaiting user confirmation is discarded; a sent one
        // stays pending and resolves by reflection or timeout as usual.
        self.pipeline.cancel();
        vec![ClientEvent::ConnectionLost]
    }

    /// Periodic evaluation driven by the embedding display timer. Only
    /// projections and timeouts live here; nothing authoritative moves.
    pub fn tick(&mut self, now_ms: u64) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        if let Some(event) = self.clock.tick(now_ms) {
            events.push(ClientEvent::Clock(event));
        }
        if let Some(resolution) = self.pipeline.tick(now_ms) {
            events.push(ClientEvent::PendingResolved(resolution));
        }
        events
    }

    /// Queue an initial-snapshot request (session start, reconnect).
    pub fn request_resync(&mut self) {
        self.outbox.push(ClientMessage::Resync);
    }

    // ----- live moves ------------------------------------------------------

    pub fn play_move(&mut self, from: Square, to: Square, promote: bool, now_ms: u64) -> StageOutcome {
        let token = self.codec.build_move_token(from, to, promote);
        self.submit_live(token, now_ms)
    }

    pub fn play_drop(&mut self, kind: PieceKind, to: Square, now_ms: u64) -> StageOutcome {
        let token = self.codec.build_drop_token(kind, to);
        self.submit_live(token, now_ms)
    }

    /// Confirm the staged move (confirmation mode); emits it.
    pub fn confirm_pending(&mut self, now_ms: u64) -> bool {
        match self
            .pipeline
            .confirm(self.engine.as_ref(), self.codec.as_ref(), now_ms)
        {
            Some(token) => {
                self.outbox.push(ClientMessage::SubmitMove { token });
                true
            }
            None => false,
        }
    }

    /// Discard the staged move awaiting confirmation. Nothing is emitted.
    pub fn cancel_pending(&mut self) -> bool {
        self.pipeline.cancel()
    }

    fn submit_live(&mut self, token: String, now_ms: u64) -> StageOutcome {
        if !self.interaction_enabled || self.finished {
            return StageOutcome::Ignored;
        }
        let Some(our_side) = self.role.side() else {
            return StageOutcome::Ignored;
        };
        // Live moves only from the live view, at the live tip.
        if self.shared.viewing()
            || self.branches.local_active()
            || self.branches.cursor() != self.history.len()
        {
            return StageOutcome::Ignored;
        }
        if !self.pipeline.is_idle() {
            return StageOutcome::Ignored;
        }

        // Validate against the position reconstructed from current state,
        // immediately before acceptance.
        let live = self.replay_at(self.history.len());
        if live.integrity != Integrity::Ok {
            debug!("[SYNC] Live move dropped: history integrity");
            return StageOutcome::Ignored;
        }
        if live.position.side_to_move() != our_side {
            return StageOutcome::Ignored;
        }
        if apply_token(self.engine.as_ref(), self.codec.as_ref(), &live.position, &token).is_none()
        {
            debug!("[SYNC] Live move dropped: {:?} does not apply", token);
            return StageOutcome::Ignored;
        }

        let outcome = self.pipeline.submit(
            self.engine.as_ref(),
            self.codec.as_ref(),
            token,
            live.position,
            self.history.len(),
            now_ms,
        );
        if let StageOutcome::Emit(token) = &outcome {
            self.outbox.push(ClientMessage::SubmitMove {
                token: token.clone(),
            });
        }
        outcome
    }

    // ----- review ----------------------------------------------------------

    pub fn review_move(&mut self, from: Square, to: Square, promote: bool) -> AppendOutcome {
        let token = self.codec.build_move_token(from, to, promote);
        self.review_append(&token)
    }

    pub fn review_drop(&mut self, kind: PieceKind, to: Square) -> AppendOutcome {
        let token = self.codec.build_drop_token(kind, to);
        self.review_append(&token)
    }

    /// Append a token to whichever review view is active: the private
    /// local branch, or (as a server proposal) the shared branch.
    pub fn review_append(&mut self, token: &str) -> AppendOutcome {
        if !self.interaction_enabled {
            return AppendOutcome::Rejected;
        }
        if self.shared.viewing() {
            let Some(position) = self.shared_position() else {
                return AppendOutcome::Rejected;
            };
            if apply_token(self.engine.as_ref(), self.codec.as_ref(), &position, token).is_none() {
                debug!("[SHARE] Append dropped: {:?} does not apply", token);
                return AppendOutcome::Rejected;
            }
            match self.shared.request_append(token) {
                Some(message) => {
                    self.outbox.push(message);
                    AppendOutcome::Proposed
                }
                None => AppendOutcome::Rejected,
            }
        } else {
            let ctx = StartContext {
                alternate_start: self.alternate_start.as_ref(),
                known_final: None,
            };
            self.branches.append_local(
                self.engine.as_ref(),
                self.codec.as_ref(),
                &mut self.reconstructor,
                ctx,
                &self.history,
                self.role,
                token,
            )
        }
    }

    /// Dispatch one navigation command against the active view. For the
    /// shared board this is a server proposal; locally it acts at once.
    pub fn navigate(&mut self, command: NavCommand) {
        if self.shared.viewing() {
            let max = self
                .branches
                .shared()
                .map(|b| b.tip())
                .unwrap_or(self.history.len());
            let current = self.branches.shared_cursor();
            let target = match command {
                NavCommand::GotoPly(ply) => ply,
                NavCommand::StepForward => current + 1,
                NavCommand::StepBack => current.saturating_sub(1),
                NavCommand::GotoStart => 0,
                NavCommand::GotoEnd => max,
            };
            if let Some(message) = self.shared.request_cursor(target.min(max), max) {
                self.outbox.push(message);
            }
        } else {
            self.branches.navigate(command, self.history.len());
        }
    }

    // ----- shared review handshake -----------------------------------------

    pub fn offer_shared_review(&mut self) -> bool {
        match self.shared.offer() {
            Some(message) => {
                self.outbox.push(message);
                true
            }
            None => false,
        }
    }

    pub fn accept_shared_review(&mut self) {
        if let Some(message) = self.shared.accept() {
            self.outbox.push(message);
        }
    }

    pub fn decline_shared_review(&mut self) {
        if let Some(message) = self.shared.decline() {
            self.outbox.push(message);
        }
    }

    pub fn set_shared_viewing(&mut self, viewing: bool) {
        self.shared.set_viewing(viewing);
    }

    // ----- views -----------------------------------------------------------

    pub fn active_view(&self) -> ActiveView {
        if self.shared.viewing() {
            ActiveView::SharedBoard
        } else {
            ActiveView::Live
        }
    }

    /// Position at the confirmed live tip.
    pub fn live_position(&mut self) -> Replay {
        self.replay_at(self.history.len())
    }

    /// Position under the local review cursor, inside the local branch
    /// when one is active.
    pub fn review_position(&mut self) -> Replay {
        let cursor = self.branches.cursor();
        match self.branches.local().cloned() {
            Some(branch) if cursor > branch.base_index => {
                self.replay_branch(&branch, cursor - branch.base_index)
            }
            _ => self.replay_at(cursor),
        }
    }

    /// Position under the shared cursor, or `None` while no shared
    /// session is active.
    pub fn shared_position(&mut self) -> Option<Position> {
        if !self.shared.is_active() {
            return None;
        }
        let cursor = self.branches.shared_cursor();
        match self.branches.shared().cloned() {
            Some(branch) if cursor > branch.base_index => {
                Some(self.replay_branch(&branch, cursor - branch.base_index).position)
            }
            _ => Some(self.replay_at(cursor.min(self.history.len())).position),
        }
    }

    /// The cosmetic predicted position while a sent move awaits the
    /// server, if any.
    pub fn pending_preview(&self) -> Option<&Position> {
        self.pipeline.preview_position()
    }

    pub fn remaining_time(&self, side: Side, now_ms: u64) -> Option<SideClock> {
        self.clock.remaining(side, now_ms)
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    pub fn branches(&self) -> &BranchManager {
        &self.branches
    }

    pub fn shared_review(&self) -> &SharedReview {
        &self.shared
    }

    pub fn pipeline(&self) -> &MovePipeline {
        &self.pipeline
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn interaction_enabled(&self) -> bool {
        self.interaction_enabled
    }

    pub fn role(&self) -> ViewerRole {
        self.role
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Take everything queued for the transport.
    pub fn drain_outbox(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outbox)
    }

    // ----- internals -------------------------------------------------------

    fn replay_at(&mut self, k: usize) -> Replay {
        let ctx = StartContext {
            alternate_start: self.alternate_start.as_ref(),
            known_final: None,
        };
        self.reconstructor.position_at(
            self.engine.as_ref(),
            self.codec.as_ref(),
            ctx,
            self.history.records(),
            self.history.revision(),
            k,
        )
    }

    /// Mainline to the branch base, then `upto` branch moves on top.
    fn replay_branch(&mut self, branch: &Branch, upto: usize) -> Replay {
        let mut replay = self.replay_at(branch.base_index);
        if replay.integrity != Integrity::Ok {
            return replay;
        }
        for (i, token) in branch.moves[..upto.min(branch.moves.len())].iter().enumerate() {
            match apply_token(self.engine.as_ref(), self.codec.as_ref(), &replay.position, token) {
                Some(position) => {
                    replay.position = position;
                    replay.plies_applied += 1;
                }
                None => {
                    replay.integrity = Integrity::Truncated {
                        at_ply: branch.base_index + i,
                    };
                    return replay;
                }
            }
        }
        replay
    }

    fn apply_snapshot(
        &mut self,
        moves: Vec<MoveRecord>,
        alternate_start: Option<String>,
        clock: Option<shared::ClockWire>,
        shared_state: Option<SharedBoardWire>,
        finished: bool,
        now_ms: u64,
    ) -> Vec<ClientEvent> {
        info!("[SYNC] Snapshot: {} plies, finished={}", moves.len(), finished);

        self.history.reset(moves);
        self.gate.reset();
        self.pipeline.reset();
        self.shared.reset();
        self.branches.on_session_changed(self.history.len());

        let start = match alternate_start.map(|e| decode_start(self.codec.as_ref(), e)) {
            Some(Ok(position)) => Some(position),
            Some(Err(err)) => {
                warn!("[SYNC] {}", err);
                None
            }
            None => None,
        };
        self.alternate_start = start;

        self.clock = ClockModel::new();
        if let Some(wire) = clock {
            self.clock.apply_wire(&wire);
        }

        self.finished = finished;
        self.shared.set_post_game(finished);
        if finished {
            self.clock.freeze(now_ms);
        }

        let mut events = vec![ClientEvent::HistoryChanged {
            len: self.history.len(),
        }];
        if let Some(state) = shared_state {
            events.extend(self.apply_shared_state(state));
        }
        self.interaction_enabled = true;
        events
    }

    fn apply_history(&mut self, moves: Vec<MoveRecord>) -> Vec<ClientEvent> {
        let old_len = self.history.len();
        if !self.history.apply_update(moves) {
            return Vec::new();
        }
        let new_len = self.history.len();
        self.branches.on_history_changed(old_len, new_len);

        let mut events = vec![ClientEvent::HistoryChanged { len: new_len }];
        if let Some(resolution) = self.pipeline.on_history_len(new_len) {
            events.push(ClientEvent::PendingResolved(resolution));
        }
        events
    }

    fn apply_annotation(&mut self, ply: usize, annotation: Annotation) {
        if !self.history.annotate(ply, annotation) {
            let err = ClientError::AnnotationOutOfRange {
                ply,
                len: self.history.len(),
            };
            debug!("[SYNC] {}", err);
        }
    }

    fn apply_shared_state(&mut self, state: SharedBoardWire) -> Vec<ClientEvent> {
        self.shared.on_server_state(&state);
        let branch = if state.active && !state.moves.is_empty() {
            Some(Branch {
                base_index: state.base_index as usize,
                moves: state.moves.clone(),
            })
        } else {
            None
        };
        self.branches
            .set_shared(branch, state.cursor as usize, self.history.len());
        vec![ClientEvent::SharedChanged]
    }

    fn apply_finished(
        &mut self,
        winner: Option<Side>,
        reason: String,
        now_ms: u64,
    ) -> Vec<ClientEvent> {
        info!("[SYNC] Game finished: {:?} ({})", winner, reason);
        self.finished = true;
        self.clock.freeze(now_ms);
        self.shared.set_post_game(true);
        self.pipeline.reset();

        // The finished notification fires once per session no matter how
        // often the state is re-broadcast or re-mounted.
        if self.gate.fire_once("game_finished") {
            vec![ClientEvent::GameFinished { winner, reason }]
        } else {
            Vec::new()
        }
    }
}

fn decode_start(codec: &dyn NotationCodec, encoding: String) -> ClientResult<Position> {
    codec
        .parse_start(&encoding)
        .ok_or(ClientError::BadStartEncoding { encoding })
}
