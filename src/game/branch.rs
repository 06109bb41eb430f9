//! Review branches and the navigation cursor
//!
//! A branch is a private (or server-replicated, for the shared board)
//! alternate continuation diverging from the mainline at `base_index`.
//! At most one local and one shared branch exist at a time. The cursor is
//! a ply pointer into whichever view is selected, re-clamped into
//! `[0, max_reachable]` on every mutation.
//!
//! The one subtlety worth naming: appending the token the mainline would
//! play next is *not* a divergence. The user predicted the real
//! continuation, so the cursor just advances.

use tracing::debug;

use crate::game::engine::{apply_token, NotationCodec, PositionEngine};
use crate::game::history::MoveHistory;
use crate::game::reconstruct::{Integrity, Reconstructor, StartContext};
use crate::game::types::{Position, Side};

/// Who the local viewer is, for permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerRole {
    Participant(Side),
    Spectator,
}

impl ViewerRole {
    pub fn is_participant(&self) -> bool {
        matches!(self, ViewerRole::Participant(_))
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            ViewerRole::Participant(side) => Some(*side),
            ViewerRole::Spectator => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub base_index: usize,
    pub moves: Vec<String>,
}

impl Branch {
    pub fn tip(&self) -> usize {
        self.base_index + self.moves.len()
    }

    pub fn contains(&self, ply: usize) -> bool {
        (self.base_index..=self.tip()).contains(&ply)
    }
}

/// Uniform navigation command set, dispatched identically regardless of
/// which view is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    GotoPly(usize),
    StepForward,
    StepBack,
    GotoStart,
    GotoEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Token matched the mainline's next move; cursor advanced, no branch.
    Advanced,
    /// First divergence; a branch now exists with `base_index` = cursor
    /// at divergence.
    BranchCreated,
    /// Token applied cleanly on the active branch tip.
    Appended,
    /// Forwarded to the server (shared view); takes effect on echo-back.
    Proposed,
    /// Invalid or not permitted; state unchanged.
    Rejected,
}

#[derive(Debug, Default)]
pub struct BranchManager {
    cursor: usize,
    local: Option<Branch>,
    shared: Option<Branch>,
    shared_cursor: usize,
}

impl BranchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn local(&self) -> Option<&Branch> {
        self.local.as_ref()
    }

    pub fn shared(&self) -> Option<&Branch> {
        self.shared.as_ref()
    }

    pub fn shared_cursor(&self) -> usize {
        self.shared_cursor
    }

    pub fn local_active(&self) -> bool {
        self.local.is_some()
    }

    /// Highest ply the local-view cursor may reach.
    pub fn max_reachable(&self, history_len: usize) -> usize {
        match &self.local {
            Some(branch) => branch.tip(),
            None => history_len,
        }
    }

    /// Append a token in the local review view, per the divergence rules.
    #[allow(clippy::too_many_arguments)] // the full replay context is the point
    pub fn append_local(
        &mut self,
        engine: &dyn PositionEngine,
        codec: &dyn NotationCodec,
        reconstructor: &mut Reconstructor,
        ctx: StartContext<'_>,
        history: &MoveHistory,
        role: ViewerRole,
        token: &str,
    ) -> AppendOutcome {
        match &self.local {
            None => {
                if history.token_at(self.cursor) == Some(token) {
                    self.cursor += 1;
                    return AppendOutcome::Advanced;
                }
                if role == ViewerRole::Spectator {
                    debug!("[BRANCH] Spectator cannot open a local branch");
                    return AppendOutcome::Rejected;
                }
                // Validate against the position at the cursor before
                // accepting the divergence.
                let base = reconstructor.position_at(
                    engine,
                    codec,
                    ctx,
                    history.records(),
                    history.revision(),
                    self.cursor,
                );
                if base.integrity != Integrity::Ok {
                    debug!("[BRANCH] Divergence rejected: truncated mainline");
                    return AppendOutcome::Rejected;
                }
                if apply_token(engine, codec, &base.position, token).is_none() {
                    debug!("[BRANCH] Divergence rejected: token {:?} does not apply", token);
                    return AppendOutcome::Rejected;
                }
                self.local = Some(Branch {
                    base_index: self.cursor,
                    moves: vec![token.to_string()],
                });
                self.cursor += 1;
                AppendOutcome::BranchCreated
            }
            Some(branch) => {
                let tip = match branch_position(engine, codec, reconstructor, ctx, history, branch)
                {
                    Some(position) => position,
                    None => return AppendOutcome::Rejected,
                };
                if apply_token(engine, codec, &tip, token).is_none() {
                    debug!("[BRANCH] Append rejected at branch tip: {:?}", token);
                    return AppendOutcome::Rejected;
                }
                let branch = self.local.as_mut().expect("checked above");
                branch.moves.push(token.to_string());
                self.cursor = branch.tip();
                AppendOutcome::Appended
            }
        }
    }

    /// Dispatch one navigation command against the local view.
    /// Jump-style commands leave branch context and collapse the branch;
    /// stepping stays inside it.
    pub fn navigate(&mut self, command: NavCommand, history_len: usize) {
        match command {
            NavCommand::GotoPly(ply) => {
                if let Some(branch) = &self.local {
                    if branch.contains(ply) {
                        self.cursor = ply;
                        return;
                    }
                }
                self.local = None;
                self.cursor = ply.min(history_len);
            }
            NavCommand::GotoStart => {
                self.local = None;
                self.cursor = 0;
            }
            NavCommand::GotoEnd => {
                self.local = None;
                self.cursor = history_len;
            }
            NavCommand::StepForward => {
                self.cursor = (self.cursor + 1).min(self.max_reachable(history_len));
            }
            NavCommand::StepBack => {
                let floor = self.local.as_ref().map(|b| b.base_index).unwrap_or(0);
                self.cursor = self.cursor.saturating_sub(1).max(floor);
            }
        }
        self.clamp(history_len);
    }

    /// Confirmed history changed length: branches die, and a cursor that
    /// was following the live tip keeps following it.
    pub fn on_history_changed(&mut self, old_len: usize, new_len: usize) {
        self.local = None;
        if self.cursor >= old_len {
            self.cursor = new_len;
        }
        self.clamp(new_len);
    }

    /// Session/game switch: everything resets, cursor lands on the tip.
    pub fn on_session_changed(&mut self, history_len: usize) {
        self.local = None;
        self.shared = None;
        self.shared_cursor = 0;
        self.cursor = history_len;
    }

    /// Server echo of the shared branch/cursor. Local code never calls
    /// this with locally-invented state.
    pub fn set_shared(&mut self, branch: Option<Branch>, cursor: usize, history_len: usize) {
        let max = match &branch {
            Some(b) => b.tip(),
            None => history_len,
        };
        self.shared = branch;
        self.shared_cursor = cursor.min(max);
    }

    fn clamp(&mut self, history_len: usize) {
        let max = self.max_reachable(history_len);
        if self.cursor > max {
            self.cursor = max;
        }
        if let Some(branch) = &self.local {
            if self.cursor < branch.base_index {
                self.cursor = branch.base_index;
            }
        }
    }
}

/// Position at a branch tip: memoized mainline replay to the base, then
/// the branch moves on top. `None` if anything fails to apply.
pub fn branch_position(
    engine: &dyn PositionEngine,
    codec: &dyn NotationCodec,
    reconstructor: &mut Reconstructor,
    ctx: StartContext<'_>,
    history: &MoveHistory,
    branch: &Branch,
) -> Option<Position> {
    let base = reconstructor.position_at(
        engine,
        codec,
        ctx,
        history.records(),
        history.revision(),
        branch.base_index,
    );
    if base.plies_applied < branch.base_index {
        return None;
    }
    let mut position = base.position;
    for token in &branch.moves {
        position = apply_token(engine, codec, &position, token)?;
    }
    Some(position)
}
