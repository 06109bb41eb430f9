//! Tiered game clock
//!
//! Authoritative clock state arrives sporadically as server broadcasts;
//! between broadcasts the model projects each side's remaining time from
//! the last snapshot and the current wall clock, tier by tier. Time is
//! consumed strictly in order: main time, then byoyomi, then the shared
//! deferment pool. The non-moving side is frozen.
//!
//! Broadcasts come in three legacy wire shapes; [`normalize_wire`] is the
//! single place they become one canonical [`ClockSnapshot`], with the
//! priority rule effective > flat > nested applied per field. Incoming
//! snapshots that would zero both sides while the previous snapshot still
//! had time on either are discarded wholesale (transient malformed
//! broadcasts have been observed doing exactly that).
//!
//! The model also emits de-duplicated countdown events for audio/visual
//! cues: one per second for 9..0 inside the active sub-minute tier, one
//! per 10-second boundary for 50..10 above it. The de-dup memory resets
//! whenever the active side or tier changes, so a fixed-period timer can
//! re-evaluate the same instant forever without re-firing.

use tracing::{debug, warn};

use crate::game::types::Side;
use shared::ClockWire;

/// One side's time budget, split by tier. Also the shape of a projection
/// result: "what is left of each tier right now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SideClock {
    pub initial_ms: u64,
    pub byoyomi_ms: u64,
    pub deferment_ms: u64,
}

/// Consumption order of the tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTier {
    Main,
    Byoyomi,
    Deferment,
}

impl SideClock {
    pub fn new(initial_ms: u64, byoyomi_ms: u64, deferment_ms: u64) -> Self {
        Self {
            initial_ms,
            byoyomi_ms,
            deferment_ms,
        }
    }

    pub fn total_ms(&self) -> u64 {
        self.initial_ms + self.byoyomi_ms + self.deferment_ms
    }

    /// The tier currently being consumed. Once everything is exhausted
    /// this reports `Deferment`, where the flag fell.
    pub fn active_tier(&self) -> ClockTier {
        if self.initial_ms > 0 {
            ClockTier::Main
        } else if self.byoyomi_ms > 0 {
            ClockTier::Byoyomi
        } else {
            ClockTier::Deferment
        }
    }

    pub fn tier_ms(&self, tier: ClockTier) -> u64 {
        match tier {
            ClockTier::Main => self.initial_ms,
            ClockTier::Byoyomi => self.byoyomi_ms,
            ClockTier::Deferment => self.deferment_ms,
        }
    }

    /// Subtract elapsed running time, tier by tier. No tier goes negative.
    pub fn consume(mut self, mut elapsed_ms: u64) -> SideClock {
        let take = elapsed_ms.min(self.initial_ms);
        self.initial_ms -= take;
        elapsed_ms -= take;

        let take = elapsed_ms.min(self.byoyomi_ms);
        self.byoyomi_ms -= take;
        elapsed_ms -= take;

        let take = elapsed_ms.min(self.deferment_ms);
        self.deferment_ms -= take;

        self
    }
}

/// Canonical clock state: both sides' budgets as sampled at `anchor_ms`,
/// plus whose clock was running at that instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub anchor_ms: u64,
    pub side_to_move: Option<Side>,
    pub sente: SideClock,
    pub gote: SideClock,
}

impl ClockSnapshot {
    pub fn side(&self, side: Side) -> SideClock {
        match side {
            Side::Sente => self.sente,
            Side::Gote => self.gote,
        }
    }

    fn both_exhausted(&self) -> bool {
        self.sente.total_ms() == 0 && self.gote.total_ms() == 0
    }
}

/// Normalize one wire broadcast into the canonical snapshot.
///
/// Field priority where shapes conflict: dedicated-effective > flat >
/// nested. A field absent from every shape normalizes to zero.
pub fn normalize_wire(wire: &ClockWire) -> ClockSnapshot {
    let side_times = |side: Side| -> SideClock {
        let effective = wire.effective_side(side);
        let flat = wire.flat_side(side);
        let nested = wire.nested_side(side);
        let pick = |e: Option<u64>, f: Option<u64>, n: Option<u64>| e.or(f).or(n).unwrap_or(0);
        SideClock {
            initial_ms: pick(effective.initial_ms, flat.initial_ms, nested.initial_ms),
            byoyomi_ms: pick(effective.byoyomi_ms, flat.byoyomi_ms, nested.byoyomi_ms),
            deferment_ms: pick(
                effective.deferment_ms,
                flat.deferment_ms,
                nested.deferment_ms,
            ),
        }
    };

    ClockSnapshot {
        anchor_ms: wire.anchor_ms,
        side_to_move: wire.side_to_move,
        sente: side_times(Side::Sente),
        gote: side_times(Side::Gote),
    }
}

/// Discrete cue events, already de-duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    CountdownCrossed {
        side: Side,
        tier: ClockTier,
        seconds: u64,
    },
}

/// The countdown value a given tier remainder maps to, if any.
fn announce_value(tier_ms: u64) -> Option<u64> {
    if tier_ms <= 9_999 {
        Some(tier_ms / 1_000)
    } else if tier_ms <= 50_000 {
        Some(tier_ms.div_ceil(10_000) * 10)
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct CountdownMemory {
    key: Option<(Side, ClockTier)>,
    last: Option<u64>,
}

#[derive(Debug, Default)]
pub struct ClockModel {
    snapshot: Option<ClockSnapshot>,
    countdown: CountdownMemory,
}

impl ClockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&ClockSnapshot> {
        self.snapshot.as_ref()
    }

    /// Ingest a broadcast: normalize, then merge-guard against the prior
    /// snapshot.
    pub fn apply_wire(&mut self, wire: &ClockWire) {
        self.apply_snapshot(normalize_wire(wire));
    }

    pub fn apply_snapshot(&mut self, incoming: ClockSnapshot) {
        if let Some(prev) = &self.snapshot {
            if incoming.both_exhausted() && !prev.both_exhausted() {
                warn!(
                    "[CLOCK] Discarding regressive snapshot at anchor {}",
                    incoming.anchor_ms
                );
                return;
            }
        }
        debug!("[CLOCK] Snapshot applied, anchor {}", incoming.anchor_ms);
        self.snapshot = Some(incoming);
    }

    /// Projected remaining time for one side at `now_ms`. The moving side
    /// drains; the other is frozen at its snapshot values.
    pub fn remaining(&self, side: Side, now_ms: u64) -> Option<SideClock> {
        let snapshot = self.snapshot.as_ref()?;
        let budget = snapshot.side(side);
        if snapshot.side_to_move != Some(side) {
            return Some(budget);
        }
        let elapsed = now_ms.saturating_sub(snapshot.anchor_ms);
        Some(budget.consume(elapsed))
    }

    /// Stop both clocks at their current projected values (game finished,
    /// paused by disconnect). The snapshot's side is forced to none.
    pub fn freeze(&mut self, now_ms: u64) {
        let Some(snapshot) = self.snapshot else {
            return;
        };
        let sente = self.remaining(Side::Sente, now_ms).unwrap_or(snapshot.sente);
        let gote = self.remaining(Side::Gote, now_ms).unwrap_or(snapshot.gote);
        self.snapshot = Some(ClockSnapshot {
            anchor_ms: now_ms,
            side_to_move: None,
            sente,
            gote,
        });
        self.countdown = CountdownMemory::default();
    }

    /// Evaluate the countdown at `now_ms`. At most one event per call;
    /// identical instants never re-fire.
    pub fn tick(&mut self, now_ms: u64) -> Option<ClockEvent> {
        let snapshot = self.snapshot.as_ref()?;
        let side = match snapshot.side_to_move {
            Some(side) => side,
            None => {
                self.countdown = CountdownMemory::default();
                return None;
            }
        };

        let remaining = self.remaining(side, now_ms)?;
        let tier = remaining.active_tier();
        let value = announce_value(remaining.tier_ms(tier));

        let key = (side, tier);
        if self.countdown.key != Some(key) {
            // New side or tier: arm without firing so a mid-range join
            // does not replay a stale boundary.
            self.countdown.key = Some(key);
            self.countdown.last = value;
            return None;
        }

        match (self.countdown.last, value) {
            (last, Some(v)) if last.is_none() || last.is_some_and(|l| v < l) => {
                self.countdown.last = Some(v);
                Some(ClockEvent::CountdownCrossed {
                    side,
                    tier,
                    seconds: v,
                })
            }
            (_, v) => {
                self.countdown.last = v;
                None
            }
        }
    }
}
