//! Legacy clock broadcast shapes.
//!
//! The server has shipped three generations of clock payloads: the original
//! flat per-side fields, a nested `times` object, and the current dedicated
//! "effective" block. Old games replayed from archives can still carry any
//! of them, sometimes more than one at once. This module only models the
//! shapes; the client core owns the normalization rule
//! (effective > flat > nested, per field).

use serde::{Deserialize, Serialize};

use crate::protocol::Side;

/// Per-side time fields. Every field is optional so the normalizer can
/// merge shapes field by field.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SideTimesWire {
    #[serde(default)]
    pub initial_ms: Option<u64>,
    #[serde(default)]
    pub byoyomi_ms: Option<u64>,
    #[serde(default)]
    pub deferment_ms: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TimesWire {
    #[serde(default)]
    pub sente: SideTimesWire,
    #[serde(default)]
    pub gote: SideTimesWire,
}

/// One clock broadcast as it appears on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ClockWire {
    /// Server timestamp the times were sampled at, epoch milliseconds.
    pub anchor_ms: u64,
    /// Side whose clock was running at the anchor; `None` when the game is
    /// finished or paused.
    #[serde(default)]
    pub side_to_move: Option<Side>,

    // Flat legacy shape.
    #[serde(default)]
    pub sente_initial_ms: Option<u64>,
    #[serde(default)]
    pub sente_byoyomi_ms: Option<u64>,
    #[serde(default)]
    pub sente_deferment_ms: Option<u64>,
    #[serde(default)]
    pub gote_initial_ms: Option<u64>,
    #[serde(default)]
    pub gote_byoyomi_ms: Option<u64>,
    #[serde(default)]
    pub gote_deferment_ms: Option<u64>,

    // Nested legacy shape.
    #[serde(default)]
    pub nested: Option<TimesWire>,

    // Dedicated effective-times shape. Wins over the other two.
    #[serde(default)]
    pub effective: Option<TimesWire>,
}

impl ClockWire {
    /// The flat fields for one side, regrouped into a `SideTimesWire`.
    pub fn flat_side(&self, side: Side) -> SideTimesWire {
        match side {
            Side::Sente => SideTimesWire {
                initial_ms: self.sente_initial_ms,
                byoyomi_ms: self.sente_byoyomi_ms,
                deferment_ms: self.sente_deferment_ms,
            },
            Side::Gote => SideTimesWire {
                initial_ms: self.gote_initial_ms,
                byoyomi_ms: self.gote_byoyomi_ms,
                deferment_ms: self.gote_deferment_ms,
            },
        }
    }

    pub fn nested_side(&self, side: Side) -> SideTimesWire {
        let nested = self.nested.unwrap_or_default();
        match side {
            Side::Sente => nested.sente,
            Side::Gote => nested.gote,
        }
    }

    pub fn effective_side(&self, side: Side) -> SideTimesWire {
        let effective = self.effective.unwrap_or_default();
        match side {
            Side::Sente => effective.sente,
            Side::Gote => effective.gote,
        }
    }
}

impl SideTimesWire {
    pub fn full(initial_ms: u64, byoyomi_ms: u64, deferment_ms: u64) -> Self {
        Self {
            initial_ms: Some(initial_ms),
            byoyomi_ms: Some(byoyomi_ms),
            deferment_ms: Some(deferment_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_only_json() {
        // Archived games from the first protocol generation carry only the
        // flat fields; everything else must default cleanly.
        let json = r#"{
            "anchor_ms": 1700000000000,
            "side_to_move": "sente",
            "sente_initial_ms": 600000,
            "gote_initial_ms": 540000
        }"#;
        let wire: ClockWire = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(wire.anchor_ms, 1_700_000_000_000);
        assert_eq!(wire.side_to_move, Some(Side::Sente));
        assert_eq!(wire.flat_side(Side::Sente).initial_ms, Some(600_000));
        assert_eq!(wire.flat_side(Side::Gote).initial_ms, Some(540_000));
        assert_eq!(wire.flat_side(Side::Sente).byoyomi_ms, None);
        assert!(wire.nested.is_none());
        assert!(wire.effective.is_none());
    }

    #[test]
    fn test_nested_json() {
        let json = r#"{
            "anchor_ms": 5,
            "nested": { "sente": { "initial_ms": 1000 }, "gote": { "byoyomi_ms": 30000 } }
        }"#;
        let wire: ClockWire = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(wire.nested_side(Side::Sente).initial_ms, Some(1000));
        assert_eq!(wire.nested_side(Side::Gote).byoyomi_ms, Some(30_000));
        assert_eq!(wire.side_to_move, None);
    }

    #[test]
    fn test_all_shapes_bincode_roundtrip() {
        let wire = ClockWire {
            anchor_ms: 99,
            side_to_move: Some(Side::Gote),
            sente_initial_ms: Some(1),
            effective: Some(TimesWire {
                sente: SideTimesWire::full(5000, 3000, 2000),
                gote: SideTimesWire::full(4000, 3000, 2000),
            }),
            ..Default::default()
        };
        let bytes = bincode::serialize(&wire).expect("Should serialize");
        let back: ClockWire = bincode::deserialize(&bytes).expect("Should deserialize");
        assert_eq!(back, wire);
    }

    #[test]
    fn test_missing_block_accessors_default() {
        let wire = ClockWire::default();
        assert_eq!(wire.effective_side(Side::Sente), SideTimesWire::default());
        assert_eq!(wire.nested_side(Side::Gote), SideTimesWire::default());
    }
}
