//! Wire types shared between the shogiban client core and the game server.
//!
//! Everything in this crate is plain serde data: no behavior beyond field
//! accessors. The client core normalizes and validates these shapes at its
//! own boundary.

pub mod clock_wire;
pub mod protocol;

pub use clock_wire::{ClockWire, SideTimesWire, TimesWire};
pub use protocol::{
    AnalysisStatus, Annotation, ClientMessage, MoveRecord, Score, ServerMessage, SharedBoardWire,
    Side,
};
