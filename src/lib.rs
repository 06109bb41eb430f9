//! shogiban: the reconciliation core of an online shogi client.
//!
//! Everything here is driven by two inputs: the server-confirmed move log
//! plus clock broadcasts coming in over the transport, and user intents
//! coming in from the rendering layer. The core derives board positions on
//! demand, projects the tiered clock between authoritative snapshots, and
//! reconciles optimistic local state against what the server confirms.
//!
//! Board rendering, move legality, notation parsing and the transport
//! itself live outside this crate, behind the traits in [`game::engine`]
//! and the message types in the `shared` crate.

pub mod core;
pub mod game;
pub mod networking;
pub mod review;

pub use networking::client::GameClient;
