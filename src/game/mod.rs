//! Game-state models: positions, the confirmed-move history, replay,
//! branches, the tiered clock and the optimistic move pipeline.

pub mod branch;
pub mod clock;
pub mod engine;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
pub mod history;
pub mod pending;
pub mod reconstruct;
pub mod types;
