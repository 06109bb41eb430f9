//! Transport-facing wiring: the `GameClient` applies inbound server
//! messages atomically and queues outbound proposals for the embedding
//! transport to drain. The transport itself (websocket, p2p, whatever)
//! lives outside this crate.

pub mod client;

pub use client::{ActiveView, ClientEvent, GameClient};
