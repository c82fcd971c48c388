//! Reliable, in-order, unidirectional file transfer over UDP: a three-way
//! handshake, cumulative-ACK retransmission, a receiver-side reorder
//! buffer, TCP-style congestion control, and a graceful FIN teardown.
//!
//! The wire protocol and the core engines (packet codec, sequence
//! arithmetic, connection state machine, send/receive engines, congestion
//! controller) are transport-agnostic: they are written against the
//! [`net::Transport`] trait so the exact same code drives a real UDP
//! socket in [`bin/server.rs`](../src/bin/server.rs) /
//! [`bin/client.rs`](../src/bin/client.rs) and a deterministic mock in
//! tests.

pub mod client;
pub mod conn;
pub mod congestion;
mod err;
pub mod net;
pub mod packet;
pub mod recv_engine;
pub mod send_engine;
pub mod seq;
pub mod server;
pub mod timer;

pub use err::{Error, Result};
