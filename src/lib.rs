//! Real-time TCP chat relay.
//!
//! Clients hold a plain TCP connection to the relay and exchange
//! newline-delimited JSON envelopes. Every message a client submits is
//! re-stamped by the server and fanned out to all other connected clients;
//! joins and leaves are announced the same way. Each module focuses on a
//! concrete responsibility:
//!
//! - [`config`] reads the `CHAT_PORT` / `CHAT_ADDR` environment variables.
//! - [`message`] defines the wire envelope plus async read/write helpers
//!   for the JSON line protocol.
//! - [`registry`] tracks live connections and fans envelopes out to their
//!   bounded outbound queues without blocking on slow receivers.
//! - [`server`] accepts TCP connections and drives one session per client.
//! - [`client`] connects to the relay, multiplexing stdin and server
//!   envelopes for a terminal user.
//! - [`logging`] installs the tracing subscriber used by both binaries.
//!
//! Integration and end-to-end tests use this crate directly to exercise
//! the relay semantics and the wire protocol.

pub mod client;
pub mod config;
pub mod logging;
pub mod message;
pub mod registry;
pub mod server;
