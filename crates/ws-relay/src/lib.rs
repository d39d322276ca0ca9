//! Authenticated WebSocket relay for the pulse-relay backend.
//!
//! This crate implements a transparent, bidirectional WebSocket relay that
//! sits between an untrusted browser client and a realtime voice API which
//! requires a bearer credential the browser cannot attach to its own
//! WebSocket handshake. The relay authenticates to the upstream on the
//! client's behalf and then forwards frames verbatim in both directions.
//!
//! # Architecture
//!
//! ```text
//! Browser  <--WS-->  ws-relay  <--WSS + Bearer-->  realtime API
//!                       |
//!                 [Credential]
//!                       |
//!                  [Session]
//! ```
//!
//! Each accepted connection becomes one session: the relay resolves a
//! credential (a process-wide server secret, or a token handed over by the
//! client in its first control message), dials the upstream endpoint with
//! `Authorization: Bearer <credential>`, and runs two concurrent forwarding
//! directions until one of them ends. The first direction to end tears the
//! whole session down; the client always observes a close frame whose code
//! distinguishes the cause.

pub mod credential;
pub mod error;
pub mod listener;
pub mod relay;
pub mod session;
pub mod upstream;

// Re-export the primary public types at the crate root for convenience.
pub use credential::{Credential, CredentialMode};
pub use error::SessionError;
pub use listener::{RelayConfig, RelayServer};
pub use relay::{Direction, TerminationReason};
