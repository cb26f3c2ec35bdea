//! Server transport: discovery, framing, and the socket connection.
//!
//! The server advertises a local socket through a handshake artifact on
//! disk; traffic over that socket is newline-delimited JSON. Submodules:
//! - `discovery`: locate and parse the handshake artifact.
//! - `codec`: line framing with a length guard.
//! - `connection`: dial the socket and run the reader/writer tasks.

pub mod codec;
pub mod connection;
pub mod discovery;
