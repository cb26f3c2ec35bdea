#![forbid(unsafe_code)]

//! Thin native client for the sbt build server.
//!
//! The crate attaches to a running build server over a local socket,
//! starting one when none is listening, then submits commands and
//! relays the server's log and diagnostic events to the console.
//! `main.rs` wires the pieces into the `sbtc` binary.

pub mod args;
pub mod client;
pub mod console;
pub mod errors;
pub mod transport;
pub mod wire;

pub use errors::{ClientError, Result};
