//! Error types shared across the client.

use std::fmt::{Display, Formatter};

/// Shared client result type.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error enumeration covering all failure modes of a session.
#[derive(Debug)]
pub enum ClientError {
    /// Command-line or property-override validation failure.
    Config(String),
    /// The server socket actively refused the connection.
    ConnectionRefused(String),
    /// Any other failure while connecting to the server socket.
    Connect(String),
    /// The handshake artifact is missing, unreadable, or malformed.
    Handshake(String),
    /// Spawning or supervising the server launcher failed.
    Launch(String),
    /// A wire message could not be serialized or parsed.
    Protocol(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::ConnectionRefused(msg) => write!(f, "connection refused: {msg}"),
            Self::Connect(msg) => write!(f, "connect: {msg}"),
            Self::Handshake(msg) => write!(f, "handshake: {msg}"),
            Self::Launch(msg) => write!(f, "launch: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::ConnectionRefused {
            Self::ConnectionRefused(err.to_string())
        } else {
            Self::Io(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
