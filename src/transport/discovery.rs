//! Server discovery via the handshake artifact.
//!
//! A running server advertises itself by writing
//! `project/target/active.json` under the project root. The artifact
//! names the local socket to dial and, optionally, a second file
//! holding the session token. A stale artifact (server gone, file left
//! behind) is detected later, when the dial is refused.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{ClientError, Result};

/// Relative location of the handshake artifact under the project root.
const PORTFILE_RELATIVE: &str = "project/target/active.json";

/// Connection endpoint advertised by a running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Endpoint URI, e.g. `local:///home/alice/proj/.sock`.
    pub uri: String,
    /// Session token, when the artifact named a token file.
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortfileEntry {
    uri: String,
    #[serde(rename = "tokenfilePath")]
    tokenfile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenfileEntry {
    token: String,
}

/// Absolute path of the handshake artifact for a project root.
#[must_use]
pub fn portfile_path(base_directory: &Path) -> PathBuf {
    base_directory.join(PORTFILE_RELATIVE)
}

/// Reads the handshake artifact and, when present, the token file it
/// points at.
///
/// # Errors
///
/// Returns [`ClientError::Io`] when either file cannot be read and
/// [`ClientError::Handshake`] when the JSON does not have the expected
/// shape.
pub fn read_server_info(portfile: &Path) -> Result<ServerInfo> {
    let raw = std::fs::read_to_string(portfile)?;
    let entry: PortfileEntry = serde_json::from_str(&raw)
        .map_err(|err| ClientError::Handshake(format!("malformed portfile: {err}")))?;
    let token = match entry.tokenfile_path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            let tokenfile: TokenfileEntry = serde_json::from_str(&raw)
                .map_err(|err| ClientError::Handshake(format!("malformed token file: {err}")))?;
            Some(tokenfile.token)
        }
        None => None,
    };
    Ok(ServerInfo {
        uri: entry.uri,
        token,
    })
}

/// Resolves an advertised URI to a local socket path. Only the
/// `local://` scheme is supported.
///
/// # Errors
///
/// Returns [`ClientError::Connect`] for any other scheme.
pub fn socket_path(uri: &str) -> Result<PathBuf> {
    uri.strip_prefix("local://")
        .map(PathBuf::from)
        .ok_or_else(|| ClientError::Connect(format!("unsupported server uri: {uri}")))
}
