//! Notification router.
//!
//! Turns server notifications into ordered console events. Two methods
//! are understood:
//!
//! | Method                            | Maps to                          |
//! |-----------------------------------|----------------------------------|
//! | `build/logMessage`                | one event at the wire severity   |
//! | `textDocument/publishDiagnostics` | one event per diagnostic         |
//! | *(any other)*                     | one `unknown event: …` warning   |
//!
//! Malformed parameters on a known method produce no events at all: the
//! build output stays clean and the line is logged at `DEBUG` instead.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::console::Level;

// ── Notification parameter types ────────────────────────────────────────

/// Parameters of `build/logMessage`.
#[derive(Debug, Deserialize)]
struct LogMessageParams {
    /// Wire severity code; the field is named `type` on the wire.
    #[serde(rename = "type")]
    severity: u64,
    message: String,
}

/// Parameters of `textDocument/publishDiagnostics`.
#[derive(Debug, Deserialize)]
struct PublishDiagnosticsParams {
    uri: String,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Deserialize)]
struct Diagnostic {
    range: Range,
    severity: Option<u64>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Range {
    start: Position,
}

/// Zero-based position, converted to one-based for display.
#[derive(Debug, Deserialize)]
struct Position {
    line: u64,
    character: u64,
}

// ── Public API ──────────────────────────────────────────────────────────

/// Classifies one notification into console events, in delivery order.
#[must_use]
pub fn classify(method: &str, params: Option<&Value>) -> Vec<(Level, String)> {
    match method {
        "build/logMessage" => classify_log_message(params),
        "textDocument/publishDiagnostics" => classify_diagnostics(params),
        other => vec![(
            Level::Warning,
            format!("unknown event: {other} {}", raw_params(params)),
        )],
    }
}

// ── Private helpers ─────────────────────────────────────────────────────

fn classify_log_message(params: Option<&Value>) -> Vec<(Level, String)> {
    let Some(parsed) = decode::<LogMessageParams>("build/logMessage", params) else {
        return Vec::new();
    };
    match Level::from_wire(parsed.severity) {
        // Debug chatter never reaches the console.
        Some(Level::Debug) | None => Vec::new(),
        Some(level) => vec![(level, parsed.message)],
    }
}

fn classify_diagnostics(params: Option<&Value>) -> Vec<(Level, String)> {
    let Some(parsed) = decode::<PublishDiagnosticsParams>("textDocument/publishDiagnostics", params)
    else {
        return Vec::new();
    };
    let path = file_uri_to_path(&parsed.uri);
    parsed
        .diagnostics
        .into_iter()
        .map(|diagnostic| {
            let level = diagnostic
                .severity
                .and_then(Level::from_wire)
                .unwrap_or(Level::Error);
            let line = diagnostic.range.start.line.saturating_add(1);
            let column = diagnostic.range.start.character.saturating_add(1);
            let text = format!("{path}:{line}:{column}: {}", diagnostic.message);
            (level, text)
        })
        .collect()
}

/// Decodes the params of a known method, or logs and yields nothing.
fn decode<T: for<'de> Deserialize<'de>>(method: &str, params: Option<&Value>) -> Option<T> {
    let value = params?.clone();
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            debug!(method, %err, "router: malformed params, dropping notification");
            None
        }
    }
}

fn raw_params(params: Option<&Value>) -> String {
    params.map_or_else(|| "null".to_owned(), Value::to_string)
}

/// Convert a `file://` URI back to a display path.
///
/// The inverse of the server's path-to-URI mapping: on Windows the
/// leading slash before the drive letter is dropped,
/// `file:///C:/foo/bar` → `C:/foo/bar`. URIs with any other scheme are
/// displayed as-is.
fn file_uri_to_path(uri: &str) -> String {
    let Some(rest) = uri.strip_prefix("file://") else {
        return uri.to_owned();
    };
    let bytes = rest.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        rest[1..].to_owned()
    } else {
        rest.to_owned()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
