//! Wire envelopes exchanged with the build server.
//!
//! Outbound traffic is the server's tagged command format; inbound
//! traffic is JSON-RPC shaped. Inbound lines are sniffed rather than
//! strictly deserialized, because the server interleaves requests,
//! responses, and notifications on one stream and omits members freely.

use serde::Serialize;
use serde_json::Value;

use crate::errors::{ClientError, Result};

// ── Outbound ────────────────────────────────────────────────────────────

/// Command envelope sent to the server, tagged with its `type` member.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Command {
    /// Opens the session. `token` is `null` when the handshake artifact
    /// named no token file. The ack (when requested) arrives as a plain
    /// response correlated by `exec_id`.
    #[serde(rename_all = "camelCase")]
    InitCommand {
        /// Authentication token from the handshake artifact.
        token: Option<String>,
        /// Correlation id for the acknowledgement response.
        exec_id: String,
        /// Asks the server to acknowledge the init.
        wants_ack: bool,
    },
    /// Runs one command line on the server.
    #[serde(rename_all = "camelCase")]
    ExecCommand {
        /// Verbatim command line, e.g. `compile`.
        command_line: String,
        /// Correlation id echoed back in the completion response.
        exec_id: String,
    },
    /// Asks the server to terminate this session.
    ExitCommand,
}

// ── Inbound ─────────────────────────────────────────────────────────────

/// One inbound line, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Completion of a previously sent command, correlated by id.
    Response {
        /// Correlation id; numeric ids are normalized to decimal text.
        id: String,
        /// Present when the command succeeded.
        result: Option<Value>,
        /// Present when the command failed.
        error: Option<Value>,
    },
    /// Server-initiated request. The client accepts these but never
    /// answers them.
    Request {
        /// Method name.
        method: String,
        /// Correlation id the server would expect an answer under.
        id: String,
        /// Method parameters, if any.
        params: Option<Value>,
    },
    /// Fire-and-forget event such as a log message or diagnostics batch.
    Notification {
        /// Method name.
        method: String,
        /// Method parameters, if any.
        params: Option<Value>,
    },
}

impl ServerMessage {
    /// Classifies one wire line.
    ///
    /// A member named `id` alongside `result` or `error` makes a
    /// response; `method` with `id` makes a request; bare `method` makes
    /// a notification.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] when the line is not a JSON
    /// object or fits none of the three shapes.
    pub fn parse(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        let Some(envelope) = value.as_object() else {
            return Err(ClientError::Protocol(format!(
                "expected a JSON object, got: {line}"
            )));
        };
        let id = envelope.get("id").and_then(normalize_id);
        let method = envelope.get("method").and_then(Value::as_str);
        let result = envelope.get("result").cloned();
        let error = envelope.get("error").cloned();
        let params = envelope.get("params").cloned();

        if let Some(id) = id {
            if result.is_some() || error.is_some() {
                return Ok(Self::Response { id, result, error });
            }
            if let Some(method) = method {
                return Ok(Self::Request {
                    method: method.to_owned(),
                    id,
                    params,
                });
            }
        }
        if let Some(method) = method {
            return Ok(Self::Notification {
                method: method.to_owned(),
                params,
            });
        }
        Err(ClientError::Protocol(format!(
            "unrecognized message shape: {line}"
        )))
    }
}

/// Correlation ids arrive as strings or numbers; both compare as text.
fn normalize_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
