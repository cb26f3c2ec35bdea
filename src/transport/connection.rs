//! Live connection to the build server.
//!
//! [`Connection::open`] dials the server's local socket and spawns two
//! tasks: a reader that frames inbound lines with [`LineCodec`], sniffs
//! them into [`ServerMessage`]s, and hands them to a [`SessionEvents`]
//! callback table; and a writer that drains an outbound channel onto the
//! socket. Sends are fire-and-forget: a failed write ends the writer
//! task and is logged, never surfaced to the caller.

use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use interprocess::local_socket::{
    tokio::{prelude::*, Stream},
    GenericFilePath,
};
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{ClientError, Result};
use crate::transport::codec::LineCodec;
use crate::wire::{Command, ServerMessage};

// ── Callback table ──────────────────────────────────────────────────────

/// Receives everything the server sends, from the reader task.
///
/// Implementations must be cheap and non-blocking: the reader delivers
/// events inline, so a stalled callback stalls the whole inbound stream.
pub trait SessionEvents: Send + Sync + 'static {
    /// A fire-and-forget event, e.g. a log message or diagnostics batch.
    fn on_notification(&self, method: &str, params: Option<&Value>);

    /// A server-initiated request. The client acknowledges receipt by
    /// doing nothing; no answer is ever written back.
    fn on_request(&self, method: &str, id: &str, params: Option<&Value>);

    /// Completion of a previously sent command.
    fn on_response(&self, id: &str, result: Option<&Value>, error: Option<&Value>);

    /// The server closed the stream or it failed. Called exactly once,
    /// and not at all when the client cancelled the connection itself.
    fn on_shutdown(&self);
}

// ── Connection ──────────────────────────────────────────────────────────

/// Handle to an established server connection.
///
/// Cloning the handle is not supported; share it behind an [`Arc`]. The
/// writer task ends when the last handle drops or `cancel` fires.
#[derive(Debug)]
pub struct Connection {
    outbound: mpsc::UnboundedSender<String>,
}

impl Connection {
    /// Dials the local socket at `socket_path` and starts the reader and
    /// writer tasks. `events` receives all inbound traffic; `cancel`
    /// stops both tasks without emitting a shutdown event.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionRefused`] when the socket exists
    /// but nothing is listening (the stale-handshake signal), and
    /// [`ClientError::Connect`] for any other dial failure.
    pub async fn open(
        socket_path: &Path,
        events: Arc<dyn SessionEvents>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let name = socket_path.to_fs_name::<GenericFilePath>().map_err(|err| {
            ClientError::Connect(format!(
                "invalid socket path '{}': {err}",
                socket_path.display()
            ))
        })?;
        let stream = Stream::connect(name).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::ConnectionRefused {
                ClientError::ConnectionRefused(format!("{}: {err}", socket_path.display()))
            } else {
                ClientError::Connect(format!("{}: {err}", socket_path.display()))
            }
        })?;
        debug!(socket = %socket_path.display(), "connected to server");

        let (recv, send) = stream.split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_reader(recv, events, cancel.clone()));
        tokio::spawn(run_writer(send, outbound_rx, cancel));
        Ok(Self { outbound })
    }

    /// Serializes and enqueues one command. Failures are logged and
    /// swallowed; correlation with a response is the caller's concern.
    pub fn send(&self, command: &Command) {
        match serde_json::to_string(command) {
            Ok(line) => self.send_line(line),
            Err(err) => warn!(%err, "failed to serialize outbound command"),
        }
    }

    /// Enqueues one raw line for the writer task.
    pub fn send_line(&self, line: String) {
        if self.outbound.send(line).is_err() {
            debug!("writer task gone, dropping outbound line");
        }
    }
}

// ── Reader task ─────────────────────────────────────────────────────────

/// Frames inbound lines and dispatches them to the callback table.
///
/// Unparseable lines are logged and skipped. EOF or a stream error
/// invokes [`SessionEvents::on_shutdown`] once and ends the task; a
/// cancellation ends it silently.
async fn run_reader<R>(stream: R, events: Arc<dyn SessionEvents>, cancel: CancellationToken)
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    let mut framed = FramedRead::new(stream, LineCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("reader: cancellation received, stopping");
                break;
            }

            item = framed.next() => {
                match item {
                    None => {
                        debug!("reader: server closed the stream");
                        events.on_shutdown();
                        break;
                    }

                    Some(Err(ClientError::Protocol(msg))) => {
                        // Framing-level problem (e.g. line too long); the
                        // stream itself is still usable.
                        warn!(error = %msg, "reader: framing error, skipping");
                    }

                    Some(Err(err)) => {
                        warn!(%err, "reader: stream error, stopping");
                        events.on_shutdown();
                        break;
                    }

                    Some(Ok(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        dispatch_line(&line, &events);
                    }
                }
            }
        }
    }
}

fn dispatch_line(line: &str, events: &Arc<dyn SessionEvents>) {
    match ServerMessage::parse(line) {
        Ok(ServerMessage::Response { id, result, error }) => {
            events.on_response(&id, result.as_ref(), error.as_ref());
        }
        Ok(ServerMessage::Request { method, id, params }) => {
            events.on_request(&method, &id, params.as_ref());
        }
        Ok(ServerMessage::Notification { method, params }) => {
            events.on_notification(&method, params.as_ref());
        }
        Err(err) => {
            debug!(%err, raw_line = %line, "reader: skipping unparseable line");
        }
    }
}

// ── Writer task ─────────────────────────────────────────────────────────

/// Drains outbound lines onto the socket, appending the delimiter.
///
/// Exits when the channel closes, the token fires, or a write fails.
/// Write failures are logged only; the in-flight command stays pending
/// until the reader observes the broken stream.
async fn run_writer<W>(
    mut stream: W,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin + Send,
{
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("writer: cancellation received, stopping");
                break;
            }

            line = outbound_rx.recv() => {
                match line {
                    None => {
                        debug!("writer: outbound channel closed, stopping");
                        break;
                    }
                    Some(mut line) => {
                        line.push('\n');
                        if let Err(err) = stream.write_all(line.as_bytes()).await {
                            warn!(%err, "writer: write to server failed, stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}
