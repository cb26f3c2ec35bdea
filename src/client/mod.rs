//! Client session core.
//!
//! [`ClientSession`] owns every piece of mutable session state — the
//! single connection slot, the pending request table, the running flag,
//! and the launcher child slot — and hands it explicitly to the parts
//! that need it. Submodules:
//! - `launcher`: start a server when none is listening.
//! - `pending`: correlate sent commands with their responses.
//! - `router`: turn notifications into console events.
//! - `repl`: the batch and interactive execution loops.

pub mod launcher;
pub mod pending;
pub mod repl;
pub mod router;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::args::ClientArguments;
use crate::console::Console;
use crate::errors::{ClientError, Result};
use crate::transport::connection::{Connection, SessionEvents};
use crate::transport::discovery;
use crate::wire::Command;

use pending::{CommandOutcome, PendingRequests};

/// One client run. Constructed once in `main`, shared by reference with
/// the execution loop; the transport callbacks hold clones of the
/// individual fields they touch, never the session itself.
pub struct ClientSession {
    console: Arc<dyn Console>,
    arguments: ClientArguments,
    connection: Mutex<Option<Arc<Connection>>>,
    pending: PendingRequests,
    stop: CancellationToken,
    child_slot: launcher::ChildSlot,
}

impl ClientSession {
    /// Creates a session from parsed arguments.
    #[must_use]
    pub fn new(arguments: ClientArguments, console: Arc<dyn Console>) -> Self {
        Self {
            pending: PendingRequests::new(Arc::clone(&console)),
            console,
            arguments,
            connection: Mutex::new(None),
            stop: CancellationToken::new(),
            child_slot: launcher::ChildSlot::default(),
        }
    }

    /// Parsed launch configuration.
    #[must_use]
    pub fn arguments(&self) -> &ClientArguments {
        &self.arguments
    }

    /// Console sink shared with the transport callbacks.
    #[must_use]
    pub fn console(&self) -> &Arc<dyn Console> {
        &self.console
    }

    /// Pending request table.
    #[must_use]
    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Running flag, inverted: live until the session ends, cancelled
    /// exactly once (user exit, server shutdown, or termination signal)
    /// and never reset.
    #[must_use]
    pub fn stop(&self) -> &CancellationToken {
        &self.stop
    }

    /// Runs the session to completion: batch mode when commands were
    /// given on the command line, interactive mode otherwise.
    ///
    /// # Errors
    ///
    /// Propagates handshake and launcher failures. Command-level
    /// failures are console events, not errors.
    pub async fn run(&self) -> Result<()> {
        let watcher = self.spawn_signal_watcher();
        let result = if self.arguments.is_interactive() {
            repl::run_interactive(self).await
        } else {
            repl::run_batch(self).await
        };
        watcher.abort();
        result
    }

    /// Returns the live connection, performing the handshake on first
    /// use. Concurrent callers queue on the slot lock and observe at
    /// most one handshake sequence.
    ///
    /// # Errors
    ///
    /// Returns the handshake failure when no connection can be
    /// established; see [`ClientSession::establish`] for the retry
    /// policy.
    pub async fn connection(&self) -> Result<Arc<Connection>> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            return Ok(Arc::clone(connection));
        }
        let connection = self.establish().await?;
        *slot = Some(Arc::clone(&connection));
        Ok(connection)
    }

    /// Handshake with one stale-artifact retry.
    ///
    /// A refused dial on the first attempt means the artifact outlived
    /// its server: delete it and run the whole sequence once more,
    /// which then autostarts a fresh server. A second refusal, or any
    /// other failure on either attempt, is fatal.
    async fn establish(&self) -> Result<Arc<Connection>> {
        match self.try_connect().await {
            Err(ClientError::ConnectionRefused(msg)) => {
                warn!(error = %msg, "stale handshake artifact, deleting and retrying");
                let portfile = discovery::portfile_path(&self.arguments.base_directory);
                if let Err(err) = std::fs::remove_file(&portfile) {
                    if err.kind() != std::io::ErrorKind::NotFound {
                        return Err(err.into());
                    }
                }
                self.try_connect().await
            }
            outcome => outcome,
        }
    }

    /// One full connect sequence: autostart when no artifact exists,
    /// read the artifact, dial the socket, send the init command.
    async fn try_connect(&self) -> Result<Arc<Connection>> {
        let portfile = discovery::portfile_path(&self.arguments.base_directory);
        if !portfile.exists() {
            launcher::ensure_server_running(&self.arguments, &self.child_slot, &self.stop).await?;
        }
        let info = discovery::read_server_info(&portfile)?;
        let socket = discovery::socket_path(&info.uri)?;

        let events: Arc<dyn SessionEvents> = Arc::new(EventRouter {
            pending: self.pending.clone(),
            console: Arc::clone(&self.console),
            stop: self.stop.clone(),
        });
        let connection =
            Arc::new(Connection::open(&socket, events, self.stop.child_token()).await?);

        let exec_id = Uuid::new_v4().to_string();
        debug!(%exec_id, has_token = info.token.is_some(), "sending init command");
        // The init id is deliberately not registered: its ack resolves
        // as a no-op in the pending table.
        connection.send(&Command::InitCommand {
            token: info.token,
            exec_id,
            wants_ack: true,
        });
        Ok(connection)
    }

    /// Watches for a termination signal. On delivery it force-kills a
    /// still-starting launcher child and stops the session; a server
    /// that already finished starting is out of the slot and runs on.
    fn spawn_signal_watcher(&self) -> JoinHandle<()> {
        let slot = Arc::clone(&self.child_slot);
        let stop = self.stop.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("termination signal received, stopping");
            launcher::kill_slotted_child(&slot);
            stop.cancel();
        })
    }
}

// ── Event routing ───────────────────────────────────────────────────────

/// Callback table handed to the transport: routes inbound traffic to
/// the console, the pending table, and the running flag.
struct EventRouter {
    pending: PendingRequests,
    console: Arc<dyn Console>,
    stop: CancellationToken,
}

impl SessionEvents for EventRouter {
    fn on_notification(&self, method: &str, params: Option<&Value>) {
        for (level, text) in router::classify(method, params) {
            self.console.append(level, &text);
        }
    }

    fn on_request(&self, method: &str, id: &str, _params: Option<&Value>) {
        // Accepted, never answered.
        debug!(method, id, "ignoring server request");
    }

    fn on_response(&self, id: &str, result: Option<&Value>, error: Option<&Value>) {
        let outcome = if result.is_some() {
            CommandOutcome::Succeeded
        } else {
            CommandOutcome::Failed
        };
        if error.is_some() {
            debug!(id, "response carried an error payload");
        }
        self.pending.resolve(id, outcome);
    }

    fn on_shutdown(&self) {
        info!("server closed the connection, stopping");
        self.stop.cancel();
    }
}

/// Resolves when the process receives ctrl-c or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            warn!(%err, "ctrl-c signal handler failed");
        }
    }
}
