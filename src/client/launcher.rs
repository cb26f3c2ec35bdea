//! Server launcher.
//!
//! When no handshake artifact exists the client starts a server itself:
//! it spawns the launcher script in the project directory with piped
//! stdio, relays the launcher's output (and the user's input) while the
//! server boots, and polls for the artifact. The spawned process is
//! deliberately left running on success; it is killed only through the
//! signal hook while startup is still in progress.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::args::ClientArguments;
use crate::errors::{ClientError, Result};
use crate::transport::discovery;

/// Cadence of the handshake-artifact poll.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Readiness-poll timeout for the stdin relay, in milliseconds. Matches
/// [`POLL_INTERVAL`].
#[cfg(unix)]
const STDIN_POLL_MILLIS: u8 = 10;

/// Argument prefixes that mark color as user-chosen.
const COLOR_PREFIXES: &[&str] = &["-Dsbt.color=", "--color"];

/// Argument prefixes that mark supershell as user-chosen.
const SUPERSHELL_PREFIXES: &[&str] = &["-Dsbt.supershell=", "--supershell"];

/// Shared slot holding the launcher child while it is still starting.
///
/// A populated slot arms the signal hook: on abnormal exit the hook
/// force-kills the occupant. The slot is cleared on every launcher exit
/// path, after which the server (if it came up) runs on untouched.
pub type ChildSlot = Arc<Mutex<Option<Child>>>;

/// Force-kills whatever child currently occupies the slot. Called from
/// the signal hook; a no-op once startup has released the child.
pub fn kill_slotted_child(slot: &ChildSlot) {
    if let Some(mut child) = lock_slot(slot).take() {
        info!("killing launcher child after abnormal exit");
        if let Err(err) = child.start_kill() {
            warn!(%err, "failed to kill launcher child");
        }
    }
}

/// Computes the arguments the launcher is started with: the user's
/// forwarded flags plus terminal-derived color and supershell defaults
/// for anything the user did not choose explicitly.
#[must_use]
pub fn effective_arguments(
    user_args: &[String],
    stdout_tty: bool,
    stderr_tty: bool,
) -> Vec<String> {
    let mut args = user_args.to_vec();
    if !has_flag(user_args, COLOR_PREFIXES) {
        let color = if stdout_tty { "always" } else { "never" };
        args.push(format!("-Dsbt.color={color}"));
    }
    if !has_flag(user_args, SUPERSHELL_PREFIXES) {
        let supershell = stdout_tty && stderr_tty;
        args.push(format!("-Dsbt.supershell={supershell}"));
    }
    args
}

/// Starts the launcher script and waits until a server announces itself.
///
/// Returns as soon as the handshake artifact appears, or when both of
/// the launcher's output channels close without one (the subsequent
/// dial then reports the real failure). The child handle is parked in
/// `slot` for the duration so the signal hook can reach it.
///
/// # Errors
///
/// Returns [`ClientError::Launch`] when the script cannot be spawned,
/// its stdio cannot be captured, or `stop` fires mid-startup.
pub async fn ensure_server_running(
    args: &ClientArguments,
    slot: &ChildSlot,
    stop: &CancellationToken,
) -> Result<()> {
    let portfile = discovery::portfile_path(&args.base_directory);
    let launch_args = effective_arguments(
        &args.sbt_arguments,
        atty::is(atty::Stream::Stdout),
        atty::is(atty::Stream::Stderr),
    );
    info!(
        script = %args.launcher_script,
        directory = %args.base_directory.display(),
        "starting build server"
    );

    let mut child = Command::new(&args.launcher_script)
        .args(&launch_args)
        .current_dir(&args.base_directory)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            ClientError::Launch(format!(
                "failed to spawn '{}': {err}",
                args.launcher_script
            ))
        })?;

    let child_stdin = child
        .stdin
        .take()
        .ok_or_else(|| ClientError::Launch("failed to capture launcher stdin".into()))?;
    let child_stdout = child
        .stdout
        .take()
        .ok_or_else(|| ClientError::Launch("failed to capture launcher stdout".into()))?;
    let child_stderr = child
        .stderr
        .take()
        .ok_or_else(|| ClientError::Launch("failed to capture launcher stderr".into()))?;

    // Arm the signal hook for the startup window.
    lock_slot(slot).replace(child);

    let out_task = forward(child_stdout, tokio::io::stdout(), "stdout");
    let err_task = forward(child_stderr, tokio::io::stderr(), "stderr");
    let stdin_task = forward_stdin(child_stdin);

    let result = wait_for_portfile(&portfile, stop, &out_task, &err_task).await;

    // Single release path: stop relaying, close our ends of the pipes,
    // and hand the server back to itself.
    out_task.abort();
    err_task.abort();
    stdin_task.abort();
    drop(lock_slot(slot).take());
    result
}

// ── Private helpers ─────────────────────────────────────────────────────

/// Polls for the handshake artifact at a fixed cadence.
async fn wait_for_portfile(
    portfile: &Path,
    stop: &CancellationToken,
    out_task: &JoinHandle<()>,
    err_task: &JoinHandle<()>,
) -> Result<()> {
    loop {
        if stop.is_cancelled() {
            return Err(ClientError::Launch(
                "interrupted while waiting for the server".into(),
            ));
        }
        if portfile.exists() {
            debug!(portfile = %portfile.display(), "server announced itself");
            return Ok(());
        }
        if out_task.is_finished() && err_task.is_finished() {
            // The launcher closed both channels without a handshake;
            // let the dial report what actually happened.
            debug!("launcher output closed before the handshake artifact appeared");
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Relays one stdio channel until EOF, error, or abort.
fn forward<R, W>(mut from: R, mut to: W, channel: &'static str) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = tokio::io::copy(&mut from, &mut to).await {
            debug!(channel, %err, "stdio forwarding ended with error");
        }
    })
}

/// Relays the client's own stdin to the launcher child.
///
/// The read side runs on a plain detached thread feeding a channel; the
/// returned task drains the channel into the child and owns the child's
/// stdin handle. The thread only reads bytes that are already available,
/// so aborting the task closes the window without leaving a read pending
/// on the terminal — anything typed afterwards goes to the prompt, not
/// to a leftover relay.
fn forward_stdin(mut child_stdin: ChildStdin) -> JoinHandle<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    std::thread::spawn(move || relay_stdin(&tx));
    tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            if let Err(err) = child_stdin.write_all(&chunk).await {
                debug!(%err, "stdin forwarding ended with error");
                break;
            }
        }
    })
}

#[cfg(unix)]
fn relay_stdin(tx: &mpsc::UnboundedSender<Vec<u8>>) {
    relay_available_input(std::io::stdin(), tx);
}

/// Blocking-read fallback for platforms without `poll(2)`. The final
/// read can outlive the startup window here; unix avoids that with the
/// availability-gated loop below.
#[cfg(not(unix))]
fn relay_stdin(tx: &mpsc::UnboundedSender<Vec<u8>>) {
    use std::io::Read;

    let mut stdin = std::io::stdin();
    let mut buf = [0u8; 1024];
    loop {
        match stdin.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

/// Relays input chunks into `tx` until the channel closes, the source
/// reaches EOF, or polling fails. A read is only issued once the
/// descriptor reports bytes ready, so the loop never blocks in `read`
/// and exits within one poll interval of the channel closing.
#[cfg(unix)]
fn relay_available_input<R>(mut input: R, tx: &mpsc::UnboundedSender<Vec<u8>>)
where
    R: std::io::Read + std::os::fd::AsFd,
{
    use nix::errno::Errno;
    use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

    let mut buf = [0u8; 1024];
    while !tx.is_closed() {
        let ready = {
            let mut fds = [PollFd::new(input.as_fd(), PollFlags::POLLIN)];
            poll(&mut fds, PollTimeout::from(STDIN_POLL_MILLIS))
        };
        match ready {
            Ok(0) | Err(Errno::EINTR) => continue,
            Ok(_) => {}
            Err(_) => break,
        }
        if tx.is_closed() {
            break;
        }
        match input.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

fn has_flag(args: &[String], prefixes: &[&str]) -> bool {
    args.iter()
        .any(|arg| prefixes.iter().any(|prefix| arg.starts_with(prefix)))
}

fn lock_slot(slot: &ChildSlot) -> MutexGuard<'_, Option<Child>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
