//! Execution loops.
//!
//! Batch mode runs the configured commands in order and returns;
//! interactive mode prompts until the user or the server ends the
//! session. Both keep at most one command in flight: a command is sent,
//! then the loop sleeps on the pending table until the response
//! resolves it or the session stops.

use std::time::Duration;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;
use uuid::Uuid;

use crate::console::Level;
use crate::errors::{ClientError, Result};
use crate::wire::Command;

use super::ClientSession;

/// Grace period after sending the exit envelope, letting the writer
/// task flush before the session stops.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Runs every configured command in order, then returns.
///
/// Each command is echoed before it is sent and must resolve before the
/// next one goes out. The literal command `shutdown` is sent as the
/// server's `exit` command, which terminates the server; every other
/// string is submitted verbatim.
///
/// # Errors
///
/// Fails when the connection cannot be established.
pub async fn run_batch(session: &ClientSession) -> Result<()> {
    for command in session.arguments().command_arguments.clone() {
        if session.stop().is_cancelled() {
            break;
        }
        session.console().append(Level::Info, &format!("> {command}"));
        let command_line = if command == "shutdown" {
            "exit"
        } else {
            command.as_str()
        };
        submit_and_wait(session, command_line).await?;
    }
    Ok(())
}

/// Runs the interactive prompt until `exit`, `shutdown`, end of input,
/// or a server-initiated stop.
///
/// The prompt itself runs on a blocking thread so the loop can also
/// observe the running flag; a stop while the prompt is open abandons
/// the parked readline, which ends with the process.
///
/// # Errors
///
/// Fails when the connection cannot be established or the line editor
/// cannot be created.
pub async fn run_interactive(session: &ClientSession) -> Result<()> {
    // Connect before the first prompt so autostart output is not
    // interleaved with the editor.
    session.connection().await?;

    let mut editor = DefaultEditor::new()
        .map_err(|err| ClientError::Config(format!("failed to create line editor: {err}")))?;

    while !session.stop().is_cancelled() {
        let mut reading = tokio::task::spawn_blocking(move || {
            let line = editor.readline("> ");
            (editor, line)
        });

        let (returned, line) = tokio::select! {
            biased;

            () = session.stop().cancelled() => {
                reading.abort();
                break;
            }

            joined = &mut reading => joined
                .map_err(|err| ClientError::Config(format!("prompt task failed: {err}")))?,
        };
        editor = returned;

        match line {
            Ok(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    let _ = editor.add_history_entry(trimmed);
                }
                handle_line(session, &text).await?;
            }
            // Ctrl-c discards the current line and prompts again.
            Err(ReadlineError::Interrupted) => {}
            Err(ReadlineError::Eof) => {
                session.stop().cancel();
            }
            Err(err) => {
                return Err(ClientError::Io(format!("prompt failed: {err}")));
            }
        }
    }
    Ok(())
}

/// Applies one line of interactive input.
///
/// Empty and whitespace-only lines are ignored. `exit` stops the client
/// and leaves the server running; `shutdown` asks the server to
/// terminate and then stops; anything else runs as a command, blocking
/// until it resolves.
///
/// # Errors
///
/// Fails when a command needs a connection and none can be established.
pub async fn handle_line(session: &ClientSession, line: &str) -> Result<()> {
    let input = line.trim();
    if input.is_empty() {
        return Ok(());
    }
    match input {
        "exit" => {
            session.stop().cancel();
            Ok(())
        }
        "shutdown" => {
            let connection = session.connection().await?;
            connection.send(&Command::ExitCommand);
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            session.stop().cancel();
            Ok(())
        }
        command => submit_and_wait(session, command).await,
    }
}

/// Sends one execution command and sleeps until its response resolves
/// it or the session stops. At most one command from a loop is ever in
/// flight.
async fn submit_and_wait(session: &ClientSession, command_line: &str) -> Result<()> {
    let connection = session.connection().await?;
    let exec_id = Uuid::new_v4().to_string();
    let completion = session.pending().register(&exec_id);
    connection.send(&Command::ExecCommand {
        command_line: command_line.to_owned(),
        exec_id: exec_id.clone(),
    });

    tokio::select! {
        biased;

        () = session.stop().cancelled() => {
            debug!(%exec_id, "session stopped while a command was pending");
        }

        _ = completion => {}
    }
    Ok(())
}
