//! Integration tests for batch execution: ordering, completion events,
//! failure reporting, and the mid-command disconnect path.

use sbtc::client::repl;
use serde_json::Value;
use tempfile::TempDir;

use super::test_helpers::{
    envelope_type, exec_id, response_err, response_ok, socket_in, succeed_all, test_session,
    wait_for, write_portfile, FakeServer,
};

fn ev(label: &str, text: &str) -> (String, String) {
    (label.to_owned(), text.to_owned())
}

#[tokio::test]
async fn commands_run_in_order_with_one_completion_each() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, succeed_all());
    write_portfile(dir.path(), &socket);
    let (session, console) = test_session(dir.path(), &["compile", "test"]);

    session.run().await.expect("batch run succeeds");

    assert_eq!(
        console.events(),
        vec![
            ev("info", "> compile"),
            ev("success", "completed"),
            ev("info", "> test"),
            ev("success", "completed"),
        ]
    );

    let received = server.received();
    assert_eq!(received.len(), 3, "init plus two executions");
    assert_eq!(envelope_type(&received[0]), "InitCommand");
    assert_eq!(received[1]["commandLine"], "compile");
    assert_eq!(received[2]["commandLine"], "test");
}

#[tokio::test]
async fn every_execution_gets_a_fresh_correlation_id() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, succeed_all());
    write_portfile(dir.path(), &socket);
    let (session, _console) = test_session(dir.path(), &["clean", "compile"]);

    repl::run_batch(&session).await.expect("batch succeeds");

    let received = server.received();
    let ids: Vec<String> = received.iter().map(exec_id).collect();
    assert_eq!(ids.len(), 3);
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_ne!(ids[0], ids[2]);
}

#[tokio::test]
async fn a_failed_command_reports_an_error_and_the_batch_continues() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let _server = FakeServer::spawn(&socket, |envelope: &Value| {
        match envelope["execId"].as_str() {
            Some(id) if envelope["commandLine"] == "broken" => vec![response_err(id)],
            Some(id) => vec![response_ok(id)],
            None => Vec::new(),
        }
    });
    write_portfile(dir.path(), &socket);
    let (session, console) = test_session(dir.path(), &["broken", "test"]);

    repl::run_batch(&session).await.expect("batch completes");

    assert_eq!(
        console.events(),
        vec![
            ev("info", "> broken"),
            ev("error", "completed"),
            ev("info", "> test"),
            ev("success", "completed"),
        ]
    );
}

#[tokio::test]
async fn a_server_close_releases_the_pending_command() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, |_: &Value| Vec::new());
    write_portfile(dir.path(), &socket);
    let (session, console) = test_session(dir.path(), &["compile", "test"]);

    let run = repl::run_batch(&session);
    let close_after_exec = async {
        wait_for("the execution to arrive", || {
            server
                .received()
                .iter()
                .any(|e| envelope_type(e) == "ExecCommand")
        })
        .await;
        server.close();
    };
    let (outcome, ()) = tokio::join!(run, close_after_exec);
    outcome.expect("a disconnect ends the batch without an error");

    assert!(
        session.stop().is_cancelled(),
        "server EOF stops the session"
    );
    assert_eq!(
        console.events(),
        vec![ev("info", "> compile")],
        "no completion event and no second echo"
    );
    let executions = server
        .received()
        .iter()
        .filter(|e| envelope_type(e) == "ExecCommand")
        .count();
    assert_eq!(executions, 1, "the second command is never sent");
}
