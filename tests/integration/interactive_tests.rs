//! Integration tests for interactive line handling: trimming, the
//! `exit` fast path, and command submission semantics.

use sbtc::client::repl;
use serde_json::Value;
use tempfile::TempDir;

use super::test_helpers::{
    envelope_type, socket_in, succeed_all, test_session, wait_for, write_portfile, FakeServer,
};

#[tokio::test]
async fn blank_lines_are_ignored_without_touching_the_server() {
    let dir = TempDir::new().expect("tempdir");
    // No portfile and no server: a dial attempt would fail the test.
    let (session, console) = test_session(dir.path(), &[]);

    repl::handle_line(&session, "").await.expect("no-op");
    repl::handle_line(&session, "   \t ").await.expect("no-op");

    assert!(console.events().is_empty());
    assert!(!session.stop().is_cancelled());
}

#[tokio::test]
async fn exit_stops_the_client_without_any_server() {
    let dir = TempDir::new().expect("tempdir");
    let (session, _console) = test_session(dir.path(), &[]);

    repl::handle_line(&session, "exit").await.expect("exit");

    assert!(session.stop().is_cancelled());
}

#[tokio::test]
async fn exit_leaves_an_established_connection_untouched() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, succeed_all());
    write_portfile(dir.path(), &socket);
    let (session, _console) = test_session(dir.path(), &[]);

    session.connection().await.expect("connect");
    repl::handle_line(&session, "exit").await.expect("exit");

    assert!(session.stop().is_cancelled());
    wait_for("the init envelope", || !server.received().is_empty()).await;
    let received = server.received();
    assert_eq!(received.len(), 1, "only the handshake reached the server");
    assert_eq!(envelope_type(&received[0]), "InitCommand");
}

#[tokio::test]
async fn commands_are_trimmed_and_awaited_to_completion() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, succeed_all());
    write_portfile(dir.path(), &socket);
    let (session, console) = test_session(dir.path(), &[]);

    repl::handle_line(&session, "  compile  ")
        .await
        .expect("command resolves");

    // handle_line returns only after the response resolved the command.
    assert_eq!(
        console.events(),
        vec![("success".to_owned(), "completed".to_owned())]
    );
    let executions: Vec<Value> = server
        .received()
        .into_iter()
        .filter(|e| envelope_type(e) == "ExecCommand")
        .collect();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0]["commandLine"], "compile");
    assert!(!session.stop().is_cancelled(), "the session keeps running");
}

#[tokio::test]
async fn consecutive_commands_reuse_the_connection() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, succeed_all());
    write_portfile(dir.path(), &socket);
    let (session, console) = test_session(dir.path(), &[]);

    repl::handle_line(&session, "clean").await.expect("clean");
    repl::handle_line(&session, "compile").await.expect("compile");

    let received = server.received();
    let inits = received
        .iter()
        .filter(|e| envelope_type(e) == "InitCommand")
        .count();
    assert_eq!(inits, 1, "one handshake for the whole session");
    assert_eq!(
        console.events(),
        vec![
            ("success".to_owned(), "completed".to_owned()),
            ("success".to_owned(), "completed".to_owned()),
        ]
    );
}
