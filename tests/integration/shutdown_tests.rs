//! Integration tests for session teardown: interactive `shutdown`,
//! the batch `shutdown` translation, and server-initiated EOF.

use sbtc::client::repl;
use serde_json::Value;
use tempfile::TempDir;

use super::test_helpers::{
    envelope_type, socket_in, succeed_all, test_session, wait_for, write_portfile, FakeServer,
};

#[tokio::test]
async fn interactive_shutdown_sends_the_exit_envelope_and_stops() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, |_: &Value| Vec::new());
    write_portfile(dir.path(), &socket);
    let (session, console) = test_session(dir.path(), &[]);

    repl::handle_line(&session, "shutdown")
        .await
        .expect("shutdown");

    assert!(session.stop().is_cancelled());
    wait_for("the exit envelope", || {
        server
            .received()
            .iter()
            .any(|e| envelope_type(e) == "ExitCommand")
    })
    .await;

    let received = server.received();
    assert_eq!(envelope_type(&received[0]), "InitCommand");
    assert_eq!(envelope_type(&received[1]), "ExitCommand");
    assert!(
        received[1].get("execId").is_none(),
        "the exit envelope is not correlated"
    );
    assert!(
        console.events().is_empty(),
        "shutdown produces no completion event"
    );
}

#[tokio::test]
async fn batch_shutdown_runs_as_the_exit_command() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, succeed_all());
    write_portfile(dir.path(), &socket);
    let (session, console) = test_session(dir.path(), &["shutdown"]);

    repl::run_batch(&session).await.expect("batch succeeds");

    let received = server.received();
    assert_eq!(received.len(), 2);
    assert_eq!(
        envelope_type(&received[1]),
        "ExecCommand",
        "batch shutdown is an execution, not the exit envelope"
    );
    assert_eq!(received[1]["commandLine"], "exit");
    assert_eq!(
        console.events(),
        vec![
            ("info".to_owned(), "> shutdown".to_owned()),
            ("success".to_owned(), "completed".to_owned()),
        ],
        "the echo shows what the user asked for"
    );
}

#[tokio::test]
async fn server_eof_stops_an_idle_session() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, succeed_all());
    write_portfile(dir.path(), &socket);
    let (session, _console) = test_session(dir.path(), &[]);

    session.connection().await.expect("connect");
    assert!(!session.stop().is_cancelled());

    server.close();
    wait_for("the stop flag", || session.stop().is_cancelled()).await;
}

#[tokio::test]
async fn client_side_stop_does_not_count_as_a_server_shutdown() {
    let dir = TempDir::new().expect("tempdir");
    let socket = socket_in(dir.path());
    let server = FakeServer::spawn(&socket, succeed_all());
    write_portfile(dir.path(), &socket);
    let (session, console) = test_session(dir.path(), &[]);

    session.connection().await.expect("connect");
    session.stop().cancel();

    // Give the transport tasks a moment to observe the cancellation.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(
        console.events().is_empty(),
        "cancelling locally produces no console output"
    );
    server.stop().await;
}
