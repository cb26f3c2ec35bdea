#![forbid(unsafe_code)]

//! `sbtc` — thin native client for the sbt build server.
//!
//! Attaches to the server advertised by the project's handshake
//! artifact, starting one when none is listening, then either executes
//! the commands given on the command line or opens an interactive
//! prompt.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use sbtc::args::ClientArguments;
use sbtc::client::ClientSession;
use sbtc::console::StandardConsole;
use sbtc::{ClientError, Result};

#[derive(Debug, Parser)]
#[command(name = "sbtc", about = "Thin client for the sbt build server", version, long_about = None)]
struct Cli {
    /// Launcher flags and commands to execute.
    ///
    /// Tokens starting with `-` are forwarded to an autostarted server;
    /// `--sbt-script=<path>` picks the launcher script and
    /// `-D<key>=<value>` additionally sets a property on this process.
    /// Everything else is a command to run, in order. With no commands
    /// the client opens an interactive prompt.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("sbtc: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_tracing()?;

    let base_directory = std::env::current_dir()
        .map_err(|err| ClientError::Config(format!("cannot resolve working directory: {err}")))?;
    let mut arguments = ClientArguments::parse(cli.tokens, base_directory);
    arguments.apply_property_overrides();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| ClientError::Config(format!("failed to build tokio runtime: {err}")))?;

    let session = ClientSession::new(arguments, Arc::new(StandardConsole));
    let result = runtime.block_on(session.run());

    // A readline may still be parked on a blocking thread after a
    // server-initiated stop; exit without waiting for it.
    runtime.shutdown_background();
    result
}

/// Diagnostics go to stderr so they never interleave with the console
/// stream on stdout. Default level `warn`, overridable via `RUST_LOG`.
fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ClientError::Config(format!("failed to init tracing: {err}")))
}
