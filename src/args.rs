//! Command-line argument model.
//!
//! The client forwards most of its surface to the server untouched, so
//! parsing is a partition rather than a grammar: tokens are split into
//! launcher arguments, execution commands, and client-only switches.

use std::path::PathBuf;

/// Prefix selecting an alternate launcher script. Consumed by the
/// client, never forwarded.
const SBT_SCRIPT_PREFIX: &str = "--sbt-script=";

/// Parsed invocation of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientArguments {
    /// Project root; defaults to the working directory.
    pub base_directory: PathBuf,
    /// Flags forwarded to the launcher when a server must be started.
    pub sbt_arguments: Vec<String>,
    /// Commands to execute in order; empty means interactive mode.
    pub command_arguments: Vec<String>,
    /// Launcher script name or path.
    pub launcher_script: String,
    /// `-Dkey=value` pairs applied to this process at startup.
    pub property_overrides: Vec<(String, String)>,
}

impl ClientArguments {
    /// Partitions raw tokens into the argument model.
    ///
    /// Tokens that do not open with a quote character are split on
    /// internal whitespace first, so a shell-quoted group such as
    /// `"clean compile"` arrives as two commands. `--sbt-script=` picks
    /// the launcher. `-Dkey=value` is recorded as a property override
    /// and still forwarded. Every other `-` token is forwarded verbatim;
    /// everything else is an execution command.
    #[must_use]
    pub fn parse<I, S>(tokens: I, base_directory: PathBuf) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = Self {
            base_directory,
            sbt_arguments: Vec::new(),
            command_arguments: Vec::new(),
            launcher_script: "sbt".to_owned(),
            property_overrides: Vec::new(),
        };
        for raw in tokens {
            for token in pre_split(raw.as_ref()) {
                args.accept(&token);
            }
        }
        args
    }

    fn accept(&mut self, token: &str) {
        if let Some(script) = token.strip_prefix(SBT_SCRIPT_PREFIX) {
            self.launcher_script = script.to_owned();
        } else if let Some(pair) = token.strip_prefix("-D") {
            if let Some((key, value)) = pair.split_once('=') {
                if !key.is_empty() {
                    self.property_overrides
                        .push((key.to_owned(), value.to_owned()));
                }
            }
            self.sbt_arguments.push(token.to_owned());
        } else if token.starts_with('-') {
            self.sbt_arguments.push(token.to_owned());
        } else {
            self.command_arguments.push(token.to_owned());
        }
    }

    /// Applies the recorded property overrides to this process's
    /// environment. A `user.dir` override additionally replaces the
    /// base directory; it is honored once here, before any handshake or
    /// launch activity reads the path.
    pub fn apply_property_overrides(&mut self) {
        for (key, value) in &self.property_overrides {
            std::env::set_var(key, value);
            if key == "user.dir" {
                self.base_directory = PathBuf::from(value);
            }
        }
    }

    /// True when no commands were given and the client should prompt.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.command_arguments.is_empty()
    }
}

/// Splits an unquoted token on whitespace; quoted tokens pass through
/// whole so embedded spaces survive into a single command.
fn pre_split(raw: &str) -> Vec<String> {
    if raw.starts_with('"') || raw.starts_with('\'') {
        vec![raw.to_owned()]
    } else {
        raw.split_whitespace().map(str::to_owned).collect()
    }
}
