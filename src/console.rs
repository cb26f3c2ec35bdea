//! Console event sink.
//!
//! Every user-visible line the session produces flows through the
//! [`Console`] trait: log events relayed from the server, rendered
//! diagnostics, command echoes, and completion notices. The production
//! sink prints to stdout; tests substitute a recording sink.

use std::fmt::{Display, Formatter};

/// Severity of a console event, mirroring the server's log-message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Build or protocol failure.
    Error,
    /// Suspicious but non-fatal condition.
    Warning,
    /// Routine progress output.
    Info,
    /// Verbose tracing output, suppressed from the console.
    Debug,
}

impl Level {
    /// Maps a wire severity code to a level. The server uses `1..=4`;
    /// anything outside the table yields `None`.
    #[must_use]
    pub fn from_wire(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Info),
            4 => Some(Self::Debug),
            _ => None,
        }
    }

    /// Lowercase label used when rendering events.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Sink for ordered console events. Implementations must tolerate calls
/// from the transport reader task and the execution loop concurrently.
pub trait Console: Send + Sync {
    /// Emits one event at the given severity.
    fn append(&self, level: Level, text: &str);

    /// Emits a success notice (command completed without error).
    fn success(&self, text: &str);
}

/// Production console writing to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardConsole;

impl Console for StandardConsole {
    fn append(&self, level: Level, text: &str) {
        println!("[{level}] {text}");
    }

    fn success(&self, text: &str) {
        println!("[success] {text}");
    }
}
