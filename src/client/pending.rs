//! Pending request table.
//!
//! Every command sent to the server carries a fresh correlation id; its
//! completion arrives later as a response on the reader task. The table
//! maps ids to oneshot waiters so submitters sleep until resolution
//! instead of polling, and it owns the single terminal console event a
//! resolution produces.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::console::{Console, Level};

/// Terminal state of a command, derived from its response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The response carried a `result` member.
    Succeeded,
    /// The response carried an `error` member.
    Failed,
}

/// Cloneable handle to the table. All clones share one map; the lock is
/// internal and never held across an await point.
#[derive(Clone)]
pub struct PendingRequests {
    inner: Arc<Mutex<HashMap<String, oneshot::Sender<()>>>>,
    console: Arc<dyn Console>,
}

impl PendingRequests {
    /// Creates an empty table reporting terminal events to `console`.
    #[must_use]
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            console,
        }
    }

    /// Registers `id` and returns the receiver its resolution completes.
    /// Must be called before the command is sent, so the response cannot
    /// race past an unregistered id.
    pub fn register(&self, id: &str) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id.to_owned(), tx);
        rx
    }

    /// Resolves `id`, emitting exactly one terminal console event and
    /// waking the registered waiter. Unknown ids are a no-op: responses
    /// to already-resolved or never-registered commands (such as the
    /// init acknowledgement) are dropped here.
    pub fn resolve(&self, id: &str, outcome: CommandOutcome) {
        let Some(waiter) = self.lock().remove(id) else {
            return;
        };
        match outcome {
            CommandOutcome::Succeeded => self.console.success("completed"),
            CommandOutcome::Failed => self.console.append(Level::Error, "completed"),
        }
        // The waiter may have abandoned the receiver (session stopping);
        // the console event above already happened either way.
        let _ = waiter.send(());
    }

    /// True while `id` awaits its response.
    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<()>>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
