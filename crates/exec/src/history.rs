//! Append-only record of every attempt outcome.
//!
//! Each retry attempt, blocked verdict, and declined confirmation lands
//! here as its own entry. Callers share one history across runners by
//! wrapping it in an `Arc`.

use crate::result::CommandResult;

/// In-memory attempt ledger. Entries are only ever appended.
pub struct CommandHistory {
    entries: std::sync::Mutex<Vec<CommandResult>>,
}

impl std::fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.lock().unwrap().len();
        f.debug_struct("CommandHistory")
            .field("entry_count", &count)
            .finish()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Append one attempt outcome.
    pub fn record(&self, result: &CommandResult) {
        self.entries.lock().unwrap().push(result.clone());
    }

    /// Snapshot of all recorded entries, oldest first.
    pub fn entries(&self) -> Vec<CommandResult> {
        self.entries.lock().unwrap().clone()
    }

    /// The most recent entry, if any.
    pub fn last(&self) -> Option<CommandResult> {
        self.entries.lock().unwrap().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
