//! Safety-gated command execution with retry and backoff.
//!
//! `CommandRunner` is the only path from a command string to a spawned
//! process: classify, confirm if overridden, then run attempts until one
//! succeeds or the budget is spent. Every attempt is recorded in the
//! shared [`CommandHistory`], including blocked and cancelled outcomes.

use std::sync::Arc;
use std::time::Duration;

use vigil_security::{ConfirmationGate, PresetConfirmation, SafetyGate, Verdict, BLOCKED_REASON};

use crate::executor::Executor;
use crate::history::CommandHistory;
use crate::request::CommandRequest;
use crate::result::CommandResult;

pub struct CommandRunner {
    gate: SafetyGate,
    confirmer: Arc<dyn ConfirmationGate>,
    executor: Executor,
    history: Arc<CommandHistory>,
    allow_destructive: bool,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("allow_destructive", &self.allow_destructive)
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner {
    /// A runner with the built-in patterns, a deny-all confirmation gate,
    /// and a fresh history. Headless by default: nothing destructive runs
    /// until a real confirmation gate is attached.
    pub fn new() -> Self {
        Self {
            gate: SafetyGate::new(),
            confirmer: Arc::new(PresetConfirmation(false)),
            executor: Executor::new(),
            history: Arc::new(CommandHistory::new()),
            allow_destructive: false,
        }
    }

    pub fn with_gate(mut self, gate: SafetyGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_confirmation(mut self, confirmer: Arc<dyn ConfirmationGate>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn with_history(mut self, history: Arc<CommandHistory>) -> Self {
        self.history = history;
        self
    }

    /// Process-wide destructive override. A per-request
    /// [`CommandRequest::allow_destructive`] has the same effect for one
    /// command.
    pub fn with_allow_destructive(mut self, allow: bool) -> Self {
        self.allow_destructive = allow;
        self
    }

    pub fn history(&self) -> Arc<CommandHistory> {
        self.history.clone()
    }

    /// Classify, confirm, then run up to `retries + 1` attempts.
    ///
    /// Blocked and cancelled commands return without spawning anything and
    /// are never retried. Sleeps `backoff_factor^(attempt - 1)` seconds
    /// after each failed attempt that still has budget left.
    pub async fn run_with_retry(&self, request: &CommandRequest) -> CommandResult {
        let allow = self.allow_destructive || request.allow_destructive;
        match self.gate.classify(&request.command, allow) {
            Verdict::Allowed => {}
            Verdict::Blocked { pattern } => {
                tracing::warn!(command = %request.command, pattern = %pattern, "command blocked");
                let result = CommandResult::blocked(&request.command, request.shell, BLOCKED_REASON);
                self.history.record(&result);
                return result;
            }
            Verdict::NeedsConfirmation { pattern } => {
                let confirmed = if request.require_confirmation {
                    self.confirmer.confirm(&request.command).await
                } else {
                    tracing::warn!(
                        command = %request.command,
                        pattern = %pattern,
                        "destructive command auto-confirmed (confirmation disabled)"
                    );
                    true
                };
                if !confirmed {
                    tracing::info!(command = %request.command, "confirmation declined");
                    let result = CommandResult::cancelled(&request.command, request.shell);
                    self.history.record(&result);
                    return result;
                }
            }
        }

        let attempts = request.retries + 1;
        let mut attempt = 1;
        loop {
            let result = self.executor.execute(request, attempt).await;
            self.history.record(&result);

            if result.success() {
                return result;
            }
            if result.error.is_some() && !request.retry_spawn_errors {
                return result;
            }
            if attempt >= attempts {
                if attempts > 1 {
                    tracing::warn!(
                        command = %request.command,
                        attempts,
                        "all attempts exhausted"
                    );
                }
                return result;
            }

            let delay = request.backoff_factor.powi(attempt as i32 - 1).max(0.0);
            tracing::info!(
                command = %request.command,
                attempt,
                delay_secs = delay,
                "attempt failed, backing off"
            );
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            attempt += 1;
        }
    }
}
