//! The immutable description of one logical command to run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wall-clock deadline for one attempt.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default backoff multiplier between attempts.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Everything needed to run a command: the text, how to spawn it, and the
/// timeout/retry/safety policy that governs it.
///
/// Immutable once constructed — retries reuse the same request and differ
/// only in the per-attempt results they produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// The command text.
    pub command: String,

    /// Run via the platform shell (`sh -c` / `cmd /C`). When `false` the
    /// command is split on whitespace into an argv vector — no quoting.
    pub shell: bool,

    /// Working directory for the child, if different from ours.
    pub cwd: Option<PathBuf>,

    /// Environment overrides applied on top of the inherited environment.
    pub env: HashMap<String, String>,

    /// Wall-clock deadline for a single attempt.
    pub timeout: Duration,

    /// Extra attempts after the first (total attempts = `retries + 1`).
    pub retries: u32,

    /// Backoff between attempts: `backoff_factor ^ (attempt - 1)` seconds.
    pub backoff_factor: f64,

    /// Whether a destructive override still asks the human gate.
    pub require_confirmation: bool,

    /// Per-request destructive override (OR'd with the runner's global one).
    pub allow_destructive: bool,

    /// Whether a spawn-level failure is retried like a non-zero exit.
    pub retry_spawn_errors: bool,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            shell: true,
            cwd: None,
            env: HashMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: 0,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            require_confirmation: true,
            allow_destructive: false,
            retry_spawn_errors: true,
        }
    }

    pub fn with_shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_require_confirmation(mut self, require: bool) -> Self {
        self.require_confirmation = require;
        self
    }

    pub fn with_allow_destructive(mut self, allow: bool) -> Self {
        self.allow_destructive = allow;
        self
    }

    pub fn with_retry_spawn_errors(mut self, retry: bool) -> Self {
        self.retry_spawn_errors = retry;
        self
    }
}
