//! The safety gate — classifies command strings before anything runs.
//!
//! Classification is deliberately dumb: an ordered list of case-insensitive
//! regular expressions over the raw command text. Commands matching none of
//! them pass outright; matches are blocked, or deferred to the human
//! confirmation gate when a destructive override is in effect. Confirmation
//! is only ever tied to a pattern match — ordinary commands never prompt.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Command classes considered irreversible or system-damaging.
///
/// Ordered: the first matching pattern is the one reported.
pub const DANGEROUS_PATTERNS: [&str; 12] = [
    r"rm\s+-rf\s+/",
    r"mkfs",
    r"dd\s+if=",
    r"format\s+",
    r"fdisk.*w",
    r"parted.*mkpart",
    r"shutdown",
    r"reboot",
    r"init\s+[06]",
    r"systemctl\s+(halt|poweroff|reboot)",
    r"del\s+/[fF]\s+/[sS]\s+/[qQ]",
    r"diskpart",
];

/// Reason string recorded on results the gate refuses.
pub const BLOCKED_REASON: &str =
    "Command blocked: matches dangerous pattern. Use --allow-destructive to override.";

static BUILTIN: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DANGEROUS_PATTERNS
        .iter()
        .map(|p| compile(p).unwrap())
        .collect()
});

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// An operator-supplied pattern that failed to compile.
#[derive(Debug, Error)]
#[error("invalid safety pattern '{pattern}': {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Result of classifying one command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No dangerous pattern matched — run it.
    Allowed,
    /// A dangerous pattern matched and no override is in effect.
    Blocked { pattern: String },
    /// A dangerous pattern matched but the destructive override is set;
    /// a human must confirm before anything runs.
    NeedsConfirmation { pattern: String },
}

/// Classifies commands against the built-in destructive patterns plus any
/// operator-configured extras.
#[derive(Debug)]
pub struct SafetyGate {
    extra: Vec<Regex>,
}

impl SafetyGate {
    /// Gate with the built-in pattern set only.
    pub fn new() -> Self {
        Self { extra: Vec::new() }
    }

    /// Gate with additional operator-supplied patterns appended after the
    /// built-ins. Extras are compiled case-insensitively like the built-ins.
    pub fn with_extra_patterns(patterns: &[String]) -> Result<Self, PatternError> {
        let extra = patterns
            .iter()
            .map(|p| {
                compile(p).map_err(|source| PatternError {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { extra })
    }

    /// Classify a command. `allow_destructive` is the resolved override —
    /// global runner setting OR'd with the per-request flag by the caller.
    pub fn classify(&self, command: &str, allow_destructive: bool) -> Verdict {
        match self.matched_pattern(command) {
            None => Verdict::Allowed,
            Some(pattern) if allow_destructive => {
                tracing::warn!(
                    pattern,
                    "destructive pattern matched with override set, deferring to confirmation"
                );
                Verdict::NeedsConfirmation {
                    pattern: pattern.to_string(),
                }
            }
            Some(pattern) => {
                tracing::warn!(pattern, command, "command blocked");
                Verdict::Blocked {
                    pattern: pattern.to_string(),
                }
            }
        }
    }

    /// Does any dangerous pattern match this command?
    pub fn is_dangerous(&self, command: &str) -> bool {
        self.matched_pattern(command).is_some()
    }

    fn matched_pattern(&self, command: &str) -> Option<&str> {
        BUILTIN
            .iter()
            .chain(self.extra.iter())
            .find(|re| re.is_match(command))
            .map(|re| re.as_str())
    }
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new()
    }
}
