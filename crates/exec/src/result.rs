//! Per-attempt command results and raw-capture truncation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cap on each captured stream, in bytes.
pub const MAX_STREAM_BYTES: usize = 500_000;

/// Truncate captured stream text to `cap` bytes, appending a marker naming
/// the original size when anything was cut.
///
/// The cut position backs off to a UTF-8 character boundary so multi-byte
/// sequences are never split. Text at or under the cap is returned
/// unchanged.
pub fn truncate_stream(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let mut end = cap;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n... (truncated, {} bytes total)",
        &text[..end],
        text.len()
    )
}

/// The record of exactly one command outcome.
///
/// Exactly one of `{blocked, cancelled, normal-completion}` holds per
/// result. Blocked and cancelled results never ran anything: their streams
/// are empty, `exit_code` is absent, and `attempt_number` is 0. A normal
/// attempt carries `exit_code` unless it timed out or failed to spawn, in
/// which case `timeout` or `error` says why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Unique per attempt — retries of one request get distinct ids.
    pub id: String,

    /// Echoed command text.
    pub command: String,

    /// Echoed shell-mode flag.
    pub shell: bool,

    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub elapsed_seconds: f64,

    /// Absent on timeout, spawn failure, block, and cancel — serialized
    /// as `null`, never omitted.
    pub exit_code: Option<i32>,

    pub timeout: bool,
    pub blocked: bool,
    pub cancelled: bool,

    /// Captured output, capped at [`MAX_STREAM_BYTES`] per stream.
    pub stdout: String,
    pub stderr: String,

    /// 1-based attempt counter; 0 when nothing ran.
    pub attempt_number: u32,

    /// Blocked reason or spawn-failure text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    /// A result for a command the safety gate refused.
    pub fn blocked(command: &str, shell: bool, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            command: command.to_string(),
            shell,
            start_ts: now,
            end_ts: now,
            elapsed_seconds: 0.0,
            exit_code: None,
            timeout: false,
            blocked: true,
            cancelled: false,
            stdout: String::new(),
            stderr: String::new(),
            attempt_number: 0,
            error: Some(reason.into()),
        }
    }

    /// A result for a command the human gate declined.
    pub fn cancelled(command: &str, shell: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            command: command.to_string(),
            shell,
            start_ts: now,
            end_ts: now,
            elapsed_seconds: 0.0,
            exit_code: None,
            timeout: false,
            blocked: false,
            cancelled: true,
            stdout: String::new(),
            stderr: String::new(),
            attempt_number: 0,
            error: None,
        }
    }

    /// Did this attempt complete with exit code 0?
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
            && !self.timeout
            && !self.blocked
            && !self.cancelled
            && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_noop_under_cap() {
        let text = "short output";
        assert_eq!(truncate_stream(text, 100), text);
        assert_eq!(truncate_stream("", 100), "");
    }

    #[test]
    fn truncation_is_noop_at_exact_cap() {
        let text = "x".repeat(100);
        assert_eq!(truncate_stream(&text, 100), text);
    }

    #[test]
    fn truncation_keeps_cap_bytes_and_appends_marker() {
        let text = "a".repeat(150);
        let out = truncate_stream(&text, 100);
        assert!(out.starts_with(&"a".repeat(100)));
        assert!(out.ends_with("\n... (truncated, 150 bytes total)"));
        assert_eq!(out.len(), 100 + "\n... (truncated, 150 bytes total)".len());
    }

    #[test]
    fn truncation_never_splits_multibyte_chars() {
        // 'é' is two bytes; a cap landing mid-char must back off
        let text = "é".repeat(60); // 120 bytes
        let out = truncate_stream(&text, 99);
        assert!(out.contains("... (truncated, 120 bytes total)"));
        let kept = out.split('\n').next().unwrap();
        assert_eq!(kept.len(), 98);
        assert!(kept.chars().all(|c| c == 'é'));
    }

    #[test]
    fn blocked_result_shape() {
        let result = CommandResult::blocked("rm -rf /", true, "nope");
        assert!(result.blocked);
        assert!(!result.cancelled);
        assert!(!result.timeout);
        assert_eq!(result.exit_code, None);
        assert_eq!(result.attempt_number, 0);
        assert_eq!(result.error.as_deref(), Some("nope"));
        assert!(result.stdout.is_empty() && result.stderr.is_empty());
        assert!(!result.success());
    }

    #[test]
    fn cancelled_result_shape() {
        let result = CommandResult::cancelled("shutdown -h now", true);
        assert!(result.cancelled);
        assert!(!result.blocked);
        assert_eq!(result.exit_code, None);
        assert!(result.error.is_none());
        assert!(!result.success());
    }

    #[test]
    fn exit_code_serializes_as_null_when_absent() {
        let result = CommandResult::blocked("rm -rf /", true, "nope");
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("exit_code").unwrap().is_null());
        // error is present here, omitted on clean results
        assert_eq!(json.get("error").unwrap(), "nope");

        let cancelled = CommandResult::cancelled("x", true);
        let json = serde_json::to_value(&cancelled).unwrap();
        assert!(json.get("error").is_none());
    }
}
