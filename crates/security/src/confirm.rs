//! The human confirmation gate.
//!
//! When the safety gate defers a destructive command, exactly one blocking
//! question is asked and exactly one literal token proceeds. There is no
//! timeout on the read: a destructive command waits for its human as long
//! as it takes, and anything other than the token — including EOF and I/O
//! failure — is a decline.

use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

/// The exact token a human must type to proceed. Case-sensitive.
pub const CONFIRM_TOKEN: &str = "YES";

/// The prompt printed after the warning banner.
pub const CONFIRM_PROMPT: &str = "Type YES to proceed: ";

/// The warning banner shown before the prompt.
pub fn confirmation_warning(command: &str) -> String {
    format!("⚠️  WARNING: This command may be destructive:\n  {command}\n")
}

/// A checkpoint that asks a human whether a destructive command may run.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// `true` means proceed; anything else declines.
    async fn confirm(&self, command: &str) -> bool;
}

/// Interactive stdin/stdout gate used by the CLI.
pub struct StdinConfirmation;

#[async_trait]
impl ConfirmationGate for StdinConfirmation {
    async fn confirm(&self, command: &str) -> bool {
        let banner = format!("\n{}\n{}", confirmation_warning(command), CONFIRM_PROMPT);
        let mut stdout = io::stdout();
        if stdout.write_all(banner.as_bytes()).await.is_err() {
            return false;
        }
        if stdout.flush().await.is_err() {
            return false;
        }

        let mut answer = String::new();
        let mut reader = BufReader::new(io::stdin());
        match reader.read_line(&mut answer).await {
            Ok(0) => false, // EOF declines
            Ok(_) => answer.trim() == CONFIRM_TOKEN,
            Err(_) => false,
        }
    }
}

/// Non-interactive gate with a fixed answer — `--yes` runs, headless
/// deployments, tests.
pub struct PresetConfirmation(pub bool);

#[async_trait]
impl ConfirmationGate for PresetConfirmation {
    async fn confirm(&self, command: &str) -> bool {
        tracing::debug!(command, answer = self.0, "preset confirmation consulted");
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preset_gate_returns_its_answer() {
        assert!(PresetConfirmation(true).confirm("rm -rf /tmp/x").await);
        assert!(!PresetConfirmation(false).confirm("rm -rf /tmp/x").await);
    }

    #[test]
    fn warning_names_the_command() {
        let banner = confirmation_warning("shutdown -h now");
        assert!(banner.contains("WARNING"));
        assert!(banner.contains("  shutdown -h now"));
    }

    #[test]
    fn token_is_exact() {
        // the stdin gate compares the trimmed line to this token only
        assert_eq!(CONFIRM_TOKEN, "YES");
        assert_ne!("yes".trim(), CONFIRM_TOKEN);
        assert_eq!("YES\n".trim(), CONFIRM_TOKEN);
    }
}
