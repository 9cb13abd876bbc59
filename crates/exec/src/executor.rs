//! Single-attempt process execution with concurrent stream capture.
//!
//! Both stdout and stderr are drained by dedicated reader tasks for the
//! whole lifetime of the child. This is mandatory, not an optimization:
//! waiting on the child while draining only one pipe deadlocks as soon as
//! the child fills the other pipe's OS buffer. Lines are surfaced as they
//! arrive (optional sink) and buffered for the final result.

use std::process::Stdio;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout_at, Instant as TokioInstant};
use uuid::Uuid;

use crate::request::CommandRequest;
use crate::result::{truncate_stream, CommandResult, MAX_STREAM_BYTES};

/// How long readers get to flush buffered output after a deadline kill.
const READER_GRACE: Duration = Duration::from_secs(1);

/// Which stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One captured line, surfaced as soon as the child writes it.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub stream: StreamKind,
    /// Line text including its trailing newline, when the child wrote one.
    pub line: String,
}

/// Runs exactly one attempt of a request. No safety checks, no retries —
/// that is [`crate::runner::CommandRunner`]'s job.
pub struct Executor {
    max_stream_bytes: usize,
    output_sink: Option<mpsc::UnboundedSender<OutputLine>>,
}

impl Executor {
    pub fn new() -> Self {
        Self {
            max_stream_bytes: MAX_STREAM_BYTES,
            output_sink: None,
        }
    }

    pub fn with_max_stream_bytes(mut self, cap: usize) -> Self {
        self.max_stream_bytes = cap;
        self
    }

    /// Forward every captured line to `sink` as it arrives.
    pub fn with_output_sink(mut self, sink: mpsc::UnboundedSender<OutputLine>) -> Self {
        self.output_sink = Some(sink);
        self
    }

    /// Run one attempt to completion, kill, or spawn failure.
    ///
    /// Infallible: every failure mode is encoded in the returned
    /// [`CommandResult`].
    pub async fn execute(&self, request: &CommandRequest, attempt_number: u32) -> CommandResult {
        let start_ts = Utc::now();
        let clock = Instant::now();

        tracing::debug!(
            command = %request.command,
            attempt_number,
            timeout_secs = request.timeout.as_secs(),
            "spawning command"
        );

        let mut child = match build_command(request).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(command = %request.command, error = %e, "spawn failed");
                return CommandResult {
                    id: Uuid::new_v4().to_string(),
                    command: request.command.clone(),
                    shell: request.shell,
                    start_ts,
                    end_ts: Utc::now(),
                    elapsed_seconds: clock.elapsed().as_secs_f64(),
                    exit_code: None,
                    timeout: false,
                    blocked: false,
                    cancelled: false,
                    stdout: String::new(),
                    stderr: String::new(),
                    attempt_number,
                    error: Some(e.to_string()),
                };
            }
        };

        let (line_tx, mut line_rx) = mpsc::channel::<OutputLine>(64);
        spawn_reader(child.stdout.take(), StreamKind::Stdout, line_tx.clone());
        spawn_reader(child.stderr.take(), StreamKind::Stderr, line_tx);

        let mut stdout = String::new();
        let mut stderr = String::new();
        let deadline = TokioInstant::now() + request.timeout;
        let mut timed_out = false;
        let mut exit_code: Option<i32> = None;
        let mut error: Option<String> = None;

        loop {
            tokio::select! {
                maybe = line_rx.recv() => {
                    match maybe {
                        Some(line) => self.collect(&mut stdout, &mut stderr, line),
                        // both pipes hit EOF
                        None => break,
                    }
                }
                () = sleep_until(deadline) => {
                    timed_out = true;
                    let _ = child.start_kill();
                    break;
                }
            }
        }

        if timed_out {
            // bounded grace: take whatever the readers still flush, then
            // stop listening — remaining unread data is deliberately dropped
            let grace = TokioInstant::now() + READER_GRACE;
            loop {
                tokio::select! {
                    maybe = line_rx.recv() => {
                        match maybe {
                            Some(line) => self.collect(&mut stdout, &mut stderr, line),
                            None => break,
                        }
                    }
                    () = sleep_until(grace) => break,
                }
            }
            let _ = child.wait().await;
            tracing::warn!(
                command = %request.command,
                attempt_number,
                timeout_secs = request.timeout.as_secs(),
                "command killed at deadline"
            );
        } else {
            // pipes are closed; the rest of the deadline bounds the reap in
            // case the child closed its stdio but lingers
            match timeout_at(deadline, child.wait()).await {
                Ok(Ok(status)) => exit_code = status.code(),
                Ok(Err(e)) => error = Some(e.to_string()),
                Err(_) => {
                    timed_out = true;
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
        }

        let result = CommandResult {
            id: Uuid::new_v4().to_string(),
            command: request.command.clone(),
            shell: request.shell,
            start_ts,
            end_ts: Utc::now(),
            elapsed_seconds: clock.elapsed().as_secs_f64(),
            exit_code,
            timeout: timed_out,
            blocked: false,
            cancelled: false,
            stdout: truncate_stream(&stdout, self.max_stream_bytes),
            stderr: truncate_stream(&stderr, self.max_stream_bytes),
            attempt_number,
            error,
        };
        tracing::debug!(
            command = %request.command,
            attempt_number,
            exit_code = ?result.exit_code,
            timeout = result.timeout,
            elapsed_seconds = result.elapsed_seconds,
            "attempt finished"
        );
        result
    }

    fn collect(&self, stdout: &mut String, stderr: &mut String, line: OutputLine) {
        if let Some(sink) = &self.output_sink {
            let _ = sink.send(line.clone());
        }
        match line.stream {
            StreamKind::Stdout => stdout.push_str(&line.line),
            StreamKind::Stderr => stderr.push_str(&line.line),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

fn build_command(request: &CommandRequest) -> Command {
    let mut command = if request.shell {
        #[cfg(windows)]
        {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&request.command);
            c
        }
        #[cfg(not(windows))]
        {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&request.command);
            c
        }
    } else {
        let mut parts = request.command.split_whitespace();
        let program = parts.next().unwrap_or_default();
        let mut c = Command::new(program);
        c.args(parts);
        c
    };

    if let Some(cwd) = &request.cwd {
        command.current_dir(cwd);
    }
    for (key, value) in &request.env {
        command.env(key, value);
    }
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

fn spawn_reader<R>(pipe: Option<R>, stream: StreamKind, tx: mpsc::Sender<OutputLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(pipe) = pipe else { return };
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = String::new();
        while reader.read_line(&mut buf).await.unwrap_or(0) > 0 {
            // keep draining even if nobody listens — a full pipe would
            // block the child
            let _ = tx
                .send(OutputLine {
                    stream,
                    line: buf.clone(),
                })
                .await;
            buf.clear();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(command: &str) -> CommandRequest {
        CommandRequest::new(command).with_timeout(Duration::from_secs(10))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echo_captures_stdout_and_exit_zero() {
        let result = Executor::new().execute(&req("echo ok"), 1).await;
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.contains("ok"));
        assert!(result.stderr.is_empty());
        assert!(!result.timeout);
        assert!(!result.blocked && !result.cancelled);
        assert_eq!(result.attempt_number, 1);
        assert!(result.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_is_captured_separately() {
        let result = Executor::new()
            .execute(&req("echo out; echo err 1>&2"), 1)
            .await;
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.contains("out"));
        assert!(!result.stdout.contains("err"));
        assert!(result.stderr.contains("err"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_code_recorded() {
        let result = Executor::new().execute(&req("exit 3"), 1).await;
        assert_eq!(result.exit_code, Some(3));
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn deadline_kills_and_marks_timeout() {
        let request = CommandRequest::new("sleep 5").with_timeout(Duration::from_secs(1));
        let result = Executor::new().execute(&request, 1).await;
        assert!(result.timeout);
        assert_eq!(result.exit_code, None);
        assert!(result.elapsed_seconds < 5.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn partial_output_survives_timeout() {
        let request =
            CommandRequest::new("echo started; sleep 5").with_timeout(Duration::from_secs(1));
        let result = Executor::new().execute(&request, 1).await;
        assert!(result.timeout);
        assert!(result.stdout.contains("started"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_failure_carries_error_text() {
        let request = req("definitely-not-a-real-binary-xyz").with_shell(false);
        let result = Executor::new().execute(&request, 1).await;
        assert_eq!(result.exit_code, None);
        assert!(!result.timeout);
        assert!(result.error.is_some());
        assert!(result.stdout.is_empty() && result.stderr.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn argv_mode_runs_without_shell() {
        let request = req("echo plain").with_shell(false);
        let result = Executor::new().execute(&request, 1).await;
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.contains("plain"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_sink_streams_lines_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let executor = Executor::new().with_output_sink(tx);
        let result = executor.execute(&req("echo one; echo two"), 1).await;
        assert_eq!(result.exit_code, Some(0));

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        let stdout_lines: Vec<&str> = lines
            .iter()
            .filter(|l| l.stream == StreamKind::Stdout)
            .map(|l| l.line.trim_end())
            .collect();
        assert_eq!(stdout_lines, vec!["one", "two"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stream_cap_applies_per_stream() {
        let executor = Executor::new().with_max_stream_bytes(10);
        let result = executor
            .execute(&req("echo aaaaaaaaaaaaaaaaaaaa"), 1)
            .await;
        assert!(result.stdout.contains("... (truncated, 21 bytes total)"));
        assert!(result.stdout.starts_with("aaaaaaaaaa"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cwd_and_env_are_applied() {
        let request = req("echo $VIGIL_TEST_MARKER; pwd")
            .with_cwd("/tmp")
            .with_env("VIGIL_TEST_MARKER", "marker-42");
        let result = Executor::new().execute(&request, 1).await;
        assert!(result.stdout.contains("marker-42"));
        assert!(result.stdout.contains("/tmp"));
    }
}
