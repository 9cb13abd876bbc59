//! `vigil run` — Execute one command through the safety pipeline.
//!
//! Streams output live, then prints the full result record as JSON.
//! Exits non-zero when the command did not succeed, so this composes
//! with shell conditionals and CI steps.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use vigil_config::AppConfig;
use vigil_exec::{CommandRequest, CommandRunner, Executor, OutputLine, StreamKind};
use vigil_security::{ConfirmationGate, PresetConfirmation, SafetyGate, StdinConfirmation};

pub struct RunOptions {
    pub command: String,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub backoff: Option<f64>,
    pub cwd: Option<PathBuf>,
    pub no_shell: bool,
    pub allow_destructive: bool,
    pub yes: bool,
}

pub async fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Captured lines already carry their trailing newline.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<OutputLine>();
    let printer = tokio::spawn(async move {
        while let Some(output) = rx.recv().await {
            match output.stream {
                StreamKind::Stdout => print!("{}", output.line),
                StreamKind::Stderr => eprint!("{}", output.line),
            }
        }
    });

    let gate = SafetyGate::with_extra_patterns(&config.safety.additional_patterns)?;
    let executor = Executor::new()
        .with_max_stream_bytes(config.executor.max_output_bytes)
        .with_output_sink(tx);

    let confirmer: Arc<dyn ConfirmationGate> = if options.yes {
        Arc::new(PresetConfirmation(true))
    } else {
        Arc::new(StdinConfirmation)
    };

    let runner = CommandRunner::new()
        .with_gate(gate)
        .with_executor(executor)
        .with_confirmation(confirmer)
        .with_allow_destructive(config.safety.allow_destructive);

    let mut request = CommandRequest::new(&options.command)
        .with_shell(!options.no_shell)
        .with_timeout(Duration::from_secs(
            options.timeout.unwrap_or(config.executor.timeout_secs),
        ))
        .with_retries(options.retries.unwrap_or(config.executor.retries))
        .with_backoff_factor(options.backoff.unwrap_or(config.executor.retry_backoff))
        .with_require_confirmation(config.safety.require_confirmation)
        .with_retry_spawn_errors(config.executor.retry_spawn_errors);

    if options.allow_destructive {
        request = request.with_allow_destructive(true);
    }
    if let Some(cwd) = options.cwd {
        request = request.with_cwd(cwd);
    }

    let result = runner.run_with_retry(&request).await;

    // The runner owns the executor's sender; dropping it lets the
    // printer drain the channel and finish.
    drop(runner);
    printer.await?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success() {
        std::process::exit(1);
    }

    Ok(())
}
