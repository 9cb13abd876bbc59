//! `vigil scan` — Run a built-in scan without involving a model.
//!
//! `scan logs` and `scan health` exercise the same tools the agent calls,
//! printing the raw report so they can be used standalone or piped.

use std::sync::Arc;

use vigil_config::AppConfig;
use vigil_core::tool::{Params, Tool, ToolOutput};
use vigil_exec::{CommandRunner, Executor};
use vigil_security::SafetyGate;
use vigil_tools::{ScanCommonLogsTool, SystemHealthCheckTool};

pub async fn logs() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let tool = ScanCommonLogsTool::from_config(&config.tools);
    let output = tool.execute(&Params::new()).await?;
    print_output(output);

    Ok(())
}

pub async fn health() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let runner = build_runner(&config)?;
    let tool = SystemHealthCheckTool::new(runner)
        .with_timeout(config.tools.tool_timeout())
        .with_output_limit(config.tools.max_tool_output_chars);
    let output = tool.execute(&Params::new()).await?;
    print_output(output);

    Ok(())
}

/// All health probes are read-only and pass the safety gate, so the
/// default (declining) confirmation gate never fires.
fn build_runner(config: &AppConfig) -> Result<Arc<CommandRunner>, Box<dyn std::error::Error>> {
    let gate = SafetyGate::with_extra_patterns(&config.safety.additional_patterns)?;
    let executor = Executor::new().with_max_stream_bytes(config.executor.max_output_bytes);
    let runner = CommandRunner::new()
        .with_gate(gate)
        .with_executor(executor)
        .with_allow_destructive(config.safety.allow_destructive);
    Ok(Arc::new(runner))
}

fn print_output(output: ToolOutput) {
    match output {
        ToolOutput::Text(text) => println!("{text}"),
        ToolOutput::Json(value) => println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
        ),
    }
}
