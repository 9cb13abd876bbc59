//! Built-in tool implementations for Vigil.
//!
//! Tools give the agent the ability to inspect the host: collect system
//! facts, run gated terminal commands, tail recent logs, and snapshot
//! persistence and network activity for analysis.

pub mod dispatch;
pub mod health_check;
pub mod log_scan;
pub mod system_info;
pub mod terminal;

use std::sync::Arc;

use vigil_config::ToolsConfig;
use vigil_core::tool::ToolRegistry;
use vigil_exec::runner::CommandRunner;

pub use dispatch::{MAX_OUTPUT_CHARS, ToolDispatcher, extract_tool_call};
pub use health_check::SystemHealthCheckTool;
pub use log_scan::ScanCommonLogsTool;
pub use system_info::GetSystemInfoTool;
pub use terminal::TerminalCommandTool;

/// Create the default registry with all four built-in tools.
///
/// Terminal commands and health-check probes share one [`CommandRunner`],
/// so the safety gate and command history cover both.
pub fn default_registry(runner: Arc<CommandRunner>, config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetSystemInfoTool));
    registry.register(Box::new(
        TerminalCommandTool::new(runner.clone()).with_timeout(config.tool_timeout()),
    ));
    registry.register(Box::new(ScanCommonLogsTool::from_config(config)));
    registry.register(Box::new(
        SystemHealthCheckTool::new(runner)
            .with_timeout(config.tool_timeout())
            .with_output_limit(config.max_tool_output_chars),
    ));
    registry
}
