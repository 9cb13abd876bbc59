//! System info tool — structured host facts.
//!
//! Reports OS, CPU, memory, and internet connectivity as a JSON object.
//! Memory figures come from `/proc/meminfo` and are only available on
//! Linux; elsewhere those fields are null rather than wrong.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use vigil_core::error::ToolError;
use vigil_core::tool::{Params, Tool, ToolName, ToolOutput};

/// Probe address for the connectivity check. A plain TCP connect to a
/// public DNS resolver, no payload sent.
const CONNECTIVITY_PROBE: &str = "8.8.8.8:53";
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(2);

pub struct GetSystemInfoTool;

#[async_trait]
impl Tool for GetSystemInfoTool {
    fn name(&self) -> ToolName {
        ToolName::GetSystemInfo
    }

    fn description(&self) -> &str {
        "Get OS/CPU/RAM information (params: {})"
    }

    async fn execute(&self, _params: &Params) -> Result<ToolOutput, ToolError> {
        let (ram_total_gb, ram_available_gb) = memory_gb();
        let info = json!({
            "os": std::env::consts::OS,
            "os_version": os_version(),
            "platform": format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            "processor": processor(),
            "cpu_count": cpu_count(),
            "ram_total_gb": ram_total_gb,
            "ram_available_gb": ram_available_gb,
            "is_connected_to_internet": check_internet().await,
        });
        debug!("collected system info");
        Ok(ToolOutput::Json(info))
    }
}

fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(target_os = "linux")]
fn os_version() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".into())
}

#[cfg(not(target_os = "linux"))]
fn os_version() -> String {
    "unknown".into()
}

#[cfg(target_os = "linux")]
fn processor() -> String {
    if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
        for line in cpuinfo.lines() {
            if let Some(rest) = line.strip_prefix("model name") {
                if let Some((_, model)) = rest.split_once(':') {
                    return model.trim().to_string();
                }
            }
        }
    }
    std::env::consts::ARCH.into()
}

#[cfg(not(target_os = "linux"))]
fn processor() -> String {
    std::env::consts::ARCH.into()
}

/// Total and available RAM in GB, rounded to two decimals.
#[cfg(target_os = "linux")]
fn memory_gb() -> (Value, Value) {
    let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") else {
        return (Value::Null, Value::Null);
    };
    let field = |key: &str| -> Value {
        meminfo
            .lines()
            .find(|l| l.starts_with(key))
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|kb| kb.parse::<f64>().ok())
            .map(|kb| json!((kb / (1024.0 * 1024.0) * 100.0).round() / 100.0))
            .unwrap_or(Value::Null)
    };
    (field("MemTotal:"), field("MemAvailable:"))
}

#[cfg(not(target_os = "linux"))]
fn memory_gb() -> (Value, Value) {
    (Value::Null, Value::Null)
}

async fn check_internet() -> bool {
    matches!(
        tokio::time::timeout(
            CONNECTIVITY_TIMEOUT,
            tokio::net::TcpStream::connect(CONNECTIVITY_PROBE),
        )
        .await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_expected_keys() {
        let output = GetSystemInfoTool.execute(&Params::new()).await.unwrap();
        let ToolOutput::Json(info) = output else {
            panic!("system info must be structured");
        };
        for key in [
            "os",
            "os_version",
            "platform",
            "processor",
            "cpu_count",
            "ram_total_gb",
            "ram_available_gb",
            "is_connected_to_internet",
        ] {
            assert!(info.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(info["os"], std::env::consts::OS);
        assert!(info["cpu_count"].as_u64().unwrap() >= 1);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn linux_reports_memory_figures() {
        let output = GetSystemInfoTool.execute(&Params::new()).await.unwrap();
        let ToolOutput::Json(info) = output else {
            panic!("system info must be structured");
        };
        assert!(info["ram_total_gb"].as_f64().unwrap() > 0.0);
    }
}
