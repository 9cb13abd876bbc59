//! `vigil gateway` — Start the HTTP API server.

use tracing::info;
use vigil_config::AppConfig;

pub async fn run(
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(host) = host_override {
        config.gateway.host = host;
    }
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Vigil Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);

    info!(
        host = %config.gateway.host,
        port = config.gateway.port,
        ollama = %config.provider.base_url,
        "Starting gateway"
    );
    vigil_gateway::start(config).await?;

    Ok(())
}
