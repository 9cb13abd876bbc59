//! `vigil status` — Show configuration and Ollama connectivity.

use vigil_config::AppConfig;
use vigil_core::provider::Provider;
use vigil_providers::OllamaProvider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("Vigil Status");
    println!("============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Ollama URL:   {}", config.provider.base_url);
    println!(
        "  Model:        {}",
        config.default_model.as_deref().unwrap_or("(not set)")
    );
    println!("  Temperature:  {}", config.temperature);
    println!("  Exec timeout: {}s", config.executor.timeout_secs);
    println!("  Retries:      {}", config.executor.retries);
    println!(
        "  Destructive:  {}",
        if config.safety.allow_destructive {
            "allowed (confirmation gated)"
        } else {
            "blocked"
        }
    );
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);

    let provider = OllamaProvider::new(&config.provider.base_url);
    match provider.health_check().await {
        Ok(true) => {
            println!("\n  ✅ Ollama reachable");
            match provider.list_models().await {
                Ok(models) if !models.is_empty() => {
                    println!("  Models:");
                    for model in models {
                        println!("    - {model}");
                    }
                }
                Ok(_) => {
                    println!("  ⚠️  No models installed — run `ollama pull llama3.1`");
                }
                Err(e) => {
                    println!("  ⚠️  Could not list models: {e}");
                }
            }
        }
        _ => {
            println!(
                "\n  ⚠️  Ollama not reachable at {} — is it running?",
                config.provider.base_url
            );
        }
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `vigil init` first");
    }

    Ok(())
}
