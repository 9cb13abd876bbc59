//! `vigil chat` — Interactive security analysis session.

use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use vigil_agent::{ConversationLoop, DEFAULT_SYSTEM_PROMPT};
use vigil_config::AppConfig;
use vigil_core::message::{Message, Session};
use vigil_core::provider::Provider;
use vigil_exec::{CommandRunner, Executor};
use vigil_providers::OllamaProvider;
use vigil_security::{SafetyGate, StdinConfirmation};
use vigil_tools::{default_registry, ToolDispatcher};

pub async fn run(model_override: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let provider: Arc<dyn Provider> = Arc::new(OllamaProvider::new(&config.provider.base_url));

    let model = match model_override.or_else(|| config.default_model.clone()) {
        Some(model) => model,
        None => pick_first_model(provider.as_ref(), &config.provider.base_url).await?,
    };

    let gate = SafetyGate::with_extra_patterns(&config.safety.additional_patterns)?;
    let executor = Executor::new().with_max_stream_bytes(config.executor.max_output_bytes);
    let runner = Arc::new(
        CommandRunner::new()
            .with_gate(gate)
            .with_executor(executor)
            .with_confirmation(Arc::new(StdinConfirmation))
            .with_allow_destructive(config.safety.allow_destructive),
    );

    let registry = Arc::new(default_registry(runner, &config.tools));
    let tool_names = registry
        .names()
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let dispatcher =
        ToolDispatcher::new(registry).with_max_output_chars(config.tools.max_tool_output_chars);

    let agent = ConversationLoop::new(provider, dispatcher).with_temperature(config.temperature);

    let mut session = Session::with_system_prompt(DEFAULT_SYSTEM_PROMPT);
    session.set_model(&model);

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Vigil Agent — Interactive Mode        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Ollama:  {}", config.provider.base_url);
    println!("  Model:   {model}");
    println!("  Tools:   {tool_names}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    print!("  You > ");
    use std::io::Write;
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        session.push(Message::user(input));

        eprint!("  ...");

        match agent.process(&mut session).await {
            Ok(response) => {
                eprint!("\r     \r");
                println!();
                // Print with a visible assistant prefix
                for line in response.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

/// When no model is configured, fall back to the first installed one.
async fn pick_first_model(
    provider: &dyn Provider,
    base_url: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let models = provider
        .list_models()
        .await
        .map_err(|e| format!("Cannot reach Ollama at {base_url}: {e}"))?;

    models
        .into_iter()
        .next()
        .ok_or_else(|| "No models installed — run `ollama pull llama3.1` first".into())
}
