//! Vigil CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Create the default config file
//! - `chat`     — Interactive security analysis session
//! - `run`      — Execute one command through the safety pipeline
//! - `scan`     — Run a built-in scan (logs, health) without a model
//! - `gateway`  — Start the HTTP API server
//! - `status`   — Show configuration and Ollama connectivity

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "vigil",
    about = "Vigil — local-first security analysis agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default configuration file
    Init,

    /// Chat with the security analysis agent
    Chat {
        /// Model to use for this session (overrides config)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run a single command through the safety gate and executor
    Run {
        /// The command line to execute
        command: String,

        /// Timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Number of retries after a failed attempt
        #[arg(short, long)]
        retries: Option<u32>,

        /// Exponential backoff factor between retries
        #[arg(short, long)]
        backoff: Option<f64>,

        /// Working directory for the command
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Spawn the program directly instead of through the shell
        #[arg(long)]
        no_shell: bool,

        /// Allow destructive commands (still confirmation gated)
        #[arg(long)]
        allow_destructive: bool,

        /// Answer yes to confirmation prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Run a built-in scan without involving a model
    Scan {
        #[command(subcommand)]
        kind: ScanKind,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show configuration and Ollama connectivity
    Status,
}

#[derive(Subcommand)]
enum ScanKind {
    /// Collect and preview recent log files
    Logs,
    /// Snapshot startup programs, scheduled tasks, connections and processes
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Chat { model } => commands::chat::run(model).await?,
        Commands::Run {
            command,
            timeout,
            retries,
            backoff,
            cwd,
            no_shell,
            allow_destructive,
            yes,
        } => {
            commands::run_cmd::run(commands::run_cmd::RunOptions {
                command,
                timeout,
                retries,
                backoff,
                cwd,
                no_shell,
                allow_destructive,
                yes,
            })
            .await?
        }
        Commands::Scan { kind } => match kind {
            ScanKind::Logs => commands::scan::logs().await?,
            ScanKind::Health => commands::scan::health().await?,
        },
        Commands::Gateway { host, port } => commands::gateway::run(host, port).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
