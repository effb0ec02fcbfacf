//! Maestro - Agent Orchestration Server
//!
//! Main entry point for the Maestro CLI.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use maestro_llm::{GeminiBackend, ModelBackend};
use maestro_server::{AppState, ServerConfig, serve_stdio};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Maestro - Agent Orchestration Server
#[derive(Parser)]
#[command(name = "maestro")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for rotating log files
    #[arg(long, global = true, env = "MAESTRO_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the tool catalogue over stdio
    Serve(ServeArgs),

    /// Print the tool catalogue as JSON and exit
    Tools,
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Model assigned to agents created without one
    #[arg(long, env = "MAESTRO_DEFAULT_MODEL")]
    pub default_model: Option<String>,

    /// Seconds allowed for a tool server's initialize handshake
    #[arg(long, default_value_t = 10)]
    pub handshake_timeout: u64,

    /// Seconds allowed for one proxied tool call
    #[arg(long, default_value_t = 30)]
    pub invoke_timeout: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol, so console logging goes to stderr and
    // the detailed record goes to a rotating JSON file.
    let filter = if cli.verbose {
        "maestro=debug,maestro_agent=debug,maestro_llm=debug,maestro_proxy=debug,maestro_server=debug,info"
    } else {
        "maestro=info,maestro_agent=info,maestro_llm=info,maestro_proxy=info,maestro_server=info,warn"
    };

    let log_dir = cli.log_dir.clone().unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "maestro.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "maestro=debug,maestro_agent=debug,maestro_llm=debug,maestro_proxy=debug,maestro_server=debug,info",
                )),
        )
        .init();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Tools => {
            let catalogue = maestro_server::catalogue();
            println!("{}", serde_json::to_string_pretty(&catalogue)?);
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let backend = Arc::new(
        GeminiBackend::from_env()
            .context("set GEMINI_API_KEY or GOOGLE_API_KEY to serve")?,
    ) as Arc<dyn ModelBackend>;

    let mut config = ServerConfig::default()
        .with_proxy_handshake_timeout(Duration::from_secs(args.handshake_timeout))
        .with_proxy_invoke_timeout(Duration::from_secs(args.invoke_timeout));
    if let Some(model) = args.default_model {
        config = config.with_default_model(model);
    }

    tracing::info!(
        backend = backend.name(),
        default_model = %config.default_model,
        "starting maestro"
    );

    let state = Arc::new(AppState::new(backend, config));
    serve_stdio(state).await.context("stdio serve loop failed")?;
    tracing::info!("maestro stopped");
    Ok(())
}
