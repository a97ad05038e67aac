//! TextProof - minimally-invasive proofreading service
//!
//! TextProof delegates small, context-preserving units of long-form Chinese
//! narrative text to an LLM provider (OpenAI, DeepSeek or a local Ollama
//! endpoint) and reassembles the corrected document. This binary parses the
//! command line, initializes logging and runs the HTTP server.

use clap::Parser;
use std::path::PathBuf;
use textproof_serve::{AppState, ProofServer, ServerConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "textproof")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "TextProof - minimally-invasive LLM proofreading for Chinese narrative text")]
struct Cli {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Bind port
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Directory for the database and cached artifacts
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,

    /// Dotfile the settings are loaded from and persisted to
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Disable permissive CORS
    #[arg(long)]
    no_cors: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format (pretty, compact, json)
    #[arg(long, default_value = "compact")]
    log_format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    textproof_core::init_logging_with_config(log_level, &cli.log_format)?;

    info!("Starting TextProof v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        cache_dir: cli.cache_dir,
        env_file: cli.env_file,
        cors_enabled: !cli.no_cors,
        ..ServerConfig::default()
    };

    let state = AppState::new(&config).await?;
    ProofServer::new(config, state).start().await?;

    Ok(())
}
