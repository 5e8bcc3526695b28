//! Ragline - terminal client for a streaming RAG backend
//!
#![doc = "Main entry point for the ragline CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ragline::cli::{Cli, Commands};
use ragline::commands;
use ragline::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat {
            conversation,
            title,
        } => {
            tracing::info!("Starting interactive chat panel");
            if let Some(id) = &conversation {
                tracing::debug!("Resuming conversation: {}", id);
            }
            commands::chat::run_chat(config, conversation, title).await?;
            Ok(())
        }
        Commands::Ask {
            prompt,
            conversation,
        } => {
            tracing::info!("Running one-shot ask");
            commands::oneshot::run_ask(config, prompt, conversation).await?;
            Ok(())
        }
        Commands::Health => {
            tracing::info!("Checking backend health");
            commands::oneshot::run_health(config).await?;
            Ok(())
        }
        Commands::Conversations { command } => {
            tracing::info!("Running conversation management command");
            commands::oneshot::run_conversations(config, command).await?;
            Ok(())
        }
        Commands::Ingest { command } => {
            tracing::info!("Triggering backend ingestion");
            commands::oneshot::run_ingest(config, command).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ragline=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
