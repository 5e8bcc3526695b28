//! One-shot command handlers
//!
//! Scripting-friendly wrappers around the same library components the
//! interactive panel uses: single question/answer, liveness check,
//! conversation management, and ingestion triggers.

use crate::api::{ApiClient, HealthState, Transport};
use crate::cli::{ConversationCommand, IngestCommand};
use crate::config::Config;
use crate::error::Result;
use crate::panel::Panel;
use crate::protocol::{PanelCommand, PanelEvent};
use crate::settings::{FileSettingsStore, SettingsStore};
use anyhow::bail;
use colored::Colorize;
use prettytable::{row, Table};
use std::io::Write;
use std::sync::Arc;

/// Ask a single question and stream the reply to stdout
///
/// # Arguments
///
/// * `config` - Global configuration
/// * `prompt` - The question to send
/// * `conversation` - Existing conversation to continue, if any
pub async fn run_ask(config: Config, prompt: String, conversation: Option<String>) -> Result<()> {
    let transport = Arc::new(ApiClient::new(
        &config.backend.host,
        config.backend.connect_timeout(),
    )?);
    let settings: Arc<dyn SettingsStore> = Arc::new(FileSettingsStore::default_location()?);

    let (panel, channels) = Panel::new(
        transport,
        settings,
        config.chat.chunk_policy,
        config.chat.refresh_debounce(),
    );
    tokio::spawn(panel.run());

    let commands = channels.commands;
    let mut events = channels.events;

    if let Some(id) = conversation {
        let _ = commands.send(PanelCommand::LoadConversation {
            conversation_id: id,
        });
    }
    let _ = commands.send(PanelCommand::SubmitPrompt {
        text: prompt,
        custom_title: None,
    });

    let mut printed = String::new();
    while let Some(event) = events.recv().await {
        match event {
            PanelEvent::UpdateStreamingResult {
                text, is_complete, ..
            } => {
                if let Some(delta) = text.strip_prefix(printed.as_str()) {
                    print!("{}", delta);
                } else {
                    print!("\n{}", text);
                }
                let _ = std::io::stdout().flush();
                printed = text;
                if is_complete {
                    println!();
                    return Ok(());
                }
            }
            PanelEvent::ShowError { text } => {
                bail!(text);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Check backend liveness and print the result
pub async fn run_health(config: Config) -> Result<()> {
    let client = ApiClient::new(&config.backend.host, config.backend.connect_timeout())?;
    match client.health().await {
        HealthState::Online => println!("{} {}", config.backend.host, "online".green()),
        _ => println!("{} {}", config.backend.host, "offline".red()),
    }
    Ok(())
}

/// Handle `conversations` subcommands
pub async fn run_conversations(config: Config, command: ConversationCommand) -> Result<()> {
    let client = ApiClient::new(&config.backend.host, config.backend.connect_timeout())?;

    match command {
        ConversationCommand::List { json } => {
            let conversations = client.list_conversations().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&conversations)?);
                return Ok(());
            }
            if conversations.is_empty() {
                println!("No conversations.");
                return Ok(());
            }

            let mut table = Table::new();
            table.add_row(row!["ID", "Title", "Updated"]);
            for conv in &conversations {
                let updated = conv
                    .updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(row![conv.id, conv.title, updated]);
            }
            table.printstd();
        }
        ConversationCommand::Show { id } => {
            let conversation = client.fetch_conversation(&id).await?;
            println!("{}\n", conversation.title.bold());
            for message in &conversation.messages {
                if message.role == "user" {
                    println!("{} {}", ">>".cyan(), message.content);
                } else {
                    println!("{}\n", message.content);
                }
            }
        }
        ConversationCommand::Rename { id, title } => {
            client.rename_conversation(&id, &title).await?;
            println!("{}", format!("Renamed {} to \"{}\"", id, title).green());
        }
        ConversationCommand::Delete { id } => {
            client.delete_conversation(&id).await?;
            println!("{}", format!("Deleted {}", id).green());
        }
    }
    Ok(())
}

/// Handle `ingest` subcommands
pub async fn run_ingest(config: Config, command: IngestCommand) -> Result<()> {
    let client = ApiClient::new(&config.backend.host, config.backend.connect_timeout())?;

    let receipt = match command {
        IngestCommand::Local { repo_path } => client.ingest_local(&repo_path).await?,
        IngestCommand::Git {
            repo_url,
            local_dir,
            branch,
        } => client.ingest_git(&repo_url, &local_dir, &branch).await?,
    };
    println!("{}", receipt);
    Ok(())
}
