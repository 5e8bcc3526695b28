//! Command-line interface definition for Ragline
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat panel plus one-shot commands for
//! scripting: ask, health, conversation management, and ingestion.

use clap::{Parser, Subcommand};

/// Ragline - terminal client for a streaming RAG backend
///
/// Converse with a retrieval-augmented-generation backend: streamed
/// replies, server-owned conversation history, and repository ingestion.
#[derive(Parser, Debug, Clone)]
#[command(name = "ragline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the backend host from config
    #[arg(long)]
    pub host: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Ragline
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive chat panel
    Chat {
        /// Resume an existing conversation by id
        #[arg(short = 'r', long)]
        conversation: Option<String>,

        /// Title for the first conversation created in this session
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Ask a single question and print the reply
    Ask {
        /// The prompt to send
        prompt: String,

        /// Continue an existing conversation by id
        #[arg(short = 'r', long)]
        conversation: Option<String>,
    },

    /// Check backend liveness
    Health,

    /// Manage server-side conversations
    Conversations {
        /// Conversation management subcommand
        #[command(subcommand)]
        command: ConversationCommand,
    },

    /// Trigger repository ingestion on the backend
    Ingest {
        /// Ingestion subcommand
        #[command(subcommand)]
        command: IngestCommand,
    },
}

/// Conversation management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConversationCommand {
    /// List conversations
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one conversation with its messages
    Show {
        /// Conversation id
        id: String,
    },

    /// Rename a conversation
    Rename {
        /// Conversation id
        id: String,

        /// New title
        title: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id
        id: String,
    },
}

/// Ingestion subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum IngestCommand {
    /// Ingest a repository path local to the backend
    Local {
        /// Repository path on the backend host
        repo_path: String,
    },

    /// Clone and ingest a git repository
    Git {
        /// Repository URL
        repo_url: String,

        /// Backend-local directory to clone into
        local_dir: String,

        /// Branch to ingest
        #[arg(short, long, default_value = "main")]
        branch: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
