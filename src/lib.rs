//! Ragline - terminal client for a streaming RAG backend
//!
//! This library provides the pieces behind the `ragline` binary: the panel
//! host that turns user prompts into correlated, cancellable, incrementally
//! rendered assistant replies against a remote retrieval-augmented-generation
//! backend.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: Backend HTTP transport and wire types, including the chunked
//!   `/query` stream pump
//! - `session`: The streaming session controller state machine
//! - `markdown`: Incremental markdown-to-HTML rendering for replies
//! - `panel`: The panel host loop binding commands, session, and cache
//! - `protocol`: The typed command/event contract with display surfaces
//! - `health`: Periodic backend liveness monitoring
//! - `conversations`: The always-refetched conversation list cache
//! - `settings`: Panel settings persistence
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use ragline::api::{ApiClient, Transport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ApiClient::new("http://localhost:8000", std::time::Duration::from_secs(10))?;
//!     println!("backend is {}", client.health().await);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversations;
pub mod error;
pub mod health;
pub mod markdown;
pub mod panel;
pub mod protocol;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use api::{ApiClient, Transport};
pub use config::Config;
pub use error::{RaglineError, Result};
pub use markdown::MarkdownRenderer;
pub use panel::Panel;
pub use protocol::{PanelCommand, PanelEvent};
pub use session::{ChunkPolicy, SessionController, SessionPhase};

#[cfg(test)]
pub mod test_utils;
