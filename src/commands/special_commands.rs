//! Special commands parser for the interactive chat panel
//!
//! Parses slash-prefixed inputs entered at the chat prompt. Special
//! commands drive the panel (conversation switching, renaming, health)
//! instead of being submitted to the backend as prompts. Commands are
//! case-insensitive.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument {
        /// The command that was missing an argument
        command: String,
        /// Usage hint shown to the user
        usage: String,
    },
}

/// Special commands that can be executed during an interactive session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// List conversations
    List,

    /// Load a conversation by id and make it current
    Open(String),

    /// Start a fresh conversation, optionally staging a title for it
    New(Option<String>),

    /// Rename the current conversation
    Rename(String),

    /// Delete the current conversation
    Delete,

    /// Probe backend liveness now
    Health,

    /// Show persisted panel settings
    Settings,

    /// Save a new backend host and re-point the live transport
    Host(String),

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; submit the input as a prompt
    None,
}

/// Parse a user input string into a special command
///
/// Inputs not starting with `/` are [`SpecialCommand::None`].
///
/// # Errors
///
/// Returns [`CommandError::UnknownCommand`] for an unrecognized slash
/// command, and [`CommandError::MissingArgument`] when a required argument
/// is absent.
///
/// # Examples
///
/// ```
/// use ragline::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/open c42").unwrap();
/// assert_eq!(cmd, SpecialCommand::Open("c42".to_string()));
///
/// let cmd = parse_special_command("how does ingestion work?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match command.as_str() {
        "/list" | "/ls" => Ok(SpecialCommand::List),
        "/open" => match arg {
            Some(id) => Ok(SpecialCommand::Open(id.to_string())),
            None => Err(CommandError::MissingArgument {
                command: "/open".to_string(),
                usage: "/open <conversation-id>".to_string(),
            }),
        },
        "/new" => Ok(SpecialCommand::New(arg.map(String::from))),
        "/rename" => match arg {
            Some(title) => Ok(SpecialCommand::Rename(title.to_string())),
            None => Err(CommandError::MissingArgument {
                command: "/rename".to_string(),
                usage: "/rename <new title>".to_string(),
            }),
        },
        "/delete" => Ok(SpecialCommand::Delete),
        "/health" | "/status" => Ok(SpecialCommand::Health),
        "/settings" => Ok(SpecialCommand::Settings),
        "/host" => match arg {
            Some(host) => Ok(SpecialCommand::Host(host.to_string())),
            None => Err(CommandError::MissingArgument {
                command: "/host".to_string(),
                usage: "/host <base-url>".to_string(),
            }),
        },
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "/q" => Ok(SpecialCommand::Exit),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Print help for the interactive session
pub fn print_help() {
    println!("Available commands:");
    println!("  /list                 List conversations");
    println!("  /open <id>            Load a conversation");
    println!("  /new [title]          Start a fresh conversation");
    println!("  /rename <title>       Rename the current conversation");
    println!("  /delete               Delete the current conversation");
    println!("  /health               Check backend liveness");
    println!("  /settings             Show saved panel settings");
    println!("  /host <base-url>      Save and switch the backend host");
    println!("  /help                 Show this help");
    println!("  /exit                 Leave the session");
    println!();
    println!("Anything else is sent to the assistant. Ctrl-C stops a streaming reply.");
}
