//! Interactive chat panel handler
//!
//! Runs a readline loop that drives the panel protocol: plain input is
//! submitted as a prompt, slash commands map to panel commands, and panel
//! events are rendered to the terminal. While a reply streams in, Ctrl-C
//! cancels it.

use crate::api::{ApiClient, HealthState};
use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
use crate::config::Config;
use crate::error::Result;
use crate::health::HealthMonitor;
use crate::panel::Panel;
use crate::protocol::{PanelCommand, PanelEvent, ProbeOutcome};
use crate::settings::{FileSettingsStore, SettingsStore};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long interactive waits for a panel response before giving up
const SYNC_WAIT: Duration = Duration::from_secs(30);

/// Start the interactive chat panel
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `resume` - Conversation id to load before the first prompt
/// * `title` - Title staged for the first conversation created here
pub async fn run_chat(config: Config, resume: Option<String>, title: Option<String>) -> Result<()> {
    tracing::info!("Starting interactive chat panel");

    let transport = Arc::new(ApiClient::new(
        &config.backend.host,
        config.backend.connect_timeout(),
    )?);
    let settings: Arc<dyn SettingsStore> = Arc::new(FileSettingsStore::default_location()?);

    let (panel, channels) = Panel::new(
        Arc::clone(&transport),
        Arc::clone(&settings),
        config.chat.chunk_policy,
        config.chat.refresh_debounce(),
    );

    let monitor = HealthMonitor::new(
        Arc::clone(&transport),
        config.health.poll_interval(),
        panel.streaming_handle(),
        panel.event_sender(),
        channels.commands.clone(),
    );
    let monitor_cancel = monitor.spawn();
    tokio::spawn(panel.run());

    let commands = channels.commands;
    let mut events = channels.events;
    let mut surface = ChatSurface::new();

    println!(
        "{} {}",
        "Ragline".bold(),
        format!("— connected to {}", config.backend.host).dimmed()
    );
    println!("{}", "Type /help for commands.".dimmed());

    let _ = commands.send(PanelCommand::LoadConversations);
    if let Some(id) = resume {
        let _ = commands.send(PanelCommand::LoadConversation {
            conversation_id: id,
        });
    }
    if title.is_some() {
        let _ = commands.send(PanelCommand::NewConversation {
            custom_title: title,
        });
    }

    let mut rl = DefaultEditor::new()?;

    loop {
        surface.drain_pending(&mut events);

        match rl.readline(&surface.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                let parsed = match parse_special_command(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e.to_string().yellow());
                        continue;
                    }
                };

                match parsed {
                    SpecialCommand::None => {
                        let _ = commands.send(PanelCommand::SubmitPrompt {
                            text: trimmed.to_string(),
                            custom_title: None,
                        });
                        surface.follow_stream(&mut events, &commands).await;
                    }
                    SpecialCommand::List => {
                        let _ = commands.send(PanelCommand::LoadConversations);
                        surface
                            .await_event(&mut events, |e| {
                                matches!(
                                    e,
                                    PanelEvent::ConversationsLoaded { .. }
                                        | PanelEvent::ShowError { .. }
                                )
                            })
                            .await;
                    }
                    SpecialCommand::Open(id) => {
                        let _ = commands.send(PanelCommand::LoadConversation {
                            conversation_id: id,
                        });
                        surface
                            .await_event(&mut events, |e| {
                                matches!(
                                    e,
                                    PanelEvent::ConversationLoaded { .. }
                                        | PanelEvent::ShowError { .. }
                                )
                            })
                            .await;
                    }
                    SpecialCommand::New(custom_title) => {
                        let _ = commands.send(PanelCommand::NewConversation { custom_title });
                        surface
                            .await_event(&mut events, |e| {
                                matches!(e, PanelEvent::ClearConversation { .. })
                            })
                            .await;
                    }
                    SpecialCommand::Rename(new_title) => {
                        let Some(id) = surface.current_conversation.clone() else {
                            println!("{}", "No conversation is loaded.".yellow());
                            continue;
                        };
                        let _ = commands.send(PanelCommand::RenameConversation {
                            conversation_id: id,
                            title: new_title,
                        });
                        surface
                            .await_event(&mut events, |e| {
                                matches!(
                                    e,
                                    PanelEvent::ConversationsLoaded { .. }
                                        | PanelEvent::ShowError { .. }
                                )
                            })
                            .await;
                    }
                    SpecialCommand::Delete => {
                        let Some(id) = surface.current_conversation.clone() else {
                            println!("{}", "No conversation is loaded.".yellow());
                            continue;
                        };
                        let answer = rl.readline("Delete current conversation? [y/N] ")?;
                        if !answer.trim().eq_ignore_ascii_case("y") {
                            println!("Cancelled.");
                            continue;
                        }
                        let _ = commands.send(PanelCommand::DeleteConversation {
                            conversation_id: id,
                        });
                        surface
                            .await_event(&mut events, |e| {
                                matches!(
                                    e,
                                    PanelEvent::ConversationsLoaded { .. }
                                        | PanelEvent::ShowError { .. }
                                )
                            })
                            .await;
                    }
                    SpecialCommand::Health => {
                        let _ = commands.send(PanelCommand::CheckHealth);
                        surface.force_health_report = true;
                        surface
                            .await_event(&mut events, |e| {
                                matches!(e, PanelEvent::HealthStatus { .. })
                            })
                            .await;
                    }
                    SpecialCommand::Settings => {
                        let _ = commands.send(PanelCommand::LoadSettings);
                        surface
                            .await_event(&mut events, |e| {
                                matches!(
                                    e,
                                    PanelEvent::SettingsLoaded { .. } | PanelEvent::ShowError { .. }
                                )
                            })
                            .await;
                    }
                    SpecialCommand::Host(host) => {
                        let _ = commands.send(PanelCommand::TestConnection { host: host.clone() });
                        let outcome = surface
                            .await_event(&mut events, |e| {
                                matches!(e, PanelEvent::ConnectionStatus { .. })
                            })
                            .await;
                        let probe_ok = matches!(
                            outcome,
                            Some(PanelEvent::ConnectionStatus {
                                status: ProbeOutcome::Success,
                                ..
                            })
                        );
                        if !probe_ok {
                            println!("{}", "Host not saved.".yellow());
                            continue;
                        }
                        let mut current = settings.load().unwrap_or_default();
                        current.rag_host = host;
                        let _ = commands.send(PanelCommand::SaveSettings { settings: current });
                        surface
                            .await_event(&mut events, |e| {
                                matches!(
                                    e,
                                    PanelEvent::ShowSuccess { .. } | PanelEvent::ShowError { .. }
                                )
                            })
                            .await;
                    }
                    SpecialCommand::Help => print_help(),
                    SpecialCommand::Exit => break,
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    monitor_cancel.cancel();
    println!("Goodbye.");
    Ok(())
}

/// Terminal-side rendering state for the chat panel
struct ChatSurface {
    current_conversation: Option<String>,
    current_title: Option<String>,
    last_health: Option<HealthState>,
    /// Next healthStatus event is printed even without a transition
    force_health_report: bool,
    /// Reply text already printed for the in-progress stream
    printed: String,
    reply_open: bool,
}

impl ChatSurface {
    fn new() -> Self {
        Self {
            current_conversation: None,
            current_title: None,
            last_health: None,
            force_health_report: false,
            printed: String::new(),
            reply_open: false,
        }
    }

    fn prompt(&self) -> String {
        let label = self.current_title.as_deref().unwrap_or("new chat");
        format!("[{}] >> ", label.cyan())
    }

    /// Render events that arrived while the prompt was idle
    fn drain_pending(&mut self, events: &mut mpsc::UnboundedReceiver<PanelEvent>) {
        while let Ok(event) = events.try_recv() {
            self.render_event(event);
        }
    }

    /// Follow an active stream until it reaches a terminal event
    ///
    /// Ctrl-C while streaming cancels the session; the loop still runs to
    /// the terminal update the cancellation produces.
    async fn follow_stream(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<PanelEvent>,
        commands: &mpsc::UnboundedSender<PanelCommand>,
    ) {
        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    let Some(event) = maybe_event else { return };
                    let terminal = matches!(
                        &event,
                        PanelEvent::UpdateStreamingResult { is_complete: true, .. }
                            | PanelEvent::ShowError { .. }
                    );
                    self.render_event(event);
                    if terminal {
                        return;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    let _ = commands.send(PanelCommand::StopStreaming);
                }
            }
        }
    }

    /// Render events until one matches `pred` (which is also rendered)
    ///
    /// Returns the matching event, or `None` on timeout.
    async fn await_event<F>(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<PanelEvent>,
        pred: F,
    ) -> Option<PanelEvent>
    where
        F: Fn(&PanelEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + SYNC_WAIT;
        loop {
            let event = tokio::time::timeout_at(deadline, events.recv()).await.ok()??;
            let matched = pred(&event);
            let returned = event.clone();
            self.render_event(event);
            if matched {
                return Some(returned);
            }
        }
    }

    fn render_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::AddUserMessage { .. } => {
                // The user just typed it; no echo needed on a terminal.
            }
            PanelEvent::ShowLoading { .. } => {}
            PanelEvent::UpdateStreamingResult {
                text, is_complete, ..
            } => {
                if !self.reply_open {
                    self.printed.clear();
                    self.reply_open = true;
                }
                if let Some(delta) = text.strip_prefix(self.printed.as_str()) {
                    print!("{}", delta);
                } else {
                    // Replace-style rewrites that are not pure extensions
                    // restart the line.
                    print!("\n{}", text);
                }
                let _ = std::io::stdout().flush();
                self.printed = text;
                if is_complete {
                    println!();
                    self.reply_open = false;
                    self.printed.clear();
                }
            }
            PanelEvent::SetConversationId { conversation_id } => {
                if conversation_id.is_none() {
                    self.current_title = None;
                }
                self.current_conversation = conversation_id;
            }
            PanelEvent::UpdateChatTitle { title } => {
                self.current_title = Some(title);
            }
            PanelEvent::ConversationsLoaded { conversations } => {
                if conversations.is_empty() {
                    println!("{}", "No conversations yet.".dimmed());
                    return;
                }
                println!("{}", "Conversations:".bold());
                for conv in &conversations {
                    let date = conv
                        .updated_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let marker = if self.current_conversation.as_deref() == Some(conv.id.as_str())
                    {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        " {} {}  {}  {}",
                        marker,
                        conv.id.dimmed(),
                        conv.title,
                        date.dimmed()
                    );
                }
            }
            PanelEvent::ConversationLoaded { conversation } => {
                self.current_title = Some(conversation.title.clone());
                println!("{} {}", "Loaded:".bold(), conversation.title);
                for message in &conversation.messages {
                    if message.role == "user" {
                        println!("{} {}", ">>".cyan(), message.content);
                    } else {
                        println!("{}", message.content);
                    }
                }
            }
            PanelEvent::ClearConversation { custom_title } => {
                self.current_title = custom_title.clone();
                match custom_title {
                    Some(title) => println!("Started new conversation: {}", title),
                    None => println!("Started new conversation."),
                }
            }
            PanelEvent::HealthStatus { status } => {
                let changed = self.last_health != Some(status);
                if changed || self.force_health_report {
                    match status {
                        HealthState::Online => println!("{}", "Backend online".green()),
                        HealthState::Offline => println!("{}", "Backend offline".red()),
                        HealthState::Checking => println!("{}", "Checking backend...".dimmed()),
                    }
                }
                self.force_health_report = false;
                self.last_health = Some(status);
            }
            PanelEvent::ShowError { text } => {
                println!("{}", text.red());
            }
            PanelEvent::ShowSuccess { text } => {
                println!("{}", text.green());
            }
            PanelEvent::ShowIngestResult { text } => {
                println!("{}", text);
            }
            PanelEvent::SettingsLoaded { settings } => {
                println!("{}", "Panel settings:".bold());
                println!("  host:  {}", settings.rag_host);
                match settings.selected_model {
                    Some(model) => println!("  model: {}", model),
                    None => println!("  model: {}", "(backend default)".dimmed()),
                }
            }
            PanelEvent::ConnectionStatus { status, message } => match status {
                ProbeOutcome::Success => println!("{}", message.green()),
                ProbeOutcome::Error => println!("{}", message.red()),
            },
        }
    }
}
