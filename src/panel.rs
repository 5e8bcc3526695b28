//! Panel host
//!
//! The event loop that connects a display surface to the library: it
//! consumes [`PanelCommand`]s, drives the [`SessionController`] and the
//! transport, keeps the conversation list cache synchronized, and answers
//! with [`PanelEvent`]s. One `Panel` instance exists per surface lifetime;
//! all mutable panel state lives on it, never in globals.

use crate::api::{HealthState, StreamEvent, Transport};
use crate::conversations::ConversationListCache;
use crate::protocol::{PanelCommand, PanelEvent, ProbeOutcome};
use crate::session::{ChunkPolicy, SessionController};
use crate::settings::SettingsStore;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default debounce before the post-stream list refresh
///
/// Gives the backend a moment to persist the finished conversation before
/// the list is refetched.
pub const DEFAULT_REFRESH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Channel ends handed to the display surface
pub struct PanelChannels {
    /// Surface → host commands
    pub commands: mpsc::UnboundedSender<PanelCommand>,
    /// Host → surface events
    pub events: mpsc::UnboundedReceiver<PanelEvent>,
}

/// Panel host loop
pub struct Panel<T: Transport + 'static> {
    transport: Arc<T>,
    controller: SessionController,
    cache: ConversationListCache,
    settings: Arc<dyn SettingsStore>,
    events: mpsc::UnboundedSender<PanelEvent>,
    commands_rx: mpsc::UnboundedReceiver<PanelCommand>,
    /// Clone of the surface's command sender, used for self-dispatch
    /// (the debounced refresh re-enters through the normal command path)
    commands_tx: mpsc::UnboundedSender<PanelCommand>,
    /// Events of the in-flight streamed query, when one is open
    stream_rx: Option<mpsc::UnboundedReceiver<StreamEvent>>,
    /// Title staged by `newConversation`, consumed by the next submission
    pending_title: Option<String>,
    refresh_debounce: Duration,
}

impl<T: Transport + 'static> Panel<T> {
    /// Create a panel host and the channel ends for its surface
    pub fn new(
        transport: Arc<T>,
        settings: Arc<dyn SettingsStore>,
        chunk_policy: ChunkPolicy,
        refresh_debounce: Duration,
    ) -> (Self, PanelChannels) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let panel = Self {
            transport,
            controller: SessionController::new(chunk_policy, event_tx.clone()),
            cache: ConversationListCache::new(),
            settings,
            events: event_tx,
            commands_rx: command_rx,
            commands_tx: command_tx.clone(),
            stream_rx: None,
            pending_title: None,
            refresh_debounce,
        };
        let channels = PanelChannels {
            commands: command_tx,
            events: event_rx,
        };
        (panel, channels)
    }

    /// Advisory streaming flag for the health monitor
    pub fn streaming_handle(&self) -> Arc<AtomicBool> {
        self.controller.streaming_handle()
    }

    /// Event sender for collaborators that report to the same surface
    pub fn event_sender(&self) -> mpsc::UnboundedSender<PanelEvent> {
        self.events.clone()
    }

    /// Run the host loop
    ///
    /// Intended to be spawned; the loop lives as long as the surface's
    /// task does (the host keeps a command sender of its own for the
    /// debounced refresh, so it is shut down by dropping the whole task).
    pub async fn run(mut self) {
        loop {
            // With no stream open, the stream branch pends forever and the
            // loop only reacts to commands.
            tokio::select! {
                maybe_cmd = self.commands_rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                event = next_stream_event(&mut self.stream_rx) => {
                    match event {
                        Some(ev) => self.handle_stream_event(ev),
                        None => {
                            // Sender vanished without a terminal event.
                            self.stream_rx = None;
                            self.controller
                                .handle_error("Streaming error: connection closed unexpectedly");
                        }
                    }
                }
            }
        }
        tracing::debug!("panel host loop ended");
    }

    /// Dispatch one surface command
    pub async fn handle_command(&mut self, command: PanelCommand) {
        tracing::debug!(?command, "panel command");
        match command {
            PanelCommand::SubmitPrompt { text, custom_title } => {
                self.handle_submit(text, custom_title).await;
            }
            PanelCommand::StopStreaming => {
                self.controller.cancel();
            }
            PanelCommand::LoadConversations => {
                self.refresh_list().await;
            }
            PanelCommand::LoadConversation { conversation_id } => {
                match self.transport.fetch_conversation(&conversation_id).await {
                    Ok(conversation) => {
                        self.controller
                            .set_current_conversation(Some(conversation.id.clone()));
                        let _ = self.events.send(PanelEvent::SetConversationId {
                            conversation_id: Some(conversation.id.clone()),
                        });
                        let _ = self
                            .events
                            .send(PanelEvent::ConversationLoaded { conversation });
                    }
                    Err(e) => self.show_error(format!("Failed to load conversation: {}", e)),
                }
            }
            PanelCommand::DeleteConversation { conversation_id } => {
                match self.transport.delete_conversation(&conversation_id).await {
                    Ok(()) => {
                        if self.controller.current_conversation_id() == Some(conversation_id.as_str())
                        {
                            self.controller.set_current_conversation(None);
                            let _ = self.events.send(PanelEvent::SetConversationId {
                                conversation_id: None,
                            });
                            let _ = self
                                .events
                                .send(PanelEvent::ClearConversation { custom_title: None });
                        }
                        let _ = self.events.send(PanelEvent::ShowSuccess {
                            text: "Conversation deleted".to_string(),
                        });
                        self.refresh_list().await;
                    }
                    Err(e) => self.show_error(format!("Failed to delete conversation: {}", e)),
                }
            }
            PanelCommand::RenameConversation {
                conversation_id,
                title,
            } => {
                match self
                    .transport
                    .rename_conversation(&conversation_id, &title)
                    .await
                {
                    Ok(()) => {
                        if self.controller.current_conversation_id() == Some(conversation_id.as_str())
                        {
                            let _ = self
                                .events
                                .send(PanelEvent::UpdateChatTitle { title: title.clone() });
                        }
                        let _ = self.events.send(PanelEvent::ShowSuccess {
                            text: "Conversation renamed".to_string(),
                        });
                        self.refresh_list().await;
                    }
                    Err(e) => self.show_error(format!("Failed to rename conversation: {}", e)),
                }
            }
            PanelCommand::NewConversation { custom_title } => {
                self.controller.set_current_conversation(None);
                self.pending_title = custom_title.clone();
                let _ = self.events.send(PanelEvent::SetConversationId {
                    conversation_id: None,
                });
                let _ = self
                    .events
                    .send(PanelEvent::ClearConversation { custom_title });
            }
            PanelCommand::CheckHealth => {
                let status = self.transport.health().await;
                let _ = self.events.send(PanelEvent::HealthStatus { status });
            }
            PanelCommand::LoadSettings => match self.settings.load() {
                Ok(settings) => {
                    let _ = self.events.send(PanelEvent::SettingsLoaded { settings });
                }
                Err(e) => self.show_error(format!("Failed to load settings: {}", e)),
            },
            PanelCommand::SaveSettings { settings } => match self.settings.save(&settings) {
                Ok(()) => {
                    self.transport.set_base_url(settings.rag_host.clone());
                    let _ = self.events.send(PanelEvent::ShowSuccess {
                        text: "Settings saved".to_string(),
                    });
                }
                Err(e) => self.show_error(format!("Failed to save settings: {}", e)),
            },
            PanelCommand::TestConnection { host } => {
                let (status, message) = match self.transport.probe_health(&host).await {
                    HealthState::Online => (ProbeOutcome::Success, "Connection successful"),
                    _ => (ProbeOutcome::Error, "Connection failed"),
                };
                let _ = self.events.send(PanelEvent::ConnectionStatus {
                    status,
                    message: message.to_string(),
                });
            }
            PanelCommand::IngestLocal { repo_path } => {
                let _ = self.events.send(PanelEvent::ShowLoading { is_loading: true });
                let result = self.transport.ingest_local(&repo_path).await;
                let _ = self
                    .events
                    .send(PanelEvent::ShowLoading { is_loading: false });
                match result {
                    Ok(text) => {
                        let _ = self.events.send(PanelEvent::ShowIngestResult { text });
                    }
                    Err(e) => self.show_error(format!("Ingest error: {}", e)),
                }
            }
            PanelCommand::IngestGit {
                repo_url,
                local_dir,
                branch,
            } => {
                let _ = self.events.send(PanelEvent::ShowLoading { is_loading: true });
                let result = self
                    .transport
                    .ingest_git(&repo_url, &local_dir, &branch)
                    .await;
                let _ = self
                    .events
                    .send(PanelEvent::ShowLoading { is_loading: false });
                match result {
                    Ok(text) => {
                        let _ = self.events.send(PanelEvent::ShowIngestResult { text });
                    }
                    Err(e) => self.show_error(format!("Ingest error: {}", e)),
                }
            }
        }
    }

    async fn handle_submit(&mut self, text: String, custom_title: Option<String>) {
        if self.controller.is_active() {
            tracing::warn!("submit ignored: a streaming session is already active");
            return;
        }

        let staged = custom_title.or_else(|| self.pending_title.take());
        let Some(request) = self.controller.begin_submit(&text, staged) else {
            return;
        };

        match self.transport.open_query(request).await {
            Ok(stream) => {
                self.controller.attach_cancel(stream.cancel);
                self.stream_rx = Some(stream.events);
            }
            Err(e) => {
                self.controller.handle_error(format!("Error: {}", e));
            }
        }
    }

    fn handle_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Chunk(chunk) => self.controller.handle_chunk(chunk),
            StreamEvent::End => {
                self.stream_rx = None;
                if self.controller.handle_end() {
                    self.schedule_refresh();
                }
            }
            StreamEvent::Error(message) => {
                self.stream_rx = None;
                self.controller
                    .handle_error(format!("Streaming error: {}", message));
            }
        }
    }

    /// Refresh the list after a short debounce, through the command path
    fn schedule_refresh(&self) {
        let commands = self.commands_tx.clone();
        let delay = self.refresh_debounce;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(PanelCommand::LoadConversations);
        });
    }

    async fn refresh_list(&mut self) {
        match self.cache.refresh(self.transport.as_ref()).await {
            Ok(entries) => {
                let _ = self.events.send(PanelEvent::ConversationsLoaded {
                    conversations: entries.to_vec(),
                });
            }
            Err(e) => self.show_error(format!("Failed to load conversations: {}", e)),
        }
    }

    fn show_error(&self, text: String) {
        tracing::error!("{}", text);
        let _ = self.events.send(PanelEvent::ShowError { text });
    }
}

/// Await the next event of the open stream, if any
async fn next_stream_event(
    rx: &mut Option<mpsc::UnboundedReceiver<StreamEvent>>,
) -> Option<StreamEvent> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
