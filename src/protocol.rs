//! Panel message protocol
//!
//! The typed command/event contract between the panel host and whatever
//! display surface is attached to it (the bundled readline surface, or an
//! editor webview speaking JSON). Commands flow surface → host, events flow
//! host → surface. Both sides serialize with a `command` tag, which is the
//! effective wire protocol.

use crate::api::{Conversation, ConversationId, ConversationSummary, HealthState};
use crate::settings::PanelSettings;
use serde::{Deserialize, Serialize};

/// Commands a display surface sends to the panel host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PanelCommand {
    /// Submit a prompt for a streamed reply
    #[serde(rename_all = "camelCase")]
    SubmitPrompt {
        /// The user's prompt text
        text: String,
        /// Title for a brand-new conversation, when one was staged
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_title: Option<String>,
    },
    /// Cancel the active streaming session
    StopStreaming,
    /// Refetch the conversation list
    LoadConversations,
    /// Load one conversation and make it current
    #[serde(rename_all = "camelCase")]
    LoadConversation {
        /// Conversation to load
        conversation_id: ConversationId,
    },
    /// Delete a conversation
    #[serde(rename_all = "camelCase")]
    DeleteConversation {
        /// Conversation to delete
        conversation_id: ConversationId,
    },
    /// Rename a conversation
    #[serde(rename_all = "camelCase")]
    RenameConversation {
        /// Conversation to rename
        conversation_id: ConversationId,
        /// New title
        title: String,
    },
    /// Start a fresh conversation, optionally staging a title for it
    #[serde(rename_all = "camelCase")]
    NewConversation {
        /// Title the next submission should seed the conversation with
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_title: Option<String>,
    },
    /// Probe backend liveness on demand
    CheckHealth,
    /// Load persisted panel settings
    LoadSettings,
    /// Persist panel settings and re-point the transport
    SaveSettings {
        /// Settings to persist
        settings: PanelSettings,
    },
    /// Probe an arbitrary host without saving it
    TestConnection {
        /// Host to probe
        host: String,
    },
    /// Trigger ingestion of a local repository path
    #[serde(rename_all = "camelCase")]
    IngestLocal {
        /// Path of the repository on the backend host
        repo_path: String,
    },
    /// Trigger ingestion of a git repository
    #[serde(rename_all = "camelCase")]
    IngestGit {
        /// Repository URL
        repo_url: String,
        /// Backend-local clone directory
        local_dir: String,
        /// Branch to ingest
        branch: String,
    },
}

/// Outcome of a `testConnection` probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// The host answered the health probe
    Success,
    /// The host did not answer
    Error,
}

/// Events the panel host sends to its display surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PanelEvent {
    /// In-progress or final assistant reply text
    #[serde(rename_all = "camelCase")]
    UpdateStreamingResult {
        /// Raw accumulated reply text
        text: String,
        /// Rendered HTML for the display surface
        html: String,
        /// True on the terminal update of a session
        is_complete: bool,
    },
    /// The current conversation identity changed
    #[serde(rename_all = "camelCase")]
    SetConversationId {
        /// New identity, or `None` for a fresh conversation
        conversation_id: Option<ConversationId>,
    },
    /// Fresh conversation list after a refresh
    ConversationsLoaded {
        /// The full replacement list
        conversations: Vec<ConversationSummary>,
    },
    /// A single conversation was loaded
    ConversationLoaded {
        /// The conversation with its message list
        conversation: Conversation,
    },
    /// The view should reset to an empty conversation
    #[serde(rename_all = "camelCase")]
    ClearConversation {
        /// Title staged for the next submission, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_title: Option<String>,
    },
    /// Echo of the just-submitted user message
    AddUserMessage {
        /// The prompt text
        text: String,
    },
    /// Streaming/ingestion activity indicator
    #[serde(rename_all = "camelCase")]
    ShowLoading {
        /// Whether work is in flight
        is_loading: bool,
    },
    /// Result of a health probe
    HealthStatus {
        /// Current backend liveness
        status: HealthState,
    },
    /// An error-styled message for the conversation view
    ShowError {
        /// Error text
        text: String,
    },
    /// Receipt from an ingestion request
    ShowIngestResult {
        /// Receipt text
        text: String,
    },
    /// A transient success confirmation
    ShowSuccess {
        /// Confirmation text
        text: String,
    },
    /// Persisted settings for the settings form
    SettingsLoaded {
        /// Current settings
        settings: PanelSettings,
    },
    /// Result of a `testConnection` probe
    ConnectionStatus {
        /// Whether the probe succeeded
        status: ProbeOutcome,
        /// Human-readable detail
        message: String,
    },
    /// The conversation title changed
    UpdateChatTitle {
        /// New title
        title: String,
    },
}
