//! Wire types for the RAG backend API
//!
//! This module defines the request and response shapes exchanged with the
//! backend, along with the decode step that normalizes the backend's
//! duck-typed payloads (bare vs. wrapped lists, loosely typed stream chunks)
//! into internal types before any business logic sees them.

use crate::error::RaglineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque server-issued conversation identity
///
/// `None` at the call sites that use `Option<ConversationId>` denotes
/// "no conversation yet" (the first message of a brand-new conversation).
pub type ConversationId = String;

/// One message within a conversation
///
/// The backend owns the message sequence; the client never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    /// Creates a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Conversation metadata as returned by `GET /conversations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Server-issued conversation identity
    pub id: ConversationId,
    /// Conversation title
    #[serde(default)]
    pub title: String,
    /// Last-updated timestamp, when the backend reports one
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A full conversation with its message list, from `GET /conversations/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Server-issued conversation identity
    pub id: ConversationId,
    /// Conversation title
    #[serde(default)]
    pub title: String,
    /// Last-updated timestamp, when the backend reports one
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Ordered message sequence
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Response shape of `GET /conversations`
///
/// The backend has shipped both a bare array and a `{conversations: [...]}`
/// wrapper; both are accepted and normalized to a plain `Vec`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ConversationListPayload {
    /// Bare array form
    Bare(Vec<ConversationSummary>),
    /// Wrapped object form
    Wrapped {
        /// The wrapped list
        conversations: Vec<ConversationSummary>,
    },
}

impl ConversationListPayload {
    /// Normalize either list form into a plain vector
    pub fn into_vec(self) -> Vec<ConversationSummary> {
        match self {
            Self::Bare(conversations) | Self::Wrapped { conversations } => conversations,
        }
    }
}

/// Request body for `POST /query`
///
/// `conversation_id` is serialized even when `None` (the backend treats an
/// explicit `null` as "start a new conversation"); `custom_title` is only
/// included when set, which callers do only for brand-new conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The user's prompt
    pub query: String,
    /// Always true; the non-streaming form is not used by this client
    pub stream: bool,
    /// Current conversation identity, or null for a new conversation
    pub conversation_id: Option<ConversationId>,
    /// Title to seed a brand-new conversation with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
}

impl QueryRequest {
    /// Build a streaming query request
    ///
    /// # Examples
    ///
    /// ```
    /// use ragline::api::QueryRequest;
    ///
    /// let request = QueryRequest::new("hello", None, Some("Greetings".to_string()));
    /// assert!(request.stream);
    /// assert_eq!(request.custom_title.as_deref(), Some("Greetings"));
    /// ```
    pub fn new(
        query: impl Into<String>,
        conversation_id: Option<ConversationId>,
        custom_title: Option<String>,
    ) -> Self {
        // A custom title is only meaningful when the backend is about to
        // create the conversation; drop it otherwise.
        let custom_title = if conversation_id.is_none() {
            custom_title
        } else {
            None
        };
        Self {
            query: query.into(),
            stream: true,
            conversation_id,
            custom_title,
        }
    }
}

/// One decoded unit of the chunked `/query` response body
///
/// Each line of the chunked body is a JSON object that may carry a
/// conversation identity, response text, or both. The `response` field is
/// kept as a raw [`Value`] because the backend has emitted non-string
/// payloads here; coercion to display text is the renderer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    /// Conversation identity, present on chunks that establish or repeat it
    pub conversation_id: Option<ConversationId>,
    /// Response text so far (or delta, depending on backend chunk policy)
    pub response: Option<Value>,
}

/// Raw serde shape of a chunk line, before normalization
#[derive(Debug, Deserialize)]
struct RawChunk {
    #[serde(default)]
    conversation_id: Option<ConversationId>,
    #[serde(default)]
    response: Option<Value>,
}

impl StreamChunk {
    /// Decode one line of the chunked response body
    ///
    /// # Errors
    ///
    /// Returns [`RaglineError::Decode`] when the line is not a JSON object.
    /// Callers skip such chunks rather than aborting the stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use ragline::api::StreamChunk;
    ///
    /// let chunk = StreamChunk::decode(r#"{"conversation_id":"c1","response":"Hi"}"#).unwrap();
    /// assert_eq!(chunk.conversation_id.as_deref(), Some("c1"));
    /// assert!(StreamChunk::decode("not json").is_err());
    /// ```
    pub fn decode(line: &str) -> Result<Self, RaglineError> {
        let raw: RawChunk = serde_json::from_str(line)
            .map_err(|e| RaglineError::Decode(format!("invalid chunk payload: {}", e)))?;
        Ok(Self {
            conversation_id: raw.conversation_id,
            response: raw.response,
        })
    }

    /// True when the chunk carries neither identity nor text
    pub fn is_empty(&self) -> bool {
        self.conversation_id.is_none() && self.response.is_none()
    }
}

/// Backend liveness as observed by the client
///
/// `Checking` is the transient client-side state before the first probe
/// result arrives; probes themselves only ever produce `Online` or
/// `Offline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// No probe result yet
    Checking,
    /// Last probe returned 2xx
    Online,
    /// Last probe failed or returned non-2xx
    Offline,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Checking => write!(f, "checking"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}
