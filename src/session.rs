//! Streaming session controller
//!
//! Owns the single in-flight prompt→reply exchange. A session is created
//! when a prompt is submitted, adopts a conversation identity from the
//! first chunk that carries one, accumulates reply text per the configured
//! chunk policy, and is destroyed on completion, error, or cancellation.
//! Submissions while a session is active are rejected, never queued.
//!
//! The controller is deliberately free of I/O: the panel host feeds it
//! decoded stream events and it answers by emitting [`PanelEvent`]s, which
//! makes every transition testable against a scripted chunk sequence.

use crate::api::{ConversationId, QueryRequest, StreamChunk};
use crate::markdown::{self, MarkdownRenderer};
use crate::protocol::PanelEvent;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Marker appended to the accumulated text when the user stops a reply
pub const STOPPED_BY_USER_MARKER: &str = "\n\n*Stopped by user*";

/// How reply text in a chunk relates to the text accumulated so far
///
/// The backend's chunking convention is ambiguous across deployments, so
/// the policy is an explicit parameter applied uniformly, never inferred
/// per chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPolicy {
    /// Each chunk carries the full response so far
    #[default]
    Replace,
    /// Each chunk carries an incremental delta
    Append,
}

/// Lifecycle phase of the session slot
///
/// `Completing`, `Cancelled`, and `Errored` are transient: terminal
/// handling passes through them and settles back at `Idle`, releasing the
/// slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session; submissions are accepted
    Idle,
    /// A streamed exchange is in flight
    Streaming,
    /// The stream ended and the final render is being produced
    Completing,
    /// The user stopped the stream
    Cancelled,
    /// The stream failed
    Errored,
}

/// The single in-flight exchange
struct StreamingSession {
    /// Identity adopted from the first chunk that carries one; immutable after
    conversation_id: Option<ConversationId>,
    /// Reply text accumulated so far
    accumulated: String,
    /// Title staged for a brand-new conversation, consumed on adoption
    pending_title: Option<String>,
    /// Aborts the underlying transport request
    cancel: Option<CancellationToken>,
}

/// Controller for the single streaming session slot
///
/// Constructed once per panel lifetime and handed to collaborators by
/// reference; there is no ambient global session state.
pub struct SessionController {
    phase: SessionPhase,
    session: Option<StreamingSession>,
    /// Conversation the panel is currently on, across sessions
    current_conversation: Option<ConversationId>,
    chunk_policy: ChunkPolicy,
    renderer: MarkdownRenderer,
    events: UnboundedSender<PanelEvent>,
    /// Advisory flag shared with the health monitor
    streaming: Arc<AtomicBool>,
}

impl SessionController {
    /// Create an idle controller that emits events on `events`
    pub fn new(chunk_policy: ChunkPolicy, events: UnboundedSender<PanelEvent>) -> Self {
        Self {
            phase: SessionPhase::Idle,
            session: None,
            current_conversation: None,
            chunk_policy,
            renderer: MarkdownRenderer::new(),
            events,
            streaming: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared streaming flag, read by the health monitor to skip polls
    pub fn streaming_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.streaming)
    }

    /// True while a streamed exchange is in flight
    pub fn is_active(&self) -> bool {
        matches!(self.phase, SessionPhase::Streaming)
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Conversation the panel is currently on
    pub fn current_conversation_id(&self) -> Option<&str> {
        self.current_conversation.as_deref()
    }

    /// Switch the panel to a conversation (or to none, for a fresh one)
    pub fn set_current_conversation(&mut self, id: Option<ConversationId>) {
        self.current_conversation = id;
    }

    /// Begin a streamed exchange for `prompt`
    ///
    /// Returns the request to open on the transport, or `None` when a
    /// session is already active — in which case nothing is emitted and no
    /// state changes (submissions are rejected, not queued). The user
    /// message is surfaced immediately; `custom_title` is only carried when
    /// no conversation identity is known yet.
    pub fn begin_submit(&mut self, prompt: &str, custom_title: Option<String>) -> Option<QueryRequest> {
        if self.is_active() {
            tracing::warn!("submit rejected: a streaming session is already active");
            return None;
        }

        let conversation_id = self.current_conversation.clone();
        let pending_title = if conversation_id.is_none() {
            custom_title.clone()
        } else {
            None
        };

        self.session = Some(StreamingSession {
            conversation_id: conversation_id.clone(),
            accumulated: String::new(),
            pending_title,
            cancel: None,
        });
        self.phase = SessionPhase::Streaming;
        self.streaming.store(true, Ordering::SeqCst);

        let _ = self.events.send(PanelEvent::AddUserMessage {
            text: prompt.to_string(),
        });
        let _ = self.events.send(PanelEvent::ShowLoading { is_loading: true });

        Some(QueryRequest::new(prompt, conversation_id, custom_title))
    }

    /// Attach the transport's cancel handle to the active session
    pub fn attach_cancel(&mut self, token: CancellationToken) {
        if let Some(session) = self.session.as_mut() {
            session.cancel = Some(token);
        }
    }

    /// Process one decoded chunk
    ///
    /// Identity adoption happens before any partial render for the same
    /// chunk, so the surface sees a stable id by the time text arrives.
    /// Chunks arriving outside an active session are ignored.
    pub fn handle_chunk(&mut self, chunk: StreamChunk) {
        if !self.is_active() {
            tracing::debug!("chunk ignored: no active session");
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if let Some(id) = &chunk.conversation_id {
            if session.conversation_id.is_none() {
                session.conversation_id = Some(id.clone());
                self.current_conversation = Some(id.clone());
                let _ = self.events.send(PanelEvent::SetConversationId {
                    conversation_id: Some(id.clone()),
                });
                if let Some(title) = session.pending_title.take() {
                    let _ = self.events.send(PanelEvent::UpdateChatTitle { title });
                }
            }
        }

        if let Some(value) = &chunk.response {
            let text = markdown::coerce_text(value);
            match self.chunk_policy {
                ChunkPolicy::Replace => session.accumulated = text,
                ChunkPolicy::Append => session.accumulated.push_str(&text),
            }
            let html = self.renderer.render_partial_text(&session.accumulated);
            let _ = self.events.send(PanelEvent::UpdateStreamingResult {
                text: session.accumulated.clone(),
                html,
                is_complete: false,
            });
        }
    }

    /// Complete the stream normally
    ///
    /// Renders the final text with a full markdown parse and tears the
    /// session down. Returns true when a conversation identity was assigned
    /// to the session, i.e. the caller should schedule a list refresh.
    pub fn handle_end(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.phase = SessionPhase::Completing;
        let Some(session) = self.session.take() else {
            self.release();
            return false;
        };

        let html = self.renderer.render_final_text(&session.accumulated);
        let _ = self.events.send(PanelEvent::UpdateStreamingResult {
            text: session.accumulated,
            html,
            is_complete: true,
        });
        self.release();
        session.conversation_id.is_some()
    }

    /// Terminate the stream with an error
    ///
    /// The error is surfaced to the display and the slot is released
    /// immediately; there is no retry.
    pub fn handle_error(&mut self, message: impl Into<String>) {
        if !self.is_active() {
            return;
        }
        self.phase = SessionPhase::Errored;
        self.session = None;
        let _ = self.events.send(PanelEvent::ShowError {
            text: message.into(),
        });
        self.release();
    }

    /// Cancel the active session
    ///
    /// Aborts the in-flight request and unconditionally marks the session
    /// inactive, without waiting for the abort to be acknowledged. The
    /// reply is finalized with a stopped-by-user marker appended to the
    /// accumulated text. Returns false (and does nothing) when no session
    /// is active, so a second cancel is a no-op.
    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            tracing::debug!("cancel ignored: no active session");
            return false;
        }
        self.phase = SessionPhase::Cancelled;
        let Some(session) = self.session.take() else {
            self.release();
            return false;
        };

        if let Some(token) = &session.cancel {
            token.cancel();
        }

        let text = format!("{}{}", session.accumulated, STOPPED_BY_USER_MARKER);
        let html = self.renderer.render_final_text(&text);
        let _ = self.events.send(PanelEvent::UpdateStreamingResult {
            text,
            html,
            is_complete: true,
        });
        self.release();
        true
    }

    /// Release the session slot and settle back at idle
    fn release(&mut self) {
        self.streaming.store(false, Ordering::SeqCst);
        let _ = self.events.send(PanelEvent::ShowLoading { is_loading: false });
        self.phase = SessionPhase::Idle;
    }
}
