//! HTTP transport for the RAG backend
//!
//! This module implements the client side of the backend HTTP surface:
//! simple request/response calls (health, conversation CRUD, ingestion) and
//! the long-lived chunked `/query` response, which is consumed by a spawned
//! pump task that frames the body into lines, decodes each line into a
//! [`StreamChunk`], and forwards the results over a channel together with a
//! cancellable handle.

pub mod types;

pub use types::{
    ChatMessage, Conversation, ConversationId, ConversationListPayload, ConversationSummary,
    HealthState, QueryRequest, StreamChunk,
};

use crate::error::{RaglineError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One event produced while consuming a streamed `/query` response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A decoded chunk payload
    Chunk(StreamChunk),
    /// The response body ended normally
    End,
    /// The transport failed mid-stream
    Error(String),
}

/// Handle to an in-flight streamed query
///
/// Dropping the handle does not abort the request; call
/// [`CancellationToken::cancel`] on `cancel` to stop chunk delivery and
/// tear down the connection.
pub struct QueryStream {
    /// Ordered stream events; closed after `End` or `Error`
    pub events: mpsc::UnboundedReceiver<StreamEvent>,
    /// Cancels the underlying request
    pub cancel: CancellationToken,
}

/// Backend transport abstraction
///
/// All backend access goes through this trait so the session controller,
/// health monitor, and list cache can be exercised against a scripted fake
/// without any network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Probe backend liveness at the configured host
    ///
    /// Never errors: failures of any kind are reported as
    /// [`HealthState::Offline`].
    async fn health(&self) -> HealthState;

    /// Probe backend liveness at an arbitrary host
    ///
    /// Used by the settings surface to test a host before saving it.
    async fn probe_health(&self, host: &str) -> HealthState;

    /// Open a streamed query against `POST /query`
    async fn open_query(&self, request: QueryRequest) -> Result<QueryStream>;

    /// Fetch the full conversation list
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>>;

    /// Fetch one conversation with its message list
    async fn fetch_conversation(&self, id: &str) -> Result<Conversation>;

    /// Rename a conversation
    async fn rename_conversation(&self, id: &str, title: &str) -> Result<()>;

    /// Delete a conversation
    async fn delete_conversation(&self, id: &str) -> Result<()>;

    /// Trigger ingestion of a local repository path
    async fn ingest_local(&self, repo_path: &str) -> Result<String>;

    /// Trigger ingestion of a git repository
    async fn ingest_git(&self, repo_url: &str, local_dir: &str, branch: &str) -> Result<String>;

    /// Currently configured base URL
    fn base_url(&self) -> String;

    /// Re-point the transport at a different base URL
    fn set_base_url(&self, host: String);
}

/// Default per-request timeout for simple (non-streaming) calls
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed [`Transport`] implementation
///
/// # Examples
///
/// ```no_run
/// use ragline::api::{ApiClient, Transport};
///
/// # async fn example() -> ragline::error::Result<()> {
/// let client = ApiClient::new("http://localhost:8000", std::time::Duration::from_secs(10))?;
/// let state = client.health().await;
/// println!("backend is {}", state);
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    client: Client,
    host: Arc<RwLock<String>>,
    request_timeout: Duration,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    ///
    /// * `host` - Backend base URL, e.g. `http://localhost:8000`
    /// * `connect_timeout` - TCP connect timeout for all requests
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(host: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        // No global timeout on the client itself: it would also apply to
        // long-lived streaming responses. Simple calls attach a per-request
        // timeout instead.
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("ragline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RaglineError::Transport(format!("failed to create HTTP client: {}", e)))?;

        let host = host.into();
        tracing::info!("Initialized backend client: host={}", host);

        Ok(Self {
            client,
            host: Arc::new(RwLock::new(host)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Build an absolute endpoint URL from a path like `/health`
    fn endpoint(&self, path: &str) -> String {
        let host = self.base_url();
        format!("{}{}", host.trim_end_matches('/'), path)
    }

    async fn probe(&self, host: &str) -> HealthState {
        let url = format!("{}/health", host.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => HealthState::Online,
            Ok(response) => {
                tracing::debug!("health probe returned HTTP {}", response.status());
                HealthState::Offline
            }
            Err(e) => {
                tracing::debug!("health probe failed: {}", e);
                HealthState::Offline
            }
        }
    }

    /// Read the response body or return a backend error for non-2xx statuses
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RaglineError::Backend {
            status: status.as_u16(),
            message,
        }
        .into())
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn health(&self) -> HealthState {
        let host = self.base_url();
        self.probe(&host).await
    }

    async fn probe_health(&self, host: &str) -> HealthState {
        self.probe(host).await
    }

    async fn open_query(&self, request: QueryRequest) -> Result<QueryStream> {
        let url = self.endpoint("/query");
        tracing::debug!(
            conversation_id = ?request.conversation_id,
            "opening streamed query: {}",
            url
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RaglineError::Transport(format!("query request failed: {}", e)))?;

        let response = Self::check_status(response).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let pump_cancel = cancel.clone();
        let byte_stream = response.bytes_stream();
        tokio::spawn(async move {
            pump_query_stream(byte_stream, tx, pump_cancel).await;
        });

        Ok(QueryStream { events: rx, cancel })
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let url = self.endpoint("/conversations");
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| RaglineError::Transport(format!("list request failed: {}", e)))?;
        let response = Self::check_status(response).await?;

        let payload: ConversationListPayload = response
            .json()
            .await
            .map_err(|e| RaglineError::Decode(format!("invalid conversation list: {}", e)))?;
        Ok(payload.into_vec())
    }

    async fn fetch_conversation(&self, id: &str) -> Result<Conversation> {
        let url = self.endpoint(&format!("/conversations/{}", id));
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| RaglineError::Transport(format!("fetch request failed: {}", e)))?;
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| RaglineError::Decode(format!("invalid conversation: {}", e)).into())
    }

    async fn rename_conversation(&self, id: &str, title: &str) -> Result<()> {
        let url = self.endpoint(&format!("/conversations/{}", id));
        let response = self
            .client
            .put(&url)
            .timeout(self.request_timeout)
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await
            .map_err(|e| RaglineError::Transport(format!("rename request failed: {}", e)))?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete_conversation(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/conversations/{}", id));
        let response = self
            .client
            .delete(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| RaglineError::Transport(format!("delete request failed: {}", e)))?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn ingest_local(&self, repo_path: &str) -> Result<String> {
        let url = self.endpoint("/ingest/local");
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&serde_json::json!({ "repo_path": repo_path }))
            .send()
            .await
            .map_err(|e| RaglineError::Transport(format!("ingest request failed: {}", e)))?;
        let response = Self::check_status(response).await?;

        let body = response.text().await.unwrap_or_default();
        Ok(ingest_receipt(&body))
    }

    async fn ingest_git(&self, repo_url: &str, local_dir: &str, branch: &str) -> Result<String> {
        let url = self.endpoint("/ingest/git");
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&serde_json::json!({
                "repo_url": repo_url,
                "local_dir": local_dir,
                "branch": branch,
            }))
            .send()
            .await
            .map_err(|e| RaglineError::Transport(format!("ingest request failed: {}", e)))?;
        let response = Self::check_status(response).await?;

        let body = response.text().await.unwrap_or_default();
        Ok(ingest_receipt(&body))
    }

    fn base_url(&self) -> String {
        self.host
            .read()
            .map(|host| host.clone())
            .unwrap_or_default()
    }

    fn set_base_url(&self, host: String) {
        if let Ok(mut guard) = self.host.write() {
            tracing::info!("backend host changed: {} -> {}", *guard, host);
            *guard = host;
        }
    }
}

/// Condense an ingest response body into a one-line receipt
fn ingest_receipt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "Ingestion started".to_string();
    }
    // Prefer a `message` field when the backend answers with JSON.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    trimmed.to_string()
}

/// Consume the chunked `/query` response body
///
/// Frames the byte stream into lines, decodes each non-empty line into a
/// [`StreamChunk`], and forwards results to `events`. Malformed lines are
/// skipped so one bad chunk never aborts an otherwise healthy stream. A
/// trailing unterminated line is flushed before `End`. Cancellation stops
/// delivery immediately and drops the response, aborting the connection.
pub async fn pump_query_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
    events: mpsc::UnboundedSender<StreamEvent>,
    cancel: CancellationToken,
) {
    use futures::StreamExt;

    let mut buffer = String::new();
    tokio::pin!(byte_stream);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("query stream cancelled");
                return;
            }
            next = byte_stream.next() => match next {
                Some(Ok(chunk)) => {
                    let text = match std::str::from_utf8(&chunk) {
                        Ok(s) => s,
                        Err(_) => {
                            tracing::debug!("skipping non-utf8 chunk");
                            continue;
                        }
                    };
                    buffer.push_str(text);

                    while let Some(pos) = buffer.find('\n') {
                        let line = buffer[..pos].trim().to_string();
                        buffer.drain(..=pos);
                        forward_chunk_line(&line, &events);
                    }
                }
                Some(Err(e)) => {
                    let _ = events.send(StreamEvent::Error(e.to_string()));
                    return;
                }
                None => {
                    let line = buffer.trim().to_string();
                    forward_chunk_line(&line, &events);
                    let _ = events.send(StreamEvent::End);
                    return;
                }
            }
        }
    }
}

/// Decode one framed line and forward it, skipping malformed payloads
fn forward_chunk_line(line: &str, events: &mpsc::UnboundedSender<StreamEvent>) {
    if line.is_empty() {
        return;
    }
    match StreamChunk::decode(line) {
        Ok(chunk) if !chunk.is_empty() => {
            let _ = events.send(StreamEvent::Chunk(chunk));
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!("skipping malformed chunk: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scripted(parts: Vec<&str>) -> impl Stream<Item = reqwest::Result<Bytes>> {
        futures::stream::iter(
            parts
                .into_iter()
                .map(|p| Ok(Bytes::from(p.to_string())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect_events(parts: Vec<&str>) -> Vec<StreamEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        pump_query_stream(scripted(parts), tx, CancellationToken::new()).await;
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn test_pump_one_chunk_per_line() {
        let events = collect_events(vec![
            "{\"conversation_id\":\"c1\",\"response\":\"Hi\"}\n",
            "{\"response\":\"Hi there\"}\n",
        ])
        .await;

        assert_eq!(events.len(), 3);
        match &events[0] {
            StreamEvent::Chunk(chunk) => {
                assert_eq!(chunk.conversation_id.as_deref(), Some("c1"));
                assert_eq!(chunk.response, Some(json!("Hi")));
            }
            other => panic!("expected chunk, got {:?}", other),
        }
        assert_eq!(events[2], StreamEvent::End);
    }

    #[tokio::test]
    async fn test_pump_line_split_across_chunks() {
        let events = collect_events(vec![
            "{\"response\":\"split ",
            "payload\"}\n",
        ])
        .await;

        assert_eq!(events.len(), 2);
        match &events[0] {
            StreamEvent::Chunk(chunk) => {
                assert_eq!(chunk.response, Some(json!("split payload")));
            }
            other => panic!("expected chunk, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pump_multiple_lines_in_one_chunk() {
        let events =
            collect_events(vec!["{\"response\":\"a\"}\n{\"response\":\"b\"}\n"]).await;

        let texts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Chunk(c) => c.response.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn test_pump_skips_malformed_lines() {
        let events = collect_events(vec![
            "not json at all\n{\"response\":\"good\"}\n<html>oops</html>\n",
        ])
        .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StreamEvent::Chunk(_)));
        assert_eq!(events[1], StreamEvent::End);
    }

    #[tokio::test]
    async fn test_pump_flushes_trailing_unterminated_line() {
        let events = collect_events(vec!["{\"response\":\"no newline\"}"]).await;

        assert_eq!(events.len(), 2);
        match &events[0] {
            StreamEvent::Chunk(chunk) => {
                assert_eq!(chunk.response, Some(json!("no newline")));
            }
            other => panic!("expected chunk, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pump_skips_empty_payload_chunks() {
        let events = collect_events(vec!["{}\n\n{\"response\":\"x\"}\n"]).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StreamEvent::Chunk(_)));
    }

    #[tokio::test]
    async fn test_pump_stops_on_cancellation() {
        // A stream that never ends: the pump must exit via the token.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let pump_cancel = cancel.clone();

        let endless = futures::stream::unfold(0u64, |n| async move {
            if n == 0 {
                Some((
                    Ok::<_, reqwest::Error>(Bytes::from("{\"response\":\"first\"}\n")),
                    n + 1,
                ))
            } else {
                // Never yields again
                std::future::pending::<Option<(reqwest::Result<Bytes>, u64)>>().await
            }
        });

        let handle = tokio::spawn(async move {
            pump_query_stream(endless, tx, pump_cancel).await;
        });

        // First chunk arrives, then cancellation ends the pump without End.
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, StreamEvent::Chunk(_)));
        cancel.cancel();
        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_ingest_receipt_prefers_json_message() {
        assert_eq!(
            ingest_receipt(r#"{"message":"queued 12 files"}"#),
            "queued 12 files"
        );
        assert_eq!(ingest_receipt("plain body"), "plain body");
        assert_eq!(ingest_receipt("   "), "Ingestion started");
    }

    #[tokio::test]
    async fn test_api_client_endpoint_joining() {
        let client = ApiClient::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint("/health"), "http://localhost:8000/health");

        client.set_base_url("http://other:9000".to_string());
        assert_eq!(client.base_url(), "http://other:9000");
        assert_eq!(
            client.endpoint("/conversations"),
            "http://other:9000/conversations"
        );
    }
}
