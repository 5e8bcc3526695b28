//! Shared test helpers
//!
//! A scripted [`Transport`] implementation used by unit tests to exercise
//! the session controller, panel host, health monitor, and list cache
//! against deterministic chunk sequences and liveness answers, without any
//! network.

use crate::api::{
    Conversation, ConversationSummary, HealthState, QueryRequest, QueryStream, StreamEvent,
    Transport,
};
use crate::error::{RaglineError, Result};
use crate::settings::{PanelSettings, SettingsStore};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct ScriptState {
    conversations: Vec<ConversationSummary>,
    details: HashMap<String, Conversation>,
    fail_listing: bool,
    fail_query: bool,
    health: Option<HealthState>,
    queries: Vec<QueryRequest>,
    query_scripts: VecDeque<Vec<StreamEvent>>,
    renames: Vec<(String, String)>,
    deletes: Vec<String>,
    probed_hosts: Vec<String>,
    ingests: Vec<String>,
    list_calls: usize,
    open_senders: Vec<mpsc::UnboundedSender<StreamEvent>>,
    base_url: Option<String>,
}

/// Scripted transport for tests
///
/// Queries answer with pre-seeded event scripts, health probes answer with
/// a settable state and are counted, and mutating calls are recorded for
/// assertions.
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
    health_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptState {
                health: Some(HealthState::Online),
                ..Default::default()
            }),
            health_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_conversations(&self, conversations: Vec<ConversationSummary>) {
        self.state.lock().unwrap().conversations = conversations;
    }

    pub fn set_conversation(&self, conversation: Conversation) {
        self.state
            .lock()
            .unwrap()
            .details
            .insert(conversation.id.clone(), conversation);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().unwrap().fail_listing = fail;
    }

    pub fn fail_query(&self, fail: bool) {
        self.state.lock().unwrap().fail_query = fail;
    }

    pub fn set_health(&self, health: HealthState) {
        self.state.lock().unwrap().health = Some(health);
    }

    /// Number of health probes issued so far
    pub fn health_call_count(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    /// Queue the event script for the next opened query
    pub fn push_query_script(&self, events: Vec<StreamEvent>) {
        self.state.lock().unwrap().query_scripts.push_back(events);
    }

    /// Requests passed to `open_query`, in order
    pub fn queries(&self) -> Vec<QueryRequest> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn renames(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().renames.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn probed_hosts(&self) -> Vec<String> {
        self.state.lock().unwrap().probed_hosts.clone()
    }

    pub fn ingests(&self) -> Vec<String> {
        self.state.lock().unwrap().ingests.clone()
    }

    /// Number of times `GET /conversations` would have been issued
    pub fn list_call_count(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    /// Sender feeding the most recently opened query stream
    pub fn stream_sender(&self) -> Option<mpsc::UnboundedSender<StreamEvent>> {
        self.state.lock().unwrap().open_senders.last().cloned()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn health(&self) -> HealthState {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .health
            .unwrap_or(HealthState::Offline)
    }

    async fn probe_health(&self, host: &str) -> HealthState {
        self.state
            .lock()
            .unwrap()
            .probed_hosts
            .push(host.to_string());
        self.health().await
    }

    async fn open_query(&self, request: QueryRequest) -> Result<QueryStream> {
        let script = {
            let mut state = self.state.lock().unwrap();
            if state.fail_query {
                return Err(RaglineError::Transport("connection refused".into()).into());
            }
            state.queries.push(request);
            state
                .query_scripts
                .pop_front()
                .unwrap_or_else(|| vec![StreamEvent::End])
        };

        let (tx, rx) = mpsc::unbounded_channel();
        for event in script {
            let _ = tx.send(event);
        }
        // Keep the sender alive so scripts without a terminal event leave
        // the stream open, and so tests can feed more events later.
        self.state.lock().unwrap().open_senders.push(tx);
        Ok(QueryStream {
            events: rx,
            cancel: CancellationToken::new(),
        })
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.fail_listing {
            return Err(RaglineError::Transport("connection refused".into()).into());
        }
        Ok(state.conversations.clone())
    }

    async fn fetch_conversation(&self, id: &str) -> Result<Conversation> {
        self.state
            .lock()
            .unwrap()
            .details
            .get(id)
            .cloned()
            .ok_or_else(|| {
                RaglineError::Backend {
                    status: 404,
                    message: format!("conversation {} not found", id),
                }
                .into()
            })
    }

    async fn rename_conversation(&self, id: &str, title: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .renames
            .push((id.to_string(), title.to_string()));
        Ok(())
    }

    async fn delete_conversation(&self, id: &str) -> Result<()> {
        self.state.lock().unwrap().deletes.push(id.to_string());
        Ok(())
    }

    async fn ingest_local(&self, repo_path: &str) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .ingests
            .push(format!("local:{}", repo_path));
        Ok("Ingestion started".to_string())
    }

    async fn ingest_git(&self, repo_url: &str, _local_dir: &str, branch: &str) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .ingests
            .push(format!("git:{}@{}", repo_url, branch));
        Ok("Ingestion started".to_string())
    }

    fn base_url(&self) -> String {
        self.state
            .lock()
            .unwrap()
            .base_url
            .clone()
            .unwrap_or_else(|| "http://scripted".to_string())
    }

    fn set_base_url(&self, host: String) {
        self.state.lock().unwrap().base_url = Some(host);
    }
}

/// In-memory [`SettingsStore`] for tests
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: Mutex<PanelSettings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<PanelSettings> {
        Ok(self.settings.lock().unwrap().clone())
    }

    fn save(&self, settings: &PanelSettings) -> Result<()> {
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }
}
