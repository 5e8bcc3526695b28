//! Client-side view of the server-owned conversation list
//!
//! The cache is never authoritative: every refresh discards the whole view
//! and refetches it, and mutating operations go through the backend first
//! and re-synchronize afterwards. There is no incremental patching.

use crate::api::{ConversationSummary, Transport};
use crate::error::Result;

/// Always-refetched projection of the backend's conversation list
#[derive(Debug, Default)]
pub struct ConversationListCache {
    entries: Vec<ConversationSummary>,
}

impl ConversationListCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Refetch the full list and replace the cached view wholesale
    ///
    /// # Errors
    ///
    /// Returns the transport/backend error unchanged; the previous view is
    /// kept on failure.
    pub async fn refresh<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Result<&[ConversationSummary]> {
        let entries = transport.list_conversations().await?;
        tracing::debug!("conversation list refreshed: {} entries", entries.len());
        self.entries = entries;
        Ok(&self.entries)
    }

    /// Current cached view
    pub fn entries(&self) -> &[ConversationSummary] {
        &self.entries
    }

    /// Look up a cached entry by id
    pub fn find(&self, id: &str) -> Option<&ConversationSummary> {
        self.entries.iter().find(|c| c.id == id)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no conversations are cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
