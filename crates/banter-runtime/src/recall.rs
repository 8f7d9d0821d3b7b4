//! Semantic recall: the [`VectorIndex`] fed by an [`EmbeddingService`].
//!
//! Embedding failures degrade recall only.  `add` logs and stores nothing,
//! `search` returns no hits; neither ever surfaces an error.

use std::sync::Arc;
use std::time::Duration;

use banter_memory::VectorIndex;
use banter_types::Event;
use tracing::{debug, warn};

use crate::embedder::{EmbedError, EmbeddingService};

pub struct SemanticRecall {
    embedder: Arc<dyn EmbeddingService>,
    index: VectorIndex,
    timeout: Duration,
}

impl SemanticRecall {
    pub fn new(embedder: Arc<dyn EmbeddingService>, index: VectorIndex, timeout: Duration) -> Self {
        Self {
            embedder,
            index,
            timeout,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        tokio::time::timeout(self.timeout, self.embedder.embed(text))
            .await
            .map_err(|_| EmbedError::Timeout)?
    }

    /// Embed `event` and index it.  Returns the vector for persistence.
    pub async fn add(&self, event: Arc<Event>) -> Option<Vec<f32>> {
        match self.embed(&event.embedding_text()).await {
            Ok(vector) => {
                self.index.insert(event, vector.clone());
                Some(vector)
            }
            Err(e) => {
                warn!(author_id = event.author_id, error = %e, "embedding failed, event not indexed");
                None
            }
        }
    }

    /// Up to `k` indexed events most similar to `query`.
    pub async fn search(&self, query: &str, k: usize) -> Vec<Arc<Event>> {
        if k == 0 || self.index.is_empty() {
            return Vec::new();
        }
        match self.embed(query).await {
            Ok(vector) => {
                let hits = self.index.search(&vector, k);
                debug!(hits = hits.len(), "semantic recall");
                hits.into_iter().map(|(event, _)| event).collect()
            }
            Err(e) => {
                warn!(error = %e, "embedding failed, recall skipped");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
