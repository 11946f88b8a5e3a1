//! Fused summary retrieval.
//!
//! Vector search finds the best matching chunks; each chunk is then upgraded
//! to the most informative text available for it:
//!
//! 1. the summary of its whole document, when one was stored,
//! 2. otherwise the parent span it was cut from,
//! 3. otherwise the chunk itself.
//!
//! Several chunks from the same document collapse into one result.

use chrono::Utc;
use docuroute_core::error::RetrievalError;
use docuroute_core::event::{DomainEvent, EventBus};
use docuroute_core::retrieval::{
    ChunkIndex, ChunkRecord, DocumentStore, Reranker, Resolution, ResolvedDocument, SearchMode,
};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::vector::descending;

/// Knobs of the fused retriever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrieverConfig {
    /// Documents returned per query
    pub k: usize,

    /// Raw candidates fetched per returned document (at least 1)
    pub overfetch_factor: usize,

    pub search_mode: SearchMode,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            k: 4,
            overfetch_factor: 3,
            search_mode: SearchMode::mmr(),
        }
    }
}

impl RetrieverConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_overfetch_factor(mut self, factor: usize) -> Self {
        self.overfetch_factor = factor;
        self
    }

    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }
}

/// Retriever combining chunk search, optional re-ranking, and summary/parent substitution.
pub struct FusedSummaryRetriever {
    index: Arc<dyn ChunkIndex>,
    summary_store: Option<Arc<dyn DocumentStore>>,
    parent_store: Option<Arc<dyn DocumentStore>>,
    reranker: Option<Arc<dyn Reranker>>,
    event_bus: Option<Arc<EventBus>>,
    config: RetrieverConfig,
}

impl FusedSummaryRetriever {
    pub fn new(index: Arc<dyn ChunkIndex>, config: RetrieverConfig) -> Self {
        Self {
            index,
            summary_store: None,
            parent_store: None,
            reranker: None,
            event_bus: None,
            config,
        }
    }

    pub fn with_summary_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.summary_store = Some(store);
        self
    }

    pub fn with_parent_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.parent_store = Some(store);
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Retrieve up to the configured `k` documents.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ResolvedDocument>, RetrievalError> {
        self.retrieve_k(query, self.config.k).await
    }

    /// Retrieve up to `k` documents for `query`.
    ///
    /// Only a failing vector search is an error; store and re-ranker
    /// failures degrade to the next best option.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<Vec<ResolvedDocument>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let fetch = k.saturating_mul(self.config.overfetch_factor.max(1));
        let candidates = self
            .index
            .search(query, fetch, self.config.search_mode)
            .await?;
        let candidate_count = candidates.len();
        debug!(query, fetch, candidates = candidate_count, "Chunk search complete");

        let ranked = match &self.reranker {
            Some(reranker) => self.rerank(reranker.as_ref(), query, candidates, k).await,
            None => candidates,
        };

        let resolved = join_all(ranked.iter().map(|chunk| self.resolve(chunk))).await;

        // Summary and parent ids name documents; raw chunk ids are a separate namespace.
        let mut seen = HashSet::new();
        let mut documents: Vec<ResolvedDocument> = resolved
            .into_iter()
            .filter(|doc| seen.insert((doc.resolution == Resolution::Chunk, doc.source_id.clone())))
            .collect();
        documents.truncate(k);

        info!(
            candidates = candidate_count,
            returned = documents.len(),
            "Fused retrieval complete"
        );
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::RetrievalCompleted {
                query: query.to_string(),
                candidates: candidate_count,
                returned: documents.len(),
                timestamp: Utc::now(),
            });
        }

        Ok(documents)
    }

    /// Keep the `k` best candidates by re-ranker score. Ties keep search order.
    /// A failing re-ranker leaves the search order untouched.
    async fn rerank(
        &self,
        reranker: &dyn Reranker,
        query: &str,
        candidates: Vec<ChunkRecord>,
        k: usize,
    ) -> Vec<ChunkRecord> {
        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let mut scores = match reranker.rerank(query, &texts).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!(error = %e, "Re-ranking failed, keeping search order");
                if let Some(bus) = &self.event_bus {
                    bus.publish(DomainEvent::ErrorOccurred {
                        context: "rerank".into(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
                return candidates;
            }
        };

        // Stable sorts: index order first, so equal scores keep search order.
        scores.sort_by_key(|s| s.index);
        scores.sort_by(|a, b| descending(a.score, b.score));

        let mut used = HashSet::new();
        scores
            .into_iter()
            .filter(|s| s.index < candidates.len() && used.insert(s.index))
            .take(k)
            .map(|s| candidates[s.index].clone().with_score(s.score))
            .collect()
    }

    async fn resolve(&self, chunk: &ChunkRecord) -> ResolvedDocument {
        let levels = [
            (chunk.summary_id.as_deref(), self.summary_store.as_deref(), Resolution::Summary),
            (chunk.parent_id.as_deref(), self.parent_store.as_deref(), Resolution::Parent),
        ];

        for (id, store, resolution) in levels {
            let (Some(id), Some(store)) = (id, store) else {
                continue;
            };
            match store.get(id).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    return ResolvedDocument {
                        source_id: id.to_string(),
                        text,
                        resolution,
                        chunk_id: chunk.id.clone(),
                        score: chunk.score,
                    };
                }
                Ok(_) => {
                    debug!(store = store.name(), id, chunk = %chunk.id, "No stored text, falling back");
                }
                Err(e) => {
                    warn!(store = store.name(), id, error = %e, "Store lookup failed, falling back");
                }
            }
        }

        ResolvedDocument {
            source_id: chunk.id.clone(),
            text: chunk.text.clone(),
            resolution: Resolution::Chunk,
            chunk_id: chunk.id.clone(),
            score: chunk.score,
        }
    }
}
