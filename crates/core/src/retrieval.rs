//! Retrieval collaborators — chunk index, document stores, re-ranker.
//!
//! A chunk index returns scored [`ChunkRecord`]s. Chunks may point at a
//! larger parent span or at a summary of the whole document they came
//! from; the fused retriever resolves those pointers through
//! [`DocumentStore`]s and produces [`ResolvedDocument`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// Default relevance/diversity trade-off for MMR.
pub const DEFAULT_MMR_LAMBDA: f32 = 0.5;

/// A scored chunk as produced by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique chunk ID
    pub id: String,

    /// Raw chunk text
    pub text: String,

    /// Relevance score (higher is better)
    #[serde(default)]
    pub score: f32,

    /// Key of the larger parent span this chunk was cut from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Key of the whole-document summary, set only for documents small enough to summarize
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_id: Option<String>,
}

impl ChunkRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            score: 0.0,
            parent_id: None,
            summary_id: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_summary(mut self, summary_id: impl Into<String>) -> Self {
        self.summary_id = Some(summary_id.into());
        self
    }
}

/// How the chunk index ranks candidates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchMode {
    /// Pure similarity ranking.
    Similarity,
    /// Maximal marginal relevance with relevance weight `lambda` in [0, 1].
    Mmr { lambda: f32 },
}

impl SearchMode {
    pub fn mmr() -> Self {
        Self::Mmr { lambda: DEFAULT_MMR_LAMBDA }
    }
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::mmr()
    }
}

/// Which granularity a resolved document ended up at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Whole-document summary
    Summary,
    /// Parent span around the chunk
    Parent,
    /// The raw chunk itself
    Chunk,
}

/// A chunk after summary/parent substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDocument {
    /// Key of the text source: the summary id, the parent id, or the chunk id
    pub source_id: String,

    /// Resolved text
    pub text: String,

    pub resolution: Resolution,

    /// The chunk that matched the query
    pub chunk_id: String,

    /// Score of the matching chunk (re-ranker score when one ran)
    pub score: f32,
}

/// One re-ranker verdict: which candidate, and how relevant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankScore {
    /// Index into the candidate slice passed to `rerank`
    pub index: usize,
    pub score: f32,
}

/// A similarity index over document chunks.
#[async_trait]
pub trait ChunkIndex: Send + Sync {
    /// Return up to `k` chunks ordered by the given mode, best first.
    async fn search(
        &self,
        query: &str,
        k: usize,
        mode: SearchMode,
    ) -> std::result::Result<Vec<ChunkRecord>, RetrievalError>;
}

/// Key/value lookup of previously stored texts (summaries, parent spans).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The store name, for logs.
    fn name(&self) -> &str;

    /// Fetch the text stored under `id`, or `None` if absent.
    async fn get(&self, id: &str) -> std::result::Result<Option<String>, RetrievalError>;
}

/// A secondary relevance scorer applied to a shortlist.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score the candidates against the query. The returned subset may be in any order.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
    ) -> std::result::Result<Vec<RerankScore>, RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_mode_defaults_to_mmr_half() {
        assert_eq!(SearchMode::default(), SearchMode::Mmr { lambda: 0.5 });
    }

    #[test]
    fn search_mode_serialization() {
        let json = serde_json::to_string(&SearchMode::Mmr { lambda: 0.3 }).unwrap();
        assert!(json.contains(r#""type":"mmr""#));
        let parsed: SearchMode = serde_json::from_str(r#"{"type":"similarity"}"#).unwrap();
        assert_eq!(parsed, SearchMode::Similarity);
    }

    #[test]
    fn chunk_record_builders() {
        let chunk = ChunkRecord::new("c1", "Term ends 2025")
            .with_score(0.8)
            .with_parent("p1")
            .with_summary("s1");
        assert_eq!(chunk.parent_id.as_deref(), Some("p1"));
        assert_eq!(chunk.summary_id.as_deref(), Some("s1"));
        assert!((chunk.score - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn chunk_record_optional_ids_deserialize() {
        let chunk: ChunkRecord = serde_json::from_str(r#"{"id":"c","text":"t"}"#).unwrap();
        assert!(chunk.parent_id.is_none());
        assert!(chunk.summary_id.is_none());
        assert_eq!(chunk.score, 0.0);
    }
}
