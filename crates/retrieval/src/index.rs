//! In-memory chunk index — brute-force vector search over embedded chunks.

use async_trait::async_trait;
use docuroute_core::error::RetrievalError;
use docuroute_core::retrieval::{ChunkIndex, ChunkRecord, SearchMode};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::embedding::Embedder;
use crate::vector::{maximal_marginal_relevance, rank_by_similarity};

/// Minimum shortlist MMR diversifies over, before it picks `k`.
const MMR_MIN_FETCH: usize = 20;

struct IndexedChunk {
    record: ChunkRecord,
    embedding: Vec<f32>,
}

/// Chunks and their embeddings held in a Vec.
/// Suits docsets of a few thousand chunks loaded at startup.
pub struct InMemoryChunkIndex {
    embedder: Arc<dyn Embedder>,
    entries: Arc<RwLock<Vec<IndexedChunk>>>,
}

impl InMemoryChunkIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Embed and add chunks. Returns how many were added.
    pub async fn add(&self, chunks: Vec<ChunkRecord>) -> Result<usize, RetrievalError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(RetrievalError::EmbeddingFailed(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut entries = self.entries.write().await;
        let added = chunks.len();
        entries.extend(
            chunks
                .into_iter()
                .zip(embeddings)
                .map(|(record, embedding)| IndexedChunk { record, embedding }),
        );
        debug!(added, total = entries.len(), "Indexed chunks");
        Ok(added)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ChunkIndex for InMemoryChunkIndex {
    async fn search(
        &self,
        query: &str,
        k: usize,
        mode: SearchMode,
    ) -> Result<Vec<ChunkRecord>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RetrievalError::Search(e.to_string()))?;

        let entries = self.entries.read().await;
        let embeddings: Vec<Vec<f32>> = entries.iter().map(|e| e.embedding.clone()).collect();

        let picks = match mode {
            SearchMode::Similarity => rank_by_similarity(&query_embedding, &embeddings, k),
            SearchMode::Mmr { lambda } => {
                let shortlist = rank_by_similarity(&query_embedding, &embeddings, k.max(MMR_MIN_FETCH));
                let shortlist_embeddings: Vec<Vec<f32>> = shortlist
                    .iter()
                    .map(|(i, _)| embeddings[*i].clone())
                    .collect();
                maximal_marginal_relevance(&query_embedding, &shortlist_embeddings, k, lambda)
                    .into_iter()
                    .map(|(j, score)| (shortlist[j].0, score))
                    .collect()
            }
        };

        Ok(picks
            .into_iter()
            .map(|(i, score)| entries[i].record.clone().with_score(score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::TokenHashEmbedder;

    async fn index_with(chunks: Vec<ChunkRecord>) -> InMemoryChunkIndex {
        let index = InMemoryChunkIndex::new(Arc::new(TokenHashEmbedder::new(128)));
        index.add(chunks).await.unwrap();
        index
    }

    /// Drops the last vector of every batch.
    struct ShortBatchEmbedder;

    #[async_trait]
    impl Embedder for ShortBatchEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
        }
    }

    #[tokio::test]
    async fn short_embedding_batch_is_rejected() {
        let index = InMemoryChunkIndex::new(Arc::new(ShortBatchEmbedder));
        let err = index
            .add(vec![ChunkRecord::new("c1", "one"), ChunkRecord::new("c2", "two")])
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::EmbeddingFailed(_)));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn add_and_count() {
        let index = index_with(vec![
            ChunkRecord::new("c1", "Lease starts in 2020"),
            ChunkRecord::new("c2", "Rent is due monthly"),
        ])
        .await;
        assert_eq!(index.len().await, 2);
        assert!(!index.is_empty().await);
    }

    #[tokio::test]
    async fn similarity_search_ranks_matching_chunk_first() {
        let index = index_with(vec![
            ChunkRecord::new("rent", "Rent is due on the first of each month"),
            ChunkRecord::new("term", "The lease termination date is March 31 2025"),
            ChunkRecord::new("pets", "No pets are allowed on the premises"),
        ])
        .await;

        let results = index
            .search("lease termination date", 2, SearchMode::Similarity)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "term");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn search_keeps_parent_and_summary_ids() {
        let index = index_with(vec![ChunkRecord::new("c1", "termination clause")
            .with_parent("p1")
            .with_summary("s1")])
        .await;
        let results = index.search("termination", 1, SearchMode::mmr()).await.unwrap();
        assert_eq!(results[0].parent_id.as_deref(), Some("p1"));
        assert_eq!(results[0].summary_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn mmr_search_skips_duplicates() {
        let index = index_with(vec![
            ChunkRecord::new("a", "lease termination date march"),
            ChunkRecord::new("b", "lease termination date march"),
            ChunkRecord::new("c", "lease renewal option"),
        ])
        .await;

        let results = index
            .search("lease termination date", 2, SearchMode::Mmr { lambda: 0.5 })
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn zero_k_and_empty_index_return_nothing() {
        let index = index_with(vec![ChunkRecord::new("a", "text")]).await;
        assert!(index.search("text", 0, SearchMode::Similarity).await.unwrap().is_empty());

        let empty = InMemoryChunkIndex::new(Arc::new(TokenHashEmbedder::default()));
        assert!(empty.search("text", 3, SearchMode::mmr()).await.unwrap().is_empty());
    }
}
