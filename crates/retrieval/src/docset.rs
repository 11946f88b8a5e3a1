//! Docset files — a named, pre-chunked document collection on disk.
//!
//! ```json
//! {
//!   "name": "Leases",
//!   "description": "Commercial lease agreements",
//!   "chunks": [{"id": "a1", "text": "...", "parent_id": "doc-a", "summary_id": "doc-a"}],
//!   "summaries": {"doc-a": "..."},
//!   "parents": {"doc-a": "..."}
//! }
//! ```

use docuroute_core::error::RetrievalError;
use docuroute_core::retrieval::ChunkRecord;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::embedding::Embedder;
use crate::index::InMemoryChunkIndex;
use crate::sqlite::SqliteDocumentStore;
use crate::store::InMemoryDocumentStore;

/// One chunk as written in a docset file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocsetChunk {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_id: Option<String>,
}

impl From<DocsetChunk> for ChunkRecord {
    fn from(chunk: DocsetChunk) -> Self {
        ChunkRecord {
            id: chunk.id,
            text: chunk.text,
            score: 0.0,
            parent_id: chunk.parent_id,
            summary_id: chunk.summary_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Docset {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub chunks: Vec<DocsetChunk>,

    /// Whole-document summaries keyed by summary id
    #[serde(default)]
    pub summaries: HashMap<String, String>,

    /// Parent spans keyed by parent id
    #[serde(default)]
    pub parents: HashMap<String, String>,
}

impl Docset {
    /// Read and validate a docset file.
    pub async fn load(path: &Path) -> Result<Self, RetrievalError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            RetrievalError::InvalidDocset(format!("cannot read {}: {e}", path.display()))
        })?;
        let docset = Self::from_json(&content)?;
        info!(
            docset = %docset.name,
            chunks = docset.chunks.len(),
            summaries = docset.summaries.len(),
            parents = docset.parents.len(),
            "Loaded docset from {}",
            path.display()
        );
        Ok(docset)
    }

    pub fn from_json(content: &str) -> Result<Self, RetrievalError> {
        let docset: Self = serde_json::from_str(content)
            .map_err(|e| RetrievalError::InvalidDocset(e.to_string()))?;
        docset.validate()?;
        Ok(docset)
    }

    /// Non-empty name, at least one chunk, unique chunk ids.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.name.trim().is_empty() {
            return Err(RetrievalError::InvalidDocset("docset name is empty".into()));
        }
        if self.chunks.is_empty() {
            return Err(RetrievalError::InvalidDocset(format!(
                "docset '{}' has no chunks",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for chunk in &self.chunks {
            if chunk.id.is_empty() {
                return Err(RetrievalError::InvalidDocset("chunk with empty id".into()));
            }
            if !seen.insert(chunk.id.as_str()) {
                return Err(RetrievalError::InvalidDocset(format!(
                    "duplicate chunk id '{}'",
                    chunk.id
                )));
            }
        }
        Ok(())
    }

    pub fn chunk_records(&self) -> Vec<ChunkRecord> {
        self.chunks.iter().cloned().map(ChunkRecord::from).collect()
    }

    /// Embed every chunk into a fresh in-memory index.
    pub async fn build_index(&self, embedder: Arc<dyn Embedder>) -> Result<InMemoryChunkIndex, RetrievalError> {
        let index = InMemoryChunkIndex::new(embedder);
        index.add(self.chunk_records()).await?;
        Ok(index)
    }

    pub fn summary_store(&self) -> InMemoryDocumentStore {
        InMemoryDocumentStore::from_map(format!("{}-summaries", self.name), self.summaries.clone())
    }

    pub fn parent_store(&self) -> InMemoryDocumentStore {
        InMemoryDocumentStore::from_map(format!("{}-parents", self.name), self.parents.clone())
    }

    /// Write summaries and parents into SQLite stores. Returns the number of rows written.
    pub async fn persist(
        &self,
        summaries: &SqliteDocumentStore,
        parents: &SqliteDocumentStore,
    ) -> Result<usize, RetrievalError> {
        let written = summaries
            .put_many(self.summaries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .await?
            + parents
                .put_many(self.parents.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .await?;
        info!(docset = %self.name, written, "Persisted docset documents");
        Ok(written)
    }
}
