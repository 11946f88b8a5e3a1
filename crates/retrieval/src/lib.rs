//! Retrieval for docuroute: chunk search, document stores, re-ranking,
//! and the fused summary retriever that ties them together.

pub mod vector;
pub mod embedding;
pub mod index;
pub mod store;
pub mod sqlite;
pub mod rerank;
pub mod fused;
pub mod docset;

pub use vector::{cosine_similarity, descending, maximal_marginal_relevance, rank_by_similarity};
pub use embedding::{Embedder, ProviderEmbedder, TokenHashEmbedder};
pub use index::InMemoryChunkIndex;
pub use store::InMemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use rerank::TermOverlapReranker;
pub use fused::{FusedSummaryRetriever, RetrieverConfig};
pub use docset::{Docset, DocsetChunk};
