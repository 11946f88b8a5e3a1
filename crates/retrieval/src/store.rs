//! In-memory document store — summaries and parent spans keyed by id.

use async_trait::async_trait;
use docuroute_core::error::RetrievalError;
use docuroute_core::retrieval::DocumentStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A key/value store held in a HashMap.
pub struct InMemoryDocumentStore {
    name: String,
    documents: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryDocumentStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Build a store pre-filled with `documents`.
    pub fn from_map(name: impl Into<String>, documents: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// Insert or replace the text stored under `id`.
    pub async fn put(&self, id: impl Into<String>, text: impl Into<String>) {
        self.documents.write().await.insert(id.into(), text.into());
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, id: &str) -> Result<Option<String>, RetrievalError> {
        Ok(self.documents.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_and_get() {
        let store = InMemoryDocumentStore::new("summaries");
        store.put("doc-a", "Summary of lease A").await;
        assert_eq!(store.get("doc-a").await.unwrap().as_deref(), Some("Summary of lease A"));
        assert!(store.get("doc-b").await.unwrap().is_none());
        assert_eq!(store.name(), "summaries");
    }

    #[tokio::test]
    async fn put_replaces_existing_text() {
        let store = InMemoryDocumentStore::new("parents");
        store.put("p1", "old").await;
        store.put("p1", "new").await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("p1").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn from_map_prefills() {
        let store = InMemoryDocumentStore::from_map(
            "parents",
            HashMap::from([("p1".to_string(), "Parent one".to_string())]),
        );
        assert!(!store.is_empty().await);
        assert_eq!(store.get("p1").await.unwrap().as_deref(), Some("Parent one"));
    }
}
