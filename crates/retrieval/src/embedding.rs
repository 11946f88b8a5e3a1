//! Text embedders used by the in-memory chunk index.
//!
//! `TokenHashEmbedder` is deterministic and offline: every token is hashed
//! into a fixed number of signed buckets. `ProviderEmbedder` delegates to an
//! LLM provider's embeddings endpoint.

use async_trait::async_trait;
use docuroute_core::error::RetrievalError;
use docuroute_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;

/// Turns text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;

    /// Embed many texts. The default embeds them one at a time.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a64(s: &str) -> u64 {
    let mut h: u64 = 14695981039346656037;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(1099511628211);
    }
    h
}

/// Feature-hashing embedder over lowercase word tokens.
#[derive(Debug, Clone)]
pub struct TokenHashEmbedder {
    dimensions: usize,
}

impl TokenHashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Synchronous embedding; the vector is L2-normalized unless empty.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let h = fnv1a64(&token);
            let idx = (h % self.dimensions as u64) as usize;
            let sign = if (h >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }
}

impl Default for TokenHashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for TokenHashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        Ok(self.embed_text(text))
    }
}

/// Embeddings from a provider's `/embeddings` endpoint.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("provider returned no embedding".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != texts.len() {
            return Err(RetrievalError::EmbeddingFailed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;
    use docuroute_core::error::ProviderError;
    use docuroute_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    #[test]
    fn tokenize_lowercases_and_splits_punctuation() {
        let tokens: Vec<String> = tokenize("Lease TERMINATES on 2025-03-31.").collect();
        assert_eq!(tokens, vec!["lease", "terminates", "on", "2025", "03", "31"]);
    }

    #[test]
    fn hash_embedding_is_deterministic_and_normalized() {
        let embedder = TokenHashEmbedder::new(64);
        let a = embedder.embed_text("termination date of the lease");
        let b = embedder.embed_text("termination date of the lease");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hash_embedding_of_empty_text_is_zero() {
        let v = TokenHashEmbedder::new(16).embed_text("  ...  ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_tokens_raise_similarity() {
        let embedder = TokenHashEmbedder::default();
        let query = embedder.embed_text("lease termination date");
        let related = embedder.embed_text("the lease termination date is March 2025");
        let unrelated = embedder.embed_text("quarterly revenue grew in europe");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    struct FixedEmbeddings(Vec<Vec<f32>>);

    #[async_trait]
    impl Provider for FixedEmbeddings {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("completions".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: self.0.iter().take(request.inputs.len()).cloned().collect(),
                model: request.model,
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn provider_embedder_returns_vectors() {
        let embedder = ProviderEmbedder::new(
            Arc::new(FixedEmbeddings(vec![vec![0.1, 0.2], vec![0.3, 0.4]])),
            "text-embedding-3-small",
        );
        let batch = embedder.embed_batch(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(batch, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        assert_eq!(embedder.embed("a").await.unwrap(), vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn provider_embedder_rejects_short_responses() {
        let embedder = ProviderEmbedder::new(Arc::new(FixedEmbeddings(vec![vec![1.0]])), "m");
        let err = embedder.embed_batch(&["a".into(), "b".into()]).await.unwrap_err();
        assert!(matches!(err, RetrievalError::EmbeddingFailed(_)));
    }

    #[tokio::test]
    async fn provider_without_embeddings_fails_cleanly() {
        struct NoEmbed;
        #[async_trait]
        impl Provider for NoEmbed {
            fn name(&self) -> &str {
                "none"
            }
            async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
                Err(ProviderError::NotConfigured("x".into()))
            }
        }
        let err = ProviderEmbedder::new(Arc::new(NoEmbed), "m").embed("q").await.unwrap_err();
        assert!(err.to_string().contains("does not support embeddings"));
    }
}
