//! Term-overlap re-ranker.
//!
//! A cheap lexical second opinion on vector search: candidates are scored
//! by how many distinct query terms they contain, with a small bonus for
//! repeated mentions. Short stopwords are ignored so "the" and "of" do not
//! decide the order.

use async_trait::async_trait;
use docuroute_core::error::RetrievalError;
use docuroute_core::retrieval::{RerankScore, Reranker};
use std::collections::{HashMap, HashSet};

use crate::embedding::tokenize;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of",
    "on", "or", "that", "the", "this", "to", "was", "what", "when", "where", "which", "who",
    "with",
];

/// Weight of term frequency relative to coverage.
const FREQUENCY_WEIGHT: f32 = 0.1;

fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    tokenize(text).filter(|t| !STOPWORDS.contains(&t.as_str()))
}

/// Scores candidates by query term coverage.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermOverlapReranker;

impl TermOverlapReranker {
    pub fn new() -> Self {
        Self
    }

    /// Score one candidate: covered fraction of query terms plus a damped frequency bonus.
    pub fn score(query_terms: &HashSet<String>, candidate: &str) -> f32 {
        if query_terms.is_empty() {
            return 0.0;
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for term in terms(candidate) {
            if query_terms.contains(&term) {
                *counts.entry(term).or_default() += 1;
            }
        }

        let coverage = counts.len() as f32 / query_terms.len() as f32;
        let frequency: f32 = counts.values().map(|&n| (n as f32).ln_1p()).sum::<f32>()
            / query_terms.len() as f32;
        coverage + FREQUENCY_WEIGHT * frequency
    }
}

#[async_trait]
impl Reranker for TermOverlapReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
    ) -> Result<Vec<RerankScore>, RetrievalError> {
        let query_terms: HashSet<String> = terms(query).collect();
        Ok(candidates
            .iter()
            .enumerate()
            .map(|(index, text)| RerankScore {
                index,
                score: Self::score(&query_terms, text),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_coverage_beats_partial() {
        let candidates = vec![
            "Rent is paid monthly".to_string(),
            "The lease termination date is 2025".to_string(),
            "Early termination requires notice".to_string(),
        ];
        let scores = TermOverlapReranker
            .rerank("What is the lease termination date?", &candidates)
            .await
            .unwrap();

        assert_eq!(scores.len(), 3);
        assert!(scores[1].score > scores[2].score);
        assert!(scores[2].score > scores[0].score);
        assert_eq!(scores[0].score, 0.0);
    }

    #[tokio::test]
    async fn stopword_only_query_scores_zero() {
        let scores = TermOverlapReranker
            .rerank("what is the", &["the answer is here".to_string()])
            .await
            .unwrap();
        assert_eq!(scores[0].score, 0.0);
    }

    #[test]
    fn repeated_terms_add_a_small_bonus() {
        let query: HashSet<String> = terms("termination").collect();
        let once = TermOverlapReranker::score(&query, "termination clause");
        let twice = TermOverlapReranker::score(&query, "termination and termination fee");
        assert!(twice > once);
        assert!(twice - once < 0.5);
    }

    #[tokio::test]
    async fn empty_candidates() {
        let scores = TermOverlapReranker.rerank("anything", &[]).await.unwrap();
        assert!(scores.is_empty());
    }
}
