//! Vector similarity and diversity-aware ranking.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity
//! - Plain similarity ranking
//! - Maximal Marginal Relevance (MMR) selection

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Descending order on scores that treats NaN as the worst possible score.
pub fn descending(a: f32, b: f32) -> std::cmp::Ordering {
    fn key(score: f32) -> f32 {
        if score.is_nan() { f32::NEG_INFINITY } else { score }
    }
    key(b).total_cmp(&key(a))
}

/// Rank candidates by cosine similarity to the query.
///
/// Returns `(index, similarity)` pairs, best first, at most `limit` long.
/// Equal similarities keep candidate order.
pub fn rank_by_similarity(query: &[f32], candidates: &[Vec<f32>], limit: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, cosine_similarity(query, c)))
        .collect();

    scored.sort_by(|a, b| descending(a.1, b.1));
    scored.truncate(limit);
    scored
}

/// Maximal Marginal Relevance — pick `k` candidates balancing relevance and novelty.
///
/// Each round selects the candidate maximizing
/// `lambda · sim(query, c) − (1 − lambda) · max sim(c, selected)`;
/// with nothing selected yet the redundancy term is zero, so the first pick
/// is the most similar candidate. Returns `(index, query similarity)` pairs
/// in selection order. Ties go to the earlier candidate.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    lambda: f32,
) -> Vec<(usize, f32)> {
    let relevance: Vec<f32> = candidates.iter().map(|c| cosine_similarity(query, c)).collect();
    // Highest similarity to anything selected so far, per candidate
    let mut redundancy: Vec<Option<f32>> = vec![None; candidates.len()];
    let mut taken = vec![false; candidates.len()];
    let mut selected = Vec::with_capacity(k.min(candidates.len()));

    while selected.len() < k {
        let mut best: Option<(usize, f32)> = None;
        for (i, &rel) in relevance.iter().enumerate() {
            if taken[i] {
                continue;
            }
            let penalty = redundancy[i].unwrap_or(0.0);
            let score = lambda * rel - (1.0 - lambda) * penalty;
            if best.is_none_or(|(_, s)| descending(score, s).is_lt()) {
                best = Some((i, score));
            }
        }

        let Some((pick, _)) = best else { break };
        taken[pick] = true;
        selected.push((pick, relevance[pick]));

        for (i, slot) in redundancy.iter_mut().enumerate() {
            if taken[i] {
                continue;
            }
            let sim = cosine_similarity(&candidates[i], &candidates[pick]);
            *slot = Some(slot.map_or(sim, |prev| prev.max(sim)));
        }
    }

    selected
}
