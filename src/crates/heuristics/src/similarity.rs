//! SHRINK-style structural similarity.
//!
//! Two accounts are similar when they receive from the same accounts and pay
//! out to the same accounts, with comparable weights. For one direction the
//! term is the weighted overlap of the two neighborhoods normalised by their
//! weight norms:
//!
//! ```text
//! term(u, v) = Σ_{x ∈ N(u) ∩ N(v)} w(x,u)·w(x,v)
//!              / (sqrt(Σ w(x,u)² + 1) · sqrt(Σ w(x,v)² + 1))
//! ```
//!
//! and the similarity is the product of the predecessor and successor terms,
//! so both sides must overlap.

use aml_primitives::{AccountId, DensePair, DetectionConfig, Neighborhood, NeighborhoodIndex};
use log::{info, trace};

/// Overlap term for one direction. Non-finite results collapse to 0.
pub fn neighborhood_term(a: Neighborhood<'_>, b: Neighborhood<'_>) -> f64 {
    // Walk the smaller side, probe the larger.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let nominator: f64 = small
        .iter()
        .filter_map(|(x, w_small)| {
            large
                .weight_to(x)
                .map(|w_large| w_small as f64 * w_large as f64)
        })
        .sum();
    if nominator == 0.0 {
        return 0.0;
    }
    let denominator = (a.squared_weight_sum() + 1.0).sqrt() * (b.squared_weight_sum() + 1.0).sqrt();
    let term = nominator / denominator;
    if term.is_finite() { term } else { 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub predecessors: f64,
    pub successors: f64,
}

impl Similarity {
    pub fn score(&self) -> f64 {
        self.predecessors * self.successors
    }
}

pub fn structural_similarity<G: NeighborhoodIndex>(graph: &G, u: AccountId, v: AccountId) -> Similarity {
    Similarity {
        predecessors: neighborhood_term(graph.predecessors(u), graph.predecessors(v)),
        successors: neighborhood_term(graph.successors(u), graph.successors(v)),
    }
}

pub struct SimilarityEngine<'c> {
    config: &'c DetectionConfig,
}

impl<'c> SimilarityEngine<'c> {
    pub fn new(config: &'c DetectionConfig) -> Self {
        Self { config }
    }

    /// Compares every unordered pair of distinct candidates once, in candidate
    /// order, and keeps the pairs at or above the dense-pair threshold.
    pub fn dense_pairs<G: NeighborhoodIndex>(
        &self,
        graph: &G,
        candidates: &[AccountId],
    ) -> Vec<DensePair> {
        let mut dense = Vec::new();
        let mut compared = 0usize;
        for (i, &u) in candidates.iter().enumerate() {
            for &v in &candidates[i + 1..] {
                if u == v {
                    continue;
                }
                compared += 1;
                let similarity = structural_similarity(graph, u, v);
                let score = similarity.score();
                trace!(
                    "similarity {} ~ {}: pred={:.4} succ={:.4} score={:.4}",
                    u, v, similarity.predecessors, similarity.successors, score
                );
                if score >= self.config.dense_pair_constant {
                    dense.push(DensePair::new(u, v, score));
                }
            }
        }
        info!(
            "{} dense pairs from {} comparisons over {} candidates",
            dense.len(),
            compared,
            candidates.len()
        );
        dense
    }
}

#[cfg(test)]
mod tests {
    use aml_primitives::{Transaction, TransactionGraph};

    use super::*;

    fn graph_of(edges: &[(u64, u64, u32)]) -> TransactionGraph {
        let mut graph = TransactionGraph::new();
        let mut id = 0;
        for &(from, to, weight) in edges {
            for _ in 0..weight {
                id += 1;
                graph
                    .record_send(&Transaction::new(id, from, to, 10_000, 1))
                    .unwrap();
            }
        }
        graph
    }

    #[test]
    fn shared_sender_and_receiver() {
        // 1 -> {2, 3} -> 9
        let graph = graph_of(&[(1, 2, 3), (1, 3, 4), (2, 9, 3), (3, 9, 4)]);
        let s = structural_similarity(&graph, AccountId(2), AccountId(3));
        let expected = 12.0 / ((9.0f64 + 1.0).sqrt() * (16.0f64 + 1.0).sqrt());
        assert!((s.predecessors - expected).abs() < 1e-12);
        assert!((s.successors - expected).abs() < 1e-12);
        assert!((s.score() - expected * expected).abs() < 1e-12);
    }

    #[test]
    fn similarity_is_symmetric() {
        let graph = graph_of(&[(1, 2, 2), (1, 3, 5), (4, 3, 1), (2, 9, 7), (3, 9, 1), (3, 8, 2)]);
        let a = structural_similarity(&graph, AccountId(2), AccountId(3));
        let b = structural_similarity(&graph, AccountId(3), AccountId(2));
        assert_eq!(a.score(), b.score());
        assert!(a.score() > 0.0);
    }

    #[test]
    fn no_shared_neighbors_is_zero() {
        let graph = graph_of(&[(1, 2, 5), (3, 4, 5), (2, 9, 5), (4, 8, 5)]);
        assert_eq!(structural_similarity(&graph, AccountId(2), AccountId(4)).score(), 0.0);
        // Shared predecessor only: successor term is zero.
        let graph = graph_of(&[(1, 2, 5), (1, 4, 5), (2, 9, 5), (4, 8, 5)]);
        let s = structural_similarity(&graph, AccountId(2), AccountId(4));
        assert!(s.predecessors > 0.0);
        assert_eq!(s.score(), 0.0);
    }

    #[test]
    fn unknown_accounts_are_zero() {
        let graph = graph_of(&[(1, 2, 1)]);
        assert_eq!(structural_similarity(&graph, AccountId(50), AccountId(51)).score(), 0.0);
    }

    #[test]
    fn dense_pairs_visit_each_pair_once_and_skip_self() {
        let graph = graph_of(&[
            (1, 2, 6),
            (1, 3, 6),
            (1, 4, 6),
            (2, 9, 6),
            (3, 9, 6),
            (4, 9, 6),
            (20, 21, 6),
            (21, 22, 6),
        ]);
        let config = DetectionConfig::default();
        let candidates = [AccountId(2), AccountId(3), AccountId(4), AccountId(21)];
        let pairs = SimilarityEngine::new(&config).dense_pairs(&graph, &candidates);

        let ids: Vec<(AccountId, AccountId)> = pairs.iter().map(|p| (p.first, p.second)).collect();
        assert_eq!(
            ids,
            vec![
                (AccountId(2), AccountId(3)),
                (AccountId(2), AccountId(4)),
                (AccountId(3), AccountId(4)),
            ]
        );
        for pair in &pairs {
            assert_ne!(pair.first, pair.second);
            assert!(pair.similarity >= config.dense_pair_constant);
            assert!(!pair.contains(AccountId(21)));
        }
    }

    #[test]
    fn repeated_candidate_never_pairs_with_itself() {
        let graph = graph_of(&[(1, 2, 6), (1, 3, 6), (2, 9, 6), (3, 9, 6)]);
        let config = DetectionConfig::default();
        let candidates = [AccountId(2), AccountId(2), AccountId(3)];
        let pairs = SimilarityEngine::new(&config).dense_pairs(&graph, &candidates);

        assert!(!pairs.is_empty());
        assert!(pairs.iter().all(|p| p.first != p.second));
        assert!(
            pairs
                .iter()
                .all(|p| (p.first, p.second) == (AccountId(2), AccountId(3)))
        );
    }

    #[test]
    fn threshold_filters_weak_pairs() {
        // Shared neighbors with weight 1 against heavy private edges.
        let graph = graph_of(&[(1, 2, 1), (1, 3, 1), (5, 2, 9), (2, 9, 1), (3, 9, 1), (2, 8, 9)]);
        let config = DetectionConfig::default();
        let s = structural_similarity(&graph, AccountId(2), AccountId(3)).score();
        assert!(s > 0.0 && s < config.dense_pair_constant);
        assert!(
            SimilarityEngine::new(&config)
                .dense_pairs(&graph, &[AccountId(2), AccountId(3)])
                .is_empty()
        );
    }
}
