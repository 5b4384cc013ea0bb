pub mod balance;
pub mod builder;
pub mod matcher;
pub mod merger;
pub mod similarity;

pub use balance::{BalanceScore, BalanceScorer, balance_ratio, balance_score};
pub use builder::{BuildMode, BuildOutcome, GraphBuilder};
pub use matcher::TransactionMatcher;
pub use merger::{GroupMerger, MergeOutcome};
pub use similarity::{Similarity, SimilarityEngine, neighborhood_term, structural_similarity};

#[cfg(test)]
mod tests;
