use std::cmp::Ordering;

use aml_primitives::{AccountId, DetectionConfig, GraphError, NeighborhoodIndex, TransactionGraph};
use log::{debug, info};

/// `2·out·in / (out² + in²)`. 1.0 when the flows are equal, `None` when
/// either side is empty.
pub fn balance_ratio(outbound: u64, inbound: u64) -> Option<f64> {
    if outbound == 0 || inbound == 0 {
        return None;
    }
    let (out, inc) = (outbound as f64, inbound as f64);
    Some((2.0 * out * inc) / (out * out + inc * inc))
}

/// Balance ratio scaled by `log10(min(out, in))`, or 0 when either side is empty.
pub fn balance_score(outbound: u64, inbound: u64) -> f64 {
    match balance_ratio(outbound, inbound) {
        Some(ratio) => ratio * (outbound.min(inbound) as f64).log10(),
        None => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceScore {
    pub account: AccountId,
    pub inbound: u64,
    pub outbound: u64,
    pub score: f64,
}

impl BalanceScore {
    pub fn is_candidate(&self, config: &DetectionConfig) -> bool {
        self.inbound > 0 && self.outbound > 0 && self.score >= config.degree_constant
    }

    /// Score descending, then account id ascending.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.account.cmp(&other.account))
    }
}

pub struct BalanceScorer<'c> {
    config: &'c DetectionConfig,
}

impl<'c> BalanceScorer<'c> {
    pub fn new(config: &'c DetectionConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, graph: &TransactionGraph, account: AccountId) -> BalanceScore {
        let inbound = graph.predecessors(account).total_weight();
        let outbound = graph.successors(account).total_weight();
        BalanceScore {
            account,
            inbound,
            outbound,
            score: balance_score(outbound, inbound),
        }
    }

    /// Scores every account, records the result on the graph and returns the
    /// candidates in rank order.
    pub fn select(&self, graph: &mut TransactionGraph) -> Result<Vec<BalanceScore>, GraphError> {
        let ids: Vec<AccountId> = graph.account_ids().collect();
        let mut candidates = Vec::new();
        for id in ids {
            let score = self.score(graph, id);
            graph.set_balance(id, score.inbound, score.outbound, score.score)?;
            if score.is_candidate(self.config) {
                debug!(
                    "candidate {} in={} out={} B={:.4}",
                    id, score.inbound, score.outbound, score.score
                );
                candidates.push(score);
            }
        }
        candidates.sort_by(BalanceScore::rank);
        info!(
            "{} of {} accounts reach balance score {}",
            candidates.len(),
            graph.account_count(),
            self.config.degree_constant
        );
        Ok(candidates)
    }
}
