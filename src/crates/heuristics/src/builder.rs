use aml_primitives::{DetectionConfig, GraphError, MatchedPair, Transaction, TransactionGraph};
use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Both hops: sender -> intermediate -> receiver.
    Layering,
    /// Only the lead hop, sender -> intermediate.
    LeadOnly,
}

impl BuildMode {
    pub fn from_config(config: &DetectionConfig) -> Self {
        if config.demo {
            BuildMode::LeadOnly
        } else {
            BuildMode::Layering
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub pairs_applied: usize,
    pub failures: usize,
    pub accounts_created: usize,
    pub edges_created: usize,
}

/// Materializes matched pairs as weighted SEND edges.
pub struct GraphBuilder {
    mode: BuildMode,
}

impl GraphBuilder {
    pub fn new(mode: BuildMode) -> Self {
        Self { mode }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(BuildMode::from_config(config))
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Applies both hops of `pair` or neither.
    pub fn apply_pair(
        &self,
        graph: &mut TransactionGraph,
        pair: &MatchedPair,
    ) -> Result<(), GraphError> {
        let hops: Vec<&Transaction> = match self.mode {
            BuildMode::Layering => vec![&pair.lead, &pair.follow],
            BuildMode::LeadOnly => vec![&pair.lead],
        };

        // Both hops land on the same edge only for a self-loop chain.
        let same_edge = hops.len() == 2
            && hops[0].sender == hops[1].sender
            && hops[0].receiver == hops[1].receiver;
        if same_edge {
            graph.check_headroom(hops[0].sender, hops[0].receiver, 2)?;
        } else {
            for hop in &hops {
                graph.check_headroom(hop.sender, hop.receiver, 1)?;
            }
        }

        for hop in hops {
            graph.record_send(hop)?;
        }
        Ok(())
    }

    /// Applies every pair in order. Failing pairs are logged and skipped.
    pub fn build(&self, graph: &mut TransactionGraph, pairs: &[MatchedPair]) -> BuildOutcome {
        let accounts_before = graph.account_count();
        let edges_before = graph.edge_count();
        let mut outcome = BuildOutcome::default();

        for pair in pairs {
            match self.apply_pair(graph, pair) {
                Ok(()) => outcome.pairs_applied += 1,
                Err(e) => {
                    warn!("skipping pair {}: {}", pair, e);
                    outcome.failures += 1;
                }
            }
        }

        outcome.accounts_created = graph.account_count() - accounts_before;
        outcome.edges_created = graph.edge_count() - edges_before;
        info!(
            "graph built from {} pairs ({:?}): {} accounts, {} edges, {} failed pairs",
            outcome.pairs_applied,
            self.mode,
            graph.account_count(),
            graph.edge_count(),
            outcome.failures
        );
        outcome
    }
}
