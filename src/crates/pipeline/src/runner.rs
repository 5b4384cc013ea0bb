//! The five detection stages run back to back over one [`GraphSession`].
//!
//! - match layering pairs over the transaction list,
//! - build the weighted SEND graph from those pairs,
//! - score every account's balance and keep the candidates,
//! - compare candidates pairwise and keep the dense pairs,
//! - merge dense pairs into groups and label their members.
//!
//! Each stage is timed. The graph is persisted to the session's store, if
//! any, once the last stage has run.

use std::{
    fmt,
    path::Path,
    time::{Duration, Instant},
};

use aml_dataset::{LoadError, NODES_FILE, TRANSACTIONS_FILE, read_nodes, read_transactions};
use aml_heuristics::{
    BalanceScore, BalanceScorer, BuildOutcome, GraphBuilder, GroupMerger, SimilarityEngine,
    TransactionMatcher,
};
use aml_primitives::{AccountId, DensePair, DetectionConfig, GraphError, Group, Transaction};
use aml_storage::{PersistSummary, StoreError};
use log::info;

use crate::session::GraphSession;

#[derive(Debug)]
pub enum PipelineError {
    Load(LoadError),
    Store(StoreError),
    Graph(GraphError),
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Load(e) => Some(e),
            PipelineError::Store(e) => Some(e),
            PipelineError::Graph(e) => Some(e),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Load(e) => write!(f, "load error: {}", e),
            PipelineError::Store(e) => write!(f, "store error: {}", e),
            PipelineError::Graph(e) => write!(f, "graph error: {}", e),
        }
    }
}

impl From<LoadError> for PipelineError {
    fn from(e: LoadError) -> Self {
        PipelineError::Load(e)
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::Store(e)
    }
}

impl From<GraphError> for PipelineError {
    fn from(e: GraphError) -> Self {
        PipelineError::Graph(e)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub loading: Duration,
    pub matching: Duration,
    pub building: Duration,
    pub scoring: Duration,
    pub similarity: Duration,
    pub merging: Duration,
    pub persisting: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.loading
            + self.matching
            + self.building
            + self.scoring
            + self.similarity
            + self.merging
            + self.persisting
    }
}

/// Everything one run produced, counts and artifacts alike.
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    /// Accounts listed in `nodes.txt`; zero when transactions were passed in directly.
    pub node_count: usize,
    pub transaction_count: usize,
    pub skipped_records: usize,
    pub matched_pairs: usize,
    pub build: BuildOutcome,
    pub graph_accounts: usize,
    pub graph_edges: usize,
    pub candidates: Vec<BalanceScore>,
    pub dense_pairs: Vec<DensePair>,
    pub groups: Vec<Group>,
    pub labeled: usize,
    pub persisted: Option<PersistSummary>,
    pub timings: StageTimings,
}

impl DetectionOutcome {
    pub fn labeled_accounts(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.groups.iter().flat_map(|g| g.members().iter().copied())
    }
}

fn timed<T>(slot: &mut Duration, stage: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = stage();
    *slot = start.elapsed();
    out
}

pub struct Detector<'c> {
    config: &'c DetectionConfig,
}

impl<'c> Detector<'c> {
    pub fn new(config: &'c DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        self.config
    }

    pub fn run(
        &self,
        session: &mut GraphSession,
        transactions: &[Transaction],
    ) -> Result<DetectionOutcome, PipelineError> {
        let mut timings = StageTimings::default();
        info!("detecting over {} transactions", transactions.len());

        let pairs = timed(&mut timings.matching, || {
            TransactionMatcher::new(self.config).match_pairs(transactions)
        });
        if pairs.is_empty() {
            info!("there are no matching transactions");
        }

        let build = timed(&mut timings.building, || {
            GraphBuilder::from_config(self.config).build(session.graph_mut(), &pairs)
        });

        let candidates = timed(&mut timings.scoring, || {
            BalanceScorer::new(self.config).select(session.graph_mut())
        })?;
        let candidate_ids: Vec<AccountId> = candidates.iter().map(|c| c.account).collect();

        let dense_pairs = timed(&mut timings.similarity, || {
            SimilarityEngine::new(self.config).dense_pairs(session.graph(), &candidate_ids)
        });

        let merged = timed(&mut timings.merging, || {
            GroupMerger::new().merge_and_label(session.graph_mut(), &dense_pairs)
        })?;

        let persisted = timed(&mut timings.persisting, || session.persist())?;

        let outcome = DetectionOutcome {
            node_count: 0,
            transaction_count: transactions.len(),
            skipped_records: 0,
            matched_pairs: pairs.len(),
            build,
            graph_accounts: session.graph().account_count(),
            graph_edges: session.graph().edge_count(),
            candidates,
            dense_pairs,
            groups: merged.groups,
            labeled: merged.labeled,
            persisted,
            timings,
        };
        info!(
            "detection finished in {:.3}s: {} groups, {} accounts labeled",
            outcome.timings.total().as_secs_f64(),
            outcome.groups.len(),
            outcome.labeled
        );
        Ok(outcome)
    }

    /// Loads `nodes.txt` and `transactions.txt` from `dir` and runs over them.
    pub fn run_from_dir(
        &self,
        session: &mut GraphSession,
        dir: impl AsRef<Path>,
    ) -> Result<DetectionOutcome, PipelineError> {
        let dir = dir.as_ref();
        let start = Instant::now();
        let nodes = read_nodes(dir.join(NODES_FILE))?;
        let transactions = read_transactions(dir.join(TRANSACTIONS_FILE))?;
        let loading = start.elapsed();

        let mut outcome = self.run(session, &transactions.records)?;
        outcome.node_count = nodes.len();
        outcome.skipped_records = nodes.skipped.len() + transactions.skipped.len();
        outcome.timings.loading = loading;
        Ok(outcome)
    }
}
