//! Synthetic dataset generator.
//!
//! Produces a population of accounts, a batch of small "clean" transfers
//! between random accounts, and a number of planted laundering patterns: a
//! sender fans out to intermediates (optionally through a chain of further
//! intermediates), which forward slightly less to a common receiver. Every
//! hop is repeated several times.

use std::{
    fmt, io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use aml_primitives::{AccountId, Transaction};
use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::loader::{NODES_FILE, TRANSACTIONS_FILE, write_nodes, write_transactions};

/// Clean ids `i * 10 + j` stay below the smallest laundering id, `1e8`.
const MAX_CLEAN_TRANSACTIONS: u32 = 9_999_999;

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub min: i64,
    pub max: i64,
}

impl Span {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub const fn fixed(value: i64) -> Self {
        Self::new(value, value)
    }

    fn sample(&self, rng: &mut StdRng) -> i64 {
        rng.gen_range(self.min..=self.max)
    }

    fn check(&self, field: &'static str, floor: i64, ceiling: i64) -> Result<(), GenerateError> {
        if self.min > self.max {
            return Err(GenerateError::invalid(field, format!("min {} > max {}", self.min, self.max)));
        }
        if self.min < floor || self.max > ceiling {
            return Err(GenerateError::invalid(
                field,
                format!("must lie within {}..={}", floor, ceiling),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Accounts are numbered `1..=node_count`.
    pub node_count: u64,
    /// Number of clean sender/receiver pairings.
    pub clean_transaction_count: u32,
    /// Transfers per clean pairing.
    pub clean_repeats: Span,
    pub clean_amount: Span,
    pub clean_time: Span,
    pub ml_pattern_count: u32,
    /// Intermediate rows per pattern.
    pub ml_intermediates: Span,
    /// Chain length of each row.
    pub ml_depth: Span,
    pub ml_input_amount: i64,
    pub ml_output_amount: i64,
    pub ml_input_time: i64,
    pub ml_output_time: i64,
    /// Transfers per laundering hop.
    pub ml_repeats: Span,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            node_count: 10_000,
            clean_transaction_count: 200,
            clean_repeats: Span::new(1, 3),
            clean_amount: Span::new(1, 5_000),
            clean_time: Span::new(1, 24),
            ml_pattern_count: 200,
            ml_intermediates: Span::new(1, 5),
            ml_depth: Span::fixed(1),
            ml_input_amount: 10_000,
            ml_output_amount: 9_900,
            ml_input_time: 1,
            ml_output_time: 2,
            ml_repeats: Span::new(6, 12),
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Id layouts only stay unique within these bounds.
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.node_count < 2 {
            return Err(GenerateError::invalid("node_count", "need at least 2 accounts".to_string()));
        }
        if self.clean_transaction_count > MAX_CLEAN_TRANSACTIONS {
            return Err(GenerateError::invalid(
                "clean_transaction_count",
                format!("must be at most {}", MAX_CLEAN_TRANSACTIONS),
            ));
        }
        self.clean_repeats.check("clean_repeats", 1, 9)?;
        self.clean_amount.check("clean_amount", i64::MIN, i64::MAX)?;
        self.clean_time.check("clean_time", i64::MIN, i64::MAX)?;
        self.ml_intermediates.check("ml_intermediates", 1, 99)?;
        self.ml_depth.check("ml_depth", 1, 999)?;
        self.ml_repeats.check("ml_repeats", 1, 99)?;
        Ok(())
    }

    fn attempt_limit(&self) -> u64 {
        self.node_count.saturating_mul(10)
    }
}

#[derive(Debug)]
pub enum GenerateError {
    /// No account satisfying the pattern constraints turned up.
    Exhausted {
        pattern: u32,
        role: &'static str,
        attempts: u64,
    },
    InvalidConfig { field: &'static str, reason: String },
    Io { path: PathBuf, source: io::Error },
}

impl GenerateError {
    fn invalid(field: &'static str, reason: String) -> Self {
        GenerateError::InvalidConfig { field, reason }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerateError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::Exhausted {
                pattern,
                role,
                attempts,
            } => write!(
                f,
                "not enough accounts to assign a {} for pattern {} after {} attempts",
                role, pattern, attempts
            ),
            GenerateError::InvalidConfig { field, reason } => {
                write!(f, "invalid generator setting {}: {}", field, reason)
            }
            GenerateError::Io { path, source } => {
                write!(f, "cannot write {}: {}", path.display(), source)
            }
        }
    }
}

/// One planted laundering pattern. Each row is a chain of intermediates from
/// the sender towards the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlantedPattern {
    pub index: u32,
    pub sender: AccountId,
    pub receiver: AccountId,
    pub rows: Vec<Vec<AccountId>>,
}

impl PlantedPattern {
    pub fn intermediates(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.rows.iter().flatten().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub node_count: u64,
    /// Clean pairings requested.
    pub clean_transaction_count: u32,
    pub clean_transactions_written: usize,
    pub ml_transactions_written: usize,
    pub ml_groups: usize,
    /// Intermediates across all patterns.
    pub ml_accounts: usize,
    pub node_creation: Duration,
    pub transaction_creation: Duration,
    pub ml_creation: Duration,
}

impl GenerationSummary {
    pub fn render(&self) -> String {
        format!(
            "\nFinished generating data...\n\
             Timeframe..\n\
             Node creation: {:.3}s\n\
             Transaction creation: {:.3}s\n\
             ML transaction: {:.3}s\n\
             Total ML accounts generated: {}\n\
             Total ML groups generated: {}\n\
             Total number of nodes: {}\n\
             Total number of clean transactions: {}\n",
            self.node_creation.as_secs_f64(),
            self.transaction_creation.as_secs_f64(),
            self.ml_creation.as_secs_f64(),
            self.ml_accounts,
            self.ml_groups,
            self.node_count,
            self.clean_transaction_count,
        )
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedDataset {
    pub nodes: Vec<AccountId>,
    pub transactions: Vec<Transaction>,
    pub patterns: Vec<PlantedPattern>,
    pub summary: GenerationSummary,
}

impl GeneratedDataset {
    /// Writes `nodes.txt` and `transactions.txt` into `dir`.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<(), GenerateError> {
        let dir = dir.as_ref();
        let io_err = |path: PathBuf| move |source: io::Error| GenerateError::Io { path, source };

        std::fs::create_dir_all(dir).map_err(io_err(dir.to_path_buf()))?;
        let transactions = dir.join(TRANSACTIONS_FILE);
        write_transactions(&transactions, &self.transactions).map_err(io_err(transactions.clone()))?;
        let nodes = dir.join(NODES_FILE);
        write_nodes(&nodes, &self.nodes).map_err(io_err(nodes.clone()))?;
        info!(
            "wrote {} transactions and {} accounts to {}",
            self.transactions.len(),
            self.nodes.len(),
            dir.display()
        );
        Ok(())
    }
}

pub struct DataGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl DataGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    fn random_account(&mut self) -> AccountId {
        AccountId(self.rng.gen_range(1..=self.config.node_count))
    }

    /// Draws accounts until `accept` holds, giving up after `node_count * 10` draws.
    fn draw(
        &mut self,
        pattern: u32,
        role: &'static str,
        accept: impl Fn(AccountId) -> bool,
    ) -> Result<AccountId, GenerateError> {
        let limit = self.config.attempt_limit();
        for _ in 0..limit {
            let candidate = self.random_account();
            if accept(candidate) {
                return Ok(candidate);
            }
        }
        Err(GenerateError::Exhausted {
            pattern,
            role,
            attempts: limit,
        })
    }

    fn clean_transactions(&mut self) -> Vec<Transaction> {
        let mut out = Vec::new();
        for i in 1..=self.config.clean_transaction_count as u64 {
            let repeats = self.config.clean_repeats.sample(&mut self.rng) as u64;
            let sender = self.random_account();
            let mut receiver = sender;
            while receiver == sender {
                receiver = self.random_account();
            }
            for j in 1..=repeats {
                let amount = self.config.clean_amount.sample(&mut self.rng);
                let time = self.config.clean_time.sample(&mut self.rng);
                out.push(Transaction::new(i * 10 + j, sender.get(), receiver.get(), amount, time));
            }
        }
        out
    }

    /// Transaction id layout `w00x000y000z0`: pattern, row, depth, repeat.
    /// The hop into the receiver uses the same id plus one.
    fn ml_transaction_id(pattern: u64, row: u64, depth: u64, repeat: u64) -> u64 {
        100_000_000 * pattern + 1_000_000 * row + 1_000 * depth + 10 * repeat
    }

    fn ml_patterns(&mut self, out: &mut Vec<Transaction>) -> Result<Vec<PlantedPattern>, GenerateError> {
        let mut all_intermediates: Vec<AccountId> = Vec::new();
        let mut all_endpoints: Vec<AccountId> = Vec::new();
        let mut patterns = Vec::new();

        for index in 1..=self.config.ml_pattern_count {
            // Senders and receivers may take part in several patterns, but
            // never as an intermediate.
            let sender = self.draw(index, "sender", |a| !all_intermediates.contains(&a))?;
            let receiver = self.draw(index, "receiver", |a| {
                a != sender && !all_intermediates.contains(&a)
            })?;
            all_endpoints.push(sender);
            all_endpoints.push(receiver);

            let row_count = self.config.ml_intermediates.sample(&mut self.rng) as u64;
            let mut rows = Vec::new();
            for row in 1..=row_count {
                let depth = self.config.ml_depth.sample(&mut self.rng) as u64;
                let mut previous = sender;
                let mut chain = Vec::new();
                for level in 1..=depth {
                    let intermediate = self.draw(index, "intermediate", |a| {
                        a != sender
                            && a != receiver
                            && !all_intermediates.contains(&a)
                            && !all_endpoints.contains(&a)
                    })?;
                    all_intermediates.push(intermediate);
                    chain.push(intermediate);

                    let repeats = self.config.ml_repeats.sample(&mut self.rng) as u64;
                    for n in 1..=repeats {
                        let id = Self::ml_transaction_id(index as u64, row, level, n);
                        out.push(Transaction::new(
                            id,
                            previous.get(),
                            intermediate.get(),
                            self.config.ml_input_amount,
                            self.config.ml_input_time,
                        ));
                        if level == depth {
                            out.push(Transaction::new(
                                id + 1,
                                intermediate.get(),
                                receiver.get(),
                                self.config.ml_output_amount,
                                self.config.ml_output_time,
                            ));
                        }
                    }
                    previous = intermediate;
                }
                rows.push(chain);
            }

            let pattern = PlantedPattern {
                index,
                sender,
                receiver,
                rows,
            };
            debug!(
                "pattern {}: {} -> {:?} -> {}",
                index, pattern.sender, pattern.rows, pattern.receiver
            );
            patterns.push(pattern);
        }
        Ok(patterns)
    }

    /// Nothing is returned, and so nothing written, if any pattern cannot be placed.
    pub fn generate(&mut self) -> Result<GeneratedDataset, GenerateError> {
        info!(
            "generating {} accounts, {} clean pairings, {} laundering patterns",
            self.config.node_count, self.config.clean_transaction_count, self.config.ml_pattern_count
        );
        let started = Instant::now();
        let nodes: Vec<AccountId> = (1..=self.config.node_count).map(AccountId).collect();
        let node_creation = started.elapsed();

        let started = Instant::now();
        let mut transactions = self.clean_transactions();
        let clean_transactions_written = transactions.len();
        let transaction_creation = started.elapsed();

        let started = Instant::now();
        let patterns = self.ml_patterns(&mut transactions)?;
        let ml_creation = started.elapsed();

        let summary = GenerationSummary {
            node_count: self.config.node_count,
            clean_transaction_count: self.config.clean_transaction_count,
            clean_transactions_written,
            ml_transactions_written: transactions.len() - clean_transactions_written,
            ml_groups: patterns.len(),
            ml_accounts: patterns.iter().map(|p| p.intermediates().count()).sum(),
            node_creation,
            transaction_creation,
            ml_creation,
        };
        info!(
            "generated {} transactions, {} laundering accounts in {} groups",
            transactions.len(),
            summary.ml_accounts,
            summary.ml_groups
        );
        Ok(GeneratedDataset {
            nodes,
            transactions,
            patterns,
            summary,
        })
    }
}
