//! The run summary appended to `output_summary.txt`.
//!
//! Each section starts with a `------------` rule so that a generation
//! section and one or more detection sections can share the file.

use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
    time::Duration,
};

use aml_dataset::GenerationSummary;
use aml_primitives::DetectionConfig;
use serde::Serialize;

use crate::runner::{DetectionOutcome, StageTimings};

pub const SUMMARY_FILE: &str = "output_summary.txt";

const RULE: &str = "------------";

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

/// Stage durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageMillis {
    pub loading: f64,
    pub matching: f64,
    pub building: f64,
    pub scoring: f64,
    pub similarity: f64,
    pub merging: f64,
    pub persisting: f64,
    pub total: f64,
}

impl From<&StageTimings> for StageMillis {
    fn from(t: &StageTimings) -> Self {
        Self {
            loading: millis(t.loading),
            matching: millis(t.matching),
            building: millis(t.building),
            scoring: millis(t.scoring),
            similarity: millis(t.similarity),
            merging: millis(t.merging),
            persisting: millis(t.persisting),
            total: millis(t.total()),
        }
    }
}

/// Detection results measured against what the generator planted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectionRatings {
    pub groups_found: usize,
    pub groups_generated: usize,
    pub accounts_found: usize,
    pub accounts_generated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub parameters: DetectionConfig,
    pub nodes: usize,
    pub transactions: usize,
    pub skipped_records: usize,
    pub matched_pairs: usize,
    pub build_failures: usize,
    pub graph_accounts: usize,
    pub graph_edges: usize,
    pub candidates: usize,
    pub dense_pairs: usize,
    pub groups: usize,
    pub labeled_accounts: usize,
    pub group_members: Vec<Vec<u64>>,
    pub stage_ms: StageMillis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings: Option<DetectionRatings>,
}

impl RunReport {
    pub fn new(config: &DetectionConfig, outcome: &DetectionOutcome) -> Self {
        Self {
            parameters: config.clone(),
            nodes: outcome.node_count,
            transactions: outcome.transaction_count,
            skipped_records: outcome.skipped_records,
            matched_pairs: outcome.matched_pairs,
            build_failures: outcome.build.failures,
            graph_accounts: outcome.graph_accounts,
            graph_edges: outcome.graph_edges,
            candidates: outcome.candidates.len(),
            dense_pairs: outcome.dense_pairs.len(),
            groups: outcome.groups.len(),
            labeled_accounts: outcome.labeled,
            group_members: outcome
                .groups
                .iter()
                .map(|g| g.members().iter().map(|m| m.get()).collect())
                .collect(),
            stage_ms: StageMillis::from(&outcome.timings),
            ratings: None,
        }
    }

    pub fn with_generation(mut self, generated: &GenerationSummary) -> Self {
        self.ratings = Some(DetectionRatings {
            groups_found: self.groups,
            groups_generated: generated.ml_groups,
            accounts_found: self.labeled_accounts,
            accounts_generated: generated.ml_accounts,
        });
        self
    }

    pub fn render(&self) -> String {
        let p = &self.parameters;
        let t = &self.stage_ms;
        let mut out = format!(
            "\n{RULE}\n\
             Start of algorithm\n\
             Parameters:\n\
             degreeConstant: {}\n\
             densePairConstant: {}\n\
             amountThreshold: {}\n\
             allowedAmountDifference: {}\n\
             allowedTimeDifference: {} ({:?})\n\
             demo: {}\n\
             {RULE}\n\
             Report ..\n\
             Total number of nodes: {}\n\
             Total number of transactions: {}\n\
             Skipped input records: {}\n\
             Total number of matched transactions: {}\n\
             Total number of matched transactions nodes: {}\n\
             Failed pairs: {}\n\
             Total number of balanced scored nodes: {}\n\
             Total number of dense pairs: {}\n\
             Total number of ML groups: {}\n\
             Total number of ML accounts: {}\n",
            p.degree_constant,
            p.dense_pair_constant,
            p.amount_threshold,
            p.allowed_amount_difference,
            p.allowed_time_difference,
            p.time_difference_mode,
            p.demo,
            self.nodes,
            self.transactions,
            self.skipped_records,
            self.matched_pairs,
            self.graph_accounts,
            self.build_failures,
            self.candidates,
            self.dense_pairs,
            self.groups,
            self.labeled_accounts,
        );
        if let Some(r) = &self.ratings {
            out.push_str(&format!(
                "ML detection of group rating: {} / {}\n\
                 ML detection of accounts rating: {} / {}\n",
                r.groups_found, r.groups_generated, r.accounts_found, r.accounts_generated
            ));
        }
        out.push_str(&format!(
            "Timeframe ..\n\
             Total time to load input (ms): {:.3}\n\
             Total time to find matching pair (ms): {:.3}\n\
             Total time to generate graph (ms): {:.3}\n\
             Total time to calculate balance score (ms): {:.3}\n\
             Total time to Similar Nodes (SHRINK) (ms): {:.3}\n\
             Total time to identity groups (ms): {:.3}\n\
             Total time to persist graph (ms): {:.3}\n\
             Total time of detection (ms): {:.3}\n",
            t.loading, t.matching, t.building, t.scoring, t.similarity, t.merging, t.persisting, t.total
        ));
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn append_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        append_section(path, &self.render())
    }
}

/// Appends `text` to `path`, creating the file if needed.
pub fn append_section(path: impl AsRef<Path>, text: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_outcome() -> DetectionOutcome {
        DetectionOutcome {
            node_count: 12,
            transaction_count: 40,
            matched_pairs: 9,
            graph_accounts: 6,
            timings: StageTimings {
                matching: Duration::from_millis(2),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn render_lists_counts_and_parameters() {
        let config = DetectionConfig::default();
        let text = RunReport::new(&config, &sample_outcome()).render();
        assert!(text.contains("degreeConstant: 0.1\n"));
        assert!(text.contains("Total number of nodes: 12\n"));
        assert!(text.contains("Total number of matched transactions: 9\n"));
        assert!(text.contains("Total time to find matching pair (ms): 2.000\n"));
        assert!(!text.contains("rating"));
    }

    #[test]
    fn ratings_come_from_generation() {
        let config = DetectionConfig::default();
        let generated = GenerationSummary {
            node_count: 12,
            clean_transaction_count: 3,
            clean_transactions_written: 6,
            ml_transactions_written: 24,
            ml_groups: 2,
            ml_accounts: 5,
            node_creation: Duration::ZERO,
            transaction_creation: Duration::ZERO,
            ml_creation: Duration::ZERO,
        };
        let report = RunReport::new(&config, &sample_outcome()).with_generation(&generated);
        assert!(report.render().contains("ML detection of group rating: 0 / 2\n"));
        assert!(report.render().contains("ML detection of accounts rating: 0 / 5\n"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["ratings"]["groups_generated"], 2);
        assert_eq!(json["parameters"]["degree_constant"], 0.1);
        assert_eq!(json["stage_ms"]["matching"], 2.0);
    }

    #[test]
    fn sections_are_appended() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(SUMMARY_FILE);
        append_section(&path, "generated\n")?;
        let config = DetectionConfig::default();
        let report = RunReport::new(&config, &sample_outcome());
        report.append_to(&path)?;
        report.append_to(&path)?;

        let text = std::fs::read_to_string(&path)?;
        assert!(text.starts_with("generated\n"));
        assert_eq!(text.matches("Start of algorithm").count(), 2);
        Ok(())
    }
}
