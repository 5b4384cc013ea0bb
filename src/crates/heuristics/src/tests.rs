//! Stage-to-stage tests over small hand-built and random transaction sets.

use std::collections::HashSet;

use aml_primitives::{
    AccountId, DetectionConfig, Transaction, TransactionGraph,
    test_utils::{RingFixture, single_hop},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{BalanceScorer, GraphBuilder, GroupMerger, SimilarityEngine, TransactionMatcher};

fn detect(transactions: &[Transaction], config: &DetectionConfig) -> anyhow::Result<(TransactionGraph, Vec<Vec<u64>>)> {
    let pairs = TransactionMatcher::new(config).match_pairs(transactions);
    let mut graph = TransactionGraph::new();
    GraphBuilder::from_config(config).build(&mut graph, &pairs);
    let candidates: Vec<AccountId> = BalanceScorer::new(config)
        .select(&mut graph)?
        .into_iter()
        .map(|c| c.account)
        .collect();
    let dense = SimilarityEngine::new(config).dense_pairs(&graph, &candidates);
    let outcome = GroupMerger::new().merge_and_label(&mut graph, &dense)?;
    let groups = outcome
        .groups
        .iter()
        .map(|g| g.members().iter().map(|m| m.get()).collect())
        .collect();
    Ok((graph, groups))
}

#[test]
fn single_hop_finds_no_group() -> anyhow::Result<()> {
    let config = DetectionConfig::default();
    let (graph, groups) = detect(&single_hop(), &config)?;
    assert_eq!(graph.account_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.edges().iter().all(|e| e.weight == 1));
    // B of the intermediate is log10(1) == 0.
    assert_eq!(graph.account(AccountId(20)).unwrap().balance_score(), 0.0);
    assert!(groups.is_empty());
    assert_eq!(graph.suspect_count(), 0);
    Ok(())
}

#[test]
fn two_rings_become_two_groups() -> anyhow::Result<()> {
    let mut transactions = RingFixture::new(1, 9, vec![2, 3, 4]).repeats(7).transactions(1_000);
    transactions.extend(RingFixture::new(11, 19, vec![12, 13]).repeats(9).transactions(2_000));
    // Unrelated small payments.
    transactions.extend((0..20).map(|i| Transaction::new(5_000 + i, 100 + i, 200 + i, 300, 4)));

    let config = DetectionConfig::default();
    let (graph, groups) = detect(&transactions, &config)?;
    assert_eq!(groups, vec![vec![2, 3, 4], vec![12, 13]]);
    assert_eq!(graph.suspect_count(), 5);
    assert!(!graph.account(AccountId(1)).unwrap().is_suspect());
    assert!(!graph.account(AccountId(19)).unwrap().is_suspect());
    Ok(())
}

#[test]
fn random_transactions_respect_matcher_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    let transactions: Vec<Transaction> = (0..400)
        .map(|id| {
            Transaction::new(
                id,
                rng.gen_range(0..30),
                rng.gen_range(0..30),
                rng.gen_range(9_800..10_200),
                rng.gen_range(0..6),
            )
        })
        .collect();
    let config = DetectionConfig::default();
    let matcher = TransactionMatcher::new(&config);
    let pairs = matcher.match_pairs(&transactions);
    assert!(!pairs.is_empty());

    let mut leads = HashSet::new();
    let mut follows = HashSet::new();
    for pair in &pairs {
        assert!(leads.insert(pair.lead.id));
        assert!(follows.insert(pair.follow.id));
        assert_ne!(pair.lead.id, pair.follow.id);
        assert_eq!(pair.lead.receiver, pair.follow.sender);
        assert!(pair.lead.amount as f64 >= config.amount_threshold);
        assert!(pair.amount_difference() as f64 <= config.allowed_amount_difference);
        assert!(matcher.is_layering_pair(&pair.lead, &pair.follow));
    }

    // Edge weights count every applied hop.
    let mut graph = TransactionGraph::new();
    let outcome = GraphBuilder::from_config(&config).build(&mut graph, &pairs);
    let total: u64 = graph.edges().iter().map(|e| e.weight as u64).sum();
    assert_eq!(total, 2 * outcome.pairs_applied as u64);
}
