use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use aml_heuristics::{BalanceScorer, GraphBuilder, SimilarityEngine, TransactionMatcher};
use aml_primitives::{AccountId, DetectionConfig, Transaction, TransactionGraph, test_utils::RingFixture};

/// 40 rings of four intermediates each, with disjoint account ranges.
fn ring_transactions() -> Vec<Transaction> {
    let mut transactions = Vec::new();
    for ring in 0..40u64 {
        let base = ring * 100;
        let fixture = RingFixture::new(base, base + 99, (1..=4).map(|i| base + i).collect()).repeats(8);
        transactions.extend(fixture.transactions(ring * 1_000));
    }
    transactions
}

fn bench_dense_pairs(c: &mut Criterion) {
    let config = DetectionConfig::default();
    let pairs = TransactionMatcher::new(&config).match_pairs(&ring_transactions());
    let mut graph = TransactionGraph::new();
    GraphBuilder::from_config(&config).build(&mut graph, &pairs);
    let candidates: Vec<AccountId> = BalanceScorer::new(&config)
        .select(&mut graph)
        .unwrap()
        .into_iter()
        .map(|c| c.account)
        .collect();

    c.bench_function("dense_pairs_160_candidates", |b| {
        b.iter(|| SimilarityEngine::new(&config).dense_pairs(&graph, &candidates));
    });
}

fn bench_build_graph(c: &mut Criterion) {
    let config = DetectionConfig::default();
    let pairs = TransactionMatcher::new(&config).match_pairs(&ring_transactions());

    c.bench_function("build_graph_40_rings", |b| {
        b.iter_batched(
            TransactionGraph::new,
            |mut graph| GraphBuilder::from_config(&config).build(&mut graph, &pairs),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_dense_pairs, bench_build_graph);
criterion_main!(benches);
