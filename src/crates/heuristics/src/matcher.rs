use aml_primitives::{DetectionConfig, MatchedPair, Transaction, difference};
use log::{debug, info};

/// Finds two-hop layering pairs: a lead transaction into an account followed
/// by a similar transaction out of it.
pub struct TransactionMatcher<'c> {
    config: &'c DetectionConfig,
}

impl<'c> TransactionMatcher<'c> {
    pub fn new(config: &'c DetectionConfig) -> Self {
        Self { config }
    }

    /// Pair predicate, ignoring whether either transaction is already used.
    pub fn is_layering_pair(&self, lead: &Transaction, follow: &Transaction) -> bool {
        if !lead.feeds(follow) {
            return false;
        }
        if (lead.amount as f64) < self.config.amount_threshold {
            return false;
        }
        let amount_difference = difference(lead.amount, follow.amount).unsigned_abs() as f64;
        if amount_difference > self.config.allowed_amount_difference {
            return false;
        }
        self.config.time_difference_mode.within(
            lead.time,
            follow.time,
            self.config.allowed_time_difference,
        )
    }

    /// Greedy O(n²) scan in input order. Each transaction leads at most one
    /// pair and follows at most one pair; the first acceptable follow wins.
    pub fn match_pairs(&self, transactions: &[Transaction]) -> Vec<MatchedPair> {
        let n = transactions.len();
        let mut used_follow = vec![false; n];
        let mut pairs = Vec::new();

        // Each lead is visited once and stops at its first follow.
        for (i, lead) in transactions.iter().enumerate() {
            for j in 0..n {
                if i == j || used_follow[j] {
                    continue;
                }
                let follow = &transactions[j];
                if !self.is_layering_pair(lead, follow) {
                    continue;
                }
                let pair = MatchedPair::new(*lead, *follow);
                debug!("matched {} weight={}", pair, pair.weight());
                used_follow[j] = true;
                pairs.push(pair);
                break;
            }
        }

        info!(
            "matched {} layering pairs out of {} transactions",
            pairs.len(),
            n
        );
        pairs
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use aml_primitives::{TimeDifferenceMode, TransactionId, test_utils::single_hop};

    use super::*;

    #[test]
    fn single_hop_matches_once() {
        let config = DetectionConfig::default();
        let pairs = TransactionMatcher::new(&config).match_pairs(&single_hop());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].lead.id, TransactionId(1));
        assert_eq!(pairs[0].follow.id, TransactionId(2));
        assert_eq!(pairs[0].amount_difference(), 50);
    }

    #[test]
    fn lead_below_threshold_is_rejected() {
        let config = DetectionConfig::default();
        let matcher = TransactionMatcher::new(&config);
        let lead = Transaction::new(1, 10, 20, 9_999, 1);
        let follow = Transaction::new(2, 20, 30, 9_999, 2);
        assert!(!matcher.is_layering_pair(&lead, &follow));
    }

    #[test]
    fn amount_difference_bound_is_inclusive() {
        let config = DetectionConfig::default();
        let matcher = TransactionMatcher::new(&config);
        let lead = Transaction::new(1, 10, 20, 10_000, 1);
        assert!(matcher.is_layering_pair(&lead, &Transaction::new(2, 20, 30, 9_900, 2)));
        assert!(!matcher.is_layering_pair(&lead, &Transaction::new(3, 20, 30, 9_899, 2)));
        assert!(!matcher.is_layering_pair(&lead, &Transaction::new(4, 21, 30, 9_900, 2)));
    }

    #[test]
    fn signed_time_check_accepts_late_follow_absolute_does_not() {
        let lead = Transaction::new(1, 10, 20, 10_000, 1);
        let late = Transaction::new(2, 20, 30, 10_000, 50);

        let signed = DetectionConfig::default();
        assert!(TransactionMatcher::new(&signed).is_layering_pair(&lead, &late));

        let absolute = DetectionConfig {
            time_difference_mode: TimeDifferenceMode::Absolute,
            ..Default::default()
        };
        assert!(!TransactionMatcher::new(&absolute).is_layering_pair(&lead, &late));
    }

    #[test]
    fn demo_switch_does_not_change_matching() {
        let config = DetectionConfig {
            demo: true,
            ..Default::default()
        };
        assert_eq!(
            TransactionMatcher::new(&config)
                .match_pairs(&single_hop())
                .len(),
            1
        );
    }

    #[test]
    fn each_transaction_leads_and_follows_at_most_once() {
        // Two leads into 20 competing for one follow, plus a second follow.
        let transactions = vec![
            Transaction::new(1, 10, 20, 10_000, 1),
            Transaction::new(2, 11, 20, 10_000, 1),
            Transaction::new(3, 20, 30, 9_950, 2),
            Transaction::new(4, 20, 31, 9_950, 2),
            Transaction::new(5, 20, 32, 9_950, 2),
        ];
        let config = DetectionConfig::default();
        let pairs = TransactionMatcher::new(&config).match_pairs(&transactions);

        assert_eq!(pairs.len(), 2);
        let leads: HashSet<_> = pairs.iter().map(|p| p.lead.id).collect();
        let follows: HashSet<_> = pairs.iter().map(|p| p.follow.id).collect();
        assert_eq!(leads.len(), pairs.len());
        assert_eq!(follows.len(), pairs.len());
        // First match wins, in input order.
        assert_eq!(pairs[0].follow.id, TransactionId(3));
        assert_eq!(pairs[1].follow.id, TransactionId(4));
        for pair in &pairs {
            assert_eq!(pair.lead.receiver, pair.follow.sender);
        }
    }

    #[test]
    fn a_transaction_may_lead_one_pair_and_follow_another() {
        let transactions = vec![
            Transaction::new(1, 10, 20, 10_000, 1),
            Transaction::new(2, 20, 30, 10_000, 2),
            Transaction::new(3, 30, 40, 10_000, 3),
        ];
        let config = DetectionConfig::default();
        let pairs = TransactionMatcher::new(&config).match_pairs(&transactions);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].follow.id, TransactionId(2));
        assert_eq!(pairs[1].lead.id, TransactionId(2));
    }

    #[test]
    fn extreme_amounts_and_times_do_not_panic() {
        let config = DetectionConfig::default();
        let matcher = TransactionMatcher::new(&config);

        let far_apart = [
            Transaction::new(1, 10, 20, i64::MAX, 1),
            Transaction::new(2, 20, 30, -1, 1),
        ];
        assert!(matcher.match_pairs(&far_apart).is_empty());

        // A lead at the earliest possible time is still followed in signed mode.
        let early_lead = [
            Transaction::new(1, 10, 20, 10_000, i64::MIN),
            Transaction::new(2, 20, 30, 10_000, 1),
        ];
        let pairs = matcher.match_pairs(&early_lead);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].time_difference(), i64::MIN as i128 - 1);
    }

    #[test]
    fn no_self_pairing() {
        // A self-transfer feeds itself but must not pair with itself.
        let transactions = vec![Transaction::new(1, 20, 20, 10_000, 1)];
        let config = DetectionConfig::default();
        assert!(
            TransactionMatcher::new(&config)
                .match_pairs(&transactions)
                .is_empty()
        );
    }
}
