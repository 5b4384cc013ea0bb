use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, TransactionId};

/// Weight given to a matched pair whose amount or time difference is zero.
/// `1 / 0` has no finite value, so these pairs get the largest finite weight.
pub const EXACT_MATCH_WEIGHT: f64 = f64::MAX;

/// `a - b` without overflow for any pair of `i64` inputs.
pub fn difference(a: i64, b: i64) -> i128 {
    a as i128 - b as i128
}

/// A single transfer between two accounts. Times are coarse units (hours in
/// the generated datasets) with no sub-unit precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub sender: AccountId,
    pub receiver: AccountId,
    pub amount: i64,
    pub time: i64,
}

impl Transaction {
    pub fn new(id: u64, sender: u64, receiver: u64, amount: i64, time: i64) -> Self {
        Self {
            id: TransactionId(id),
            sender: AccountId(sender),
            receiver: AccountId(receiver),
            amount,
            time,
        }
    }

    /// True if `next` picks up the funds this transaction delivered.
    pub fn feeds(&self, next: &Transaction) -> bool {
        self.receiver == next.sender
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {}->{} amount={} time={}]",
            self.id, self.sender, self.receiver, self.amount, self.time
        )
    }
}

/// Two transactions forming a layering hop: `lead.sender -> lead.receiver == follow.sender -> follow.receiver`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedPair {
    pub lead: Transaction,
    pub follow: Transaction,
    weight: f64,
}

impl MatchedPair {
    pub fn new(lead: Transaction, follow: Transaction) -> Self {
        debug_assert!(lead.feeds(&follow), "follow must spend what lead received");
        let weight = Self::weight_for(&lead, &follow);
        Self {
            lead,
            follow,
            weight,
        }
    }

    /// Widened to `i128` so extreme amounts cannot overflow.
    pub fn amount_difference(&self) -> u128 {
        difference(self.lead.amount, self.follow.amount).unsigned_abs()
    }

    /// Signed: positive when the follow happened before the lead.
    pub fn time_difference(&self) -> i128 {
        difference(self.lead.time, self.follow.time)
    }

    /// `1 / (amount difference * time difference)`, using the magnitude of the
    /// time difference. Zero products map to [`EXACT_MATCH_WEIGHT`].
    pub fn weight(&self) -> f64 {
        self.weight
    }

    fn weight_for(lead: &Transaction, follow: &Transaction) -> f64 {
        let amount = difference(lead.amount, follow.amount).unsigned_abs() as f64;
        let time = difference(lead.time, follow.time).unsigned_abs() as f64;
        let product = amount * time;
        if product == 0.0 {
            EXACT_MATCH_WEIGHT
        } else {
            1.0 / product
        }
    }
}

impl fmt::Display for MatchedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} -> {} (lead {}, follow {})",
            self.lead.sender, self.lead.receiver, self.follow.receiver, self.lead.id, self.follow.id
        )
    }
}

/// Two candidate accounts whose structural similarity reached the dense-pair threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensePair {
    pub first: AccountId,
    pub second: AccountId,
    pub similarity: f64,
}

impl DensePair {
    pub fn new(first: AccountId, second: AccountId, similarity: f64) -> Self {
        Self {
            first,
            second,
            similarity,
        }
    }

    pub fn contains(&self, account: AccountId) -> bool {
        self.first == account || self.second == account
    }
}

/// A maximal set of accounts linked by a chain of dense pairs. Members are kept sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    members: Vec<AccountId>,
}

impl Group {
    pub fn new(mut members: Vec<AccountId>) -> Self {
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    pub fn members(&self) -> &[AccountId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, account: AccountId) -> bool {
        self.members.binary_search(&account).is_ok()
    }

    /// Smallest member; groups are reported in this order.
    pub fn anchor(&self) -> Option<AccountId> {
        self.members.first().copied()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.members.iter().map(|m| m.to_string()).collect();
        write!(f, "{{{}}}", ids.join(", "))
    }
}
