use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use log::trace;
use serde::Serialize;

use crate::{
    graph_index::{Direction, Neighborhood, NeighborhoodIndex},
    ids::{AccountId, EdgeId, TransactionId},
    transaction::Transaction,
};

/// Graph node. Weights and score stay zero until the balance stage fills them in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    id: AccountId,
    inbound: u64,
    outbound: u64,
    balance_score: f64,
    suspect: bool,
}

impl Account {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            inbound: 0,
            outbound: 0,
            balance_score: 0.0,
            suspect: false,
        }
    }

    /// Rebuild an account from persisted fields.
    pub fn from_parts(
        id: AccountId,
        inbound: u64,
        outbound: u64,
        balance_score: f64,
        suspect: bool,
    ) -> Self {
        Self {
            id,
            inbound,
            outbound,
            balance_score,
            suspect,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn inbound(&self) -> u64 {
        self.inbound
    }

    pub fn outbound(&self) -> u64 {
        self.outbound
    }

    pub fn balance_score(&self) -> f64 {
        self.balance_score
    }

    /// Set once the account is a member of a detected group.
    pub fn is_suspect(&self) -> bool {
        self.suspect
    }
}

/// A collapsed SEND relationship. Amount, time and transaction come from the
/// first transaction seen on this ordered account pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: AccountId,
    pub target: AccountId,
    pub weight: u32,
    pub amount: i64,
    pub time: i64,
    pub transaction: TransactionId,
}

impl Edge {
    fn first(transaction: &Transaction) -> Self {
        Self {
            source: transaction.sender,
            target: transaction.receiver,
            weight: 1,
            amount: transaction.amount,
            time: transaction.time,
            transaction: transaction.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeUpdate {
    Created(EdgeId),
    Incremented { edge: EdgeId, weight: u32 },
}

impl EdgeUpdate {
    pub fn edge(self) -> EdgeId {
        match self {
            EdgeUpdate::Created(edge) => edge,
            EdgeUpdate::Incremented { edge, .. } => edge,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Adding `additional` repeats to the edge would overflow its weight.
    WeightOverflow {
        source: AccountId,
        target: AccountId,
        weight: u32,
        additional: u32,
    },
    UnknownAccount(AccountId),
    /// The edge table already holds as many edges as an [`EdgeId`] can address.
    EdgeLimit { edges: usize },
}

impl std::error::Error for GraphError {}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::WeightOverflow {
                source,
                target,
                weight,
                additional,
            } => write!(
                f,
                "edge {} -> {} cannot take {} more repeats at weight {}",
                source, target, additional, weight
            ),
            GraphError::UnknownAccount(id) => write!(f, "account {} is not in the graph", id),
            GraphError::EdgeLimit { edges } => write!(f, "edge table is full at {} edges", edges),
        }
    }
}

fn next_edge_id(edges: usize) -> Result<EdgeId, GraphError> {
    u32::try_from(edges)
        .map(EdgeId)
        .map_err(|_| GraphError::EdgeLimit { edges })
}

type Adjacency = HashMap<AccountId, BTreeMap<AccountId, EdgeId>>;

/// Weighted directed graph of accounts. At most one edge per ordered account
/// pair; repeats raise its weight. Nodes and edges are never removed.
#[derive(Debug, Default, Clone)]
pub struct TransactionGraph {
    accounts: BTreeMap<AccountId, Account>,
    edges: Vec<Edge>,
    outgoing: Adjacency,
    incoming: Adjacency,
}

impl TransactionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup-or-create. Returns true if the account was created.
    pub fn ensure_account(&mut self, id: AccountId) -> bool {
        if self.accounts.contains_key(&id) {
            return false;
        }
        trace!("creating account {}", id);
        self.accounts.insert(id, Account::new(id));
        true
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Accounts in ascending id order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn account_ids(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.accounts.keys().copied()
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_between(&self, source: AccountId, target: AccountId) -> Option<&Edge> {
        self.outgoing
            .get(&source)
            .and_then(|targets| targets.get(&target))
            .map(|id| self.edge(*id))
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn suspect_count(&self) -> usize {
        self.accounts.values().filter(|a| a.suspect).count()
    }

    /// Fails if `additional` more repeats on `source -> target` would overflow
    /// the edge weight. A missing edge counts as weight 0.
    pub fn check_headroom(
        &self,
        source: AccountId,
        target: AccountId,
        additional: u32,
    ) -> Result<(), GraphError> {
        let weight = self.edge_between(source, target).map_or(0, |edge| edge.weight);
        match weight.checked_add(additional) {
            Some(_) => Ok(()),
            None => Err(GraphError::WeightOverflow {
                source,
                target,
                weight,
                additional,
            }),
        }
    }

    /// Record one SEND for `transaction`, creating both accounts if needed.
    pub fn record_send(&mut self, transaction: &Transaction) -> Result<EdgeUpdate, GraphError> {
        let (source, target) = (transaction.sender, transaction.receiver);
        if let Some(id) = self
            .outgoing
            .get(&source)
            .and_then(|targets| targets.get(&target))
            .copied()
        {
            let edge = &mut self.edges[id.index()];
            let weight = edge
                .weight
                .checked_add(1)
                .ok_or(GraphError::WeightOverflow {
                    source,
                    target,
                    weight: edge.weight,
                    additional: 1,
                })?;
            edge.weight = weight;
            return Ok(EdgeUpdate::Incremented { edge: id, weight });
        }

        let id = next_edge_id(self.edges.len())?;
        self.ensure_account(source);
        self.ensure_account(target);
        self.edges.push(Edge::first(transaction));
        self.outgoing.entry(source).or_default().insert(target, id);
        self.incoming.entry(target).or_default().insert(source, id);
        trace!("created edge {} -> {} from {}", source, target, transaction.id);
        Ok(EdgeUpdate::Created(id))
    }

    /// Overwrite an existing edge weight, for overflow fixtures.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_edge_weight(&mut self, source: AccountId, target: AccountId, weight: u32) -> bool {
        let Some(id) = self.outgoing.get(&source).and_then(|t| t.get(&target)).copied() else {
            return false;
        };
        self.edges[id.index()].weight = weight;
        true
    }

    pub fn set_balance(
        &mut self,
        id: AccountId,
        inbound: u64,
        outbound: u64,
        balance_score: f64,
    ) -> Result<(), GraphError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(GraphError::UnknownAccount(id))?;
        account.inbound = inbound;
        account.outbound = outbound;
        account.balance_score = balance_score;
        Ok(())
    }

    /// Returns true if the account was not labeled before.
    pub fn label_suspect(&mut self, id: AccountId) -> Result<bool, GraphError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(GraphError::UnknownAccount(id))?;
        let fresh = !account.suspect;
        account.suspect = true;
        Ok(fresh)
    }
}

impl NeighborhoodIndex for TransactionGraph {
    fn neighborhood(&self, account: AccountId, direction: Direction) -> Neighborhood<'_> {
        let adjacency = match direction {
            Direction::Outgoing => &self.outgoing,
            Direction::Incoming => &self.incoming,
        };
        Neighborhood::new(adjacency.get(&account), &self.edges)
    }
}
