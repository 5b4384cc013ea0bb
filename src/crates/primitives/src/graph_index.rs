use std::collections::BTreeMap;

use crate::{
    graph::Edge,
    ids::{AccountId, EdgeId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Predecessors: accounts that sent to this one.
    Incoming,
    /// Successors: accounts this one sent to.
    Outgoing,
}

/// The weighted neighbors of one account in one direction, ordered by neighbor id.
#[derive(Clone, Copy)]
pub struct Neighborhood<'a> {
    neighbors: Option<&'a BTreeMap<AccountId, EdgeId>>,
    edges: &'a [Edge],
}

impl<'a> Neighborhood<'a> {
    pub fn new(neighbors: Option<&'a BTreeMap<AccountId, EdgeId>>, edges: &'a [Edge]) -> Self {
        Self { neighbors, edges }
    }

    pub fn weight_to(&self, neighbor: AccountId) -> Option<u32> {
        self.neighbors
            .and_then(|n| n.get(&neighbor))
            .map(|id| self.edges[id.index()].weight)
    }

    pub fn iter(self) -> impl Iterator<Item = (AccountId, u32)> + 'a {
        let edges = self.edges;
        self.neighbors
            .into_iter()
            .flat_map(|n| n.iter())
            .map(move |(account, id)| (*account, edges[id.index()].weight))
    }

    pub fn len(&self) -> usize {
        self.neighbors.map_or(0, |n| n.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_weight(&self) -> u64 {
        self.iter().map(|(_, w)| w as u64).sum()
    }

    pub fn squared_weight_sum(&self) -> f64 {
        self.iter().map(|(_, w)| (w as f64) * (w as f64)).sum()
    }
}

/// Read access to the adjacency of a graph.
pub trait NeighborhoodIndex {
    fn neighborhood(&self, account: AccountId, direction: Direction) -> Neighborhood<'_>;

    fn predecessors(&self, account: AccountId) -> Neighborhood<'_> {
        self.neighborhood(account, Direction::Incoming)
    }

    fn successors(&self, account: AccountId) -> Neighborhood<'_> {
        self.neighborhood(account, Direction::Outgoing)
    }
}
