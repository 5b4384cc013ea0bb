use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
};

pub trait DisJointSet<K: Eq + Hash + Copy> {
    fn find(&mut self, x: K) -> K;
    fn union(&mut self, x: K, y: K) -> bool; // true if merged
}

/// Union-find over arbitrary keys, with union by rank and path compression.
/// Elements are added the first time they are seen.
#[derive(Clone, Debug)]
pub struct SparseDisjointSet<K: Eq + Hash + Copy> {
    // key: element, value: parent
    parent: HashMap<K, K>,
    // key: root, value: rank (upper bound on tree height)
    rank: HashMap<K, u32>,
}

impl<K: Eq + Hash + Copy> Default for SparseDisjointSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Copy> SparseDisjointSet<K> {
    pub fn new() -> Self {
        Self {
            parent: HashMap::new(),
            rank: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn contains(&self, x: K) -> bool {
        self.parent.contains_key(&x)
    }

    /// Ensure element exists as a singleton set (x is its own parent).
    pub fn make_set(&mut self, x: K) {
        self.parent.entry(x).or_insert(x);
        self.rank.entry(x).or_insert(0);
    }

    pub fn same_set(&mut self, x: K, y: K) -> bool {
        self.find(x) == self.find(y)
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.parent.keys().copied()
    }
}

impl<K: Eq + Hash + Copy + Ord> SparseDisjointSet<K> {
    /// Every set as a sorted member list, sets ordered by their smallest member.
    pub fn groups(&mut self) -> Vec<Vec<K>> {
        let elements: Vec<K> = self.parent.keys().copied().collect();
        let mut by_root: HashMap<K, Vec<K>> = HashMap::new();
        for x in elements {
            let root = self.find(x);
            by_root.entry(root).or_default().push(x);
        }

        let mut ordered: BTreeMap<K, Vec<K>> = BTreeMap::new();
        for (_, mut members) in by_root {
            members.sort_unstable();
            ordered.insert(members[0], members);
        }
        ordered.into_values().collect()
    }
}

impl<K: Eq + Hash + Copy> DisJointSet<K> for SparseDisjointSet<K> {
    fn find(&mut self, x: K) -> K {
        self.make_set(x);

        // Find root
        let mut cur = x;
        while self.parent[&cur] != cur {
            cur = self.parent[&cur];
        }
        let root = cur;

        // Path compression
        let mut cur = x;
        while self.parent[&cur] != cur {
            let p = self.parent[&cur];
            self.parent.insert(cur, root);
            cur = p;
        }

        root
    }

    fn union(&mut self, x: K, y: K) -> bool {
        let rx = self.find(x);
        let ry = self.find(y);

        if rx == ry {
            return false;
        }

        let rank_x = *self.rank.get(&rx).unwrap_or(&0);
        let rank_y = *self.rank.get(&ry).unwrap_or(&0);

        // Union by rank
        if rank_x < rank_y {
            self.parent.insert(rx, ry);
        } else if rank_x > rank_y {
            self.parent.insert(ry, rx);
        } else {
            self.parent.insert(ry, rx);
            self.rank.insert(rx, rank_x + 1);
        }

        true
    }
}
