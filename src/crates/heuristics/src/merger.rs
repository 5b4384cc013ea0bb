use aml_disjoint_set::{DisJointSet, SparseDisjointSet};
use aml_primitives::{AccountId, DensePair, GraphError, Group, TransactionGraph};
use log::{debug, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub groups: Vec<Group>,
    /// Accounts newly labeled by this merge.
    pub labeled: usize,
}

/// Merges dense pairs into maximal groups: two accounts end up in the same
/// group iff a chain of dense pairs links them.
#[derive(Debug, Default)]
pub struct GroupMerger;

impl GroupMerger {
    pub fn new() -> Self {
        Self
    }

    /// Groups come out with sorted members, ordered by smallest member. The
    /// result does not depend on the order of `pairs`.
    pub fn merge(&self, pairs: &[DensePair]) -> Vec<Group> {
        let mut sets: SparseDisjointSet<AccountId> = SparseDisjointSet::new();
        for pair in pairs {
            if sets.union(pair.first, pair.second) {
                debug!("joined {} and {} (similarity {:.4})", pair.first, pair.second, pair.similarity);
            }
        }
        sets.groups().into_iter().map(Group::new).collect()
    }

    /// Sets the suspect flag on every group member. Returns how many accounts
    /// were not labeled before.
    pub fn label(&self, graph: &mut TransactionGraph, groups: &[Group]) -> Result<usize, GraphError> {
        let mut labeled = 0;
        for group in groups {
            for &member in group.members() {
                if graph.label_suspect(member)? {
                    labeled += 1;
                }
            }
        }
        Ok(labeled)
    }

    pub fn merge_and_label(
        &self,
        graph: &mut TransactionGraph,
        pairs: &[DensePair],
    ) -> Result<MergeOutcome, GraphError> {
        let groups = self.merge(pairs);
        let labeled = self.label(graph, &groups)?;
        for group in &groups {
            info!("suspected laundering group {}", group);
        }
        info!("{} groups, {} accounts labeled", groups.len(), labeled);
        Ok(MergeOutcome { groups, labeled })
    }
}
