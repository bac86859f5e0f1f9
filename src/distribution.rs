use {
    super::{
        BucketId,
        ClusterState,
        TransitionError,
        TransitionResult,
        node::{NodeIdx, NodeType, UpStates},
    },
    hrw_hash::HrwNodes,
    std::collections::{BTreeMap, BTreeSet},
};

/// Placement configuration of a bucket space.
///
/// Buckets are grouped into superbuckets, each superbucket is placed on
/// `redundancy` storage nodes using Highest Random Weight (HRW) hashing over
/// the nodes available in a cluster state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    redundancy: usize,
    superbuckets: u32,
    config_id: String,
}

impl Distribution {
    /// Creates a distribution storing every superbucket on `redundancy` nodes.
    pub fn new(redundancy: usize, superbuckets: u32) -> TransitionResult<Self> {
        if redundancy == 0 {
            return Err(TransitionError::InvalidRedundancy(redundancy));
        }
        if superbuckets == 0 {
            return Err(TransitionError::InvalidSuperbucketCount(superbuckets));
        }

        Ok(Self {
            redundancy,
            superbuckets,
            config_id: format!("redundancy:{redundancy} superbuckets:{superbuckets}"),
        })
    }

    /// Returns the same distribution with a custom configuration id.
    ///
    /// The id takes part in the fingerprint, so two otherwise equal
    /// distributions with different ids fingerprint differently.
    pub fn with_config_id(mut self, config_id: impl Into<String>) -> Self {
        self.config_id = config_id.into();
        self
    }

    pub fn redundancy(&self) -> usize {
        self.redundancy
    }

    pub fn superbuckets(&self) -> u32 {
        self.superbuckets
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    /// Human readable fingerprint of the configuration.
    ///
    /// Sent along with bucket info requests for diagnostics only.
    pub fn fingerprint(&self) -> String {
        let canonical = format!(
            "{}|{}|{}",
            self.redundancy, self.superbuckets, self.config_id
        );
        format!("{:016x}", rapidhash::rapidhash(canonical.as_bytes()))
    }

    /// Superbucket a bucket belongs to.
    pub fn superbucket(&self, bucket: BucketId) -> u32 {
        (bucket.raw() % self.superbuckets as u64) as u32
    }

    /// Storage nodes a superbucket is placed on in the given state.
    ///
    /// Ordered by HRW score, the first node is the primary. Fewer than
    /// `redundancy` nodes are returned if not enough nodes are available.
    pub fn ideal_nodes(
        &self,
        superbucket: u32,
        state: &ClusterState,
        up: &UpStates,
    ) -> Vec<NodeIdx> {
        // HRW ranks node indexes as `u64` keys.
        let hrw = HrwNodes::new(
            state
                .available_nodes(NodeType::Storage, up)
                .map(|idx| idx as u64),
        );
        hrw.sorted(&(superbucket as u64))
            .take(self.redundancy)
            .map(|idx| *idx as NodeIdx)
            .collect()
    }

    /// Superbuckets owned by each available storage node in the given state.
    pub fn ownership(
        &self,
        state: &ClusterState,
        up: &UpStates,
    ) -> BTreeMap<NodeIdx, BTreeSet<u32>> {
        let mut owned: BTreeMap<NodeIdx, BTreeSet<u32>> = BTreeMap::new();
        for superbucket in 0..self.superbuckets {
            for node in self.ideal_nodes(superbucket, state, up) {
                owned.entry(node).or_default().insert(superbucket);
            }
        }
        owned
    }

    /// Storage nodes whose set of owned superbuckets differs between states.
    ///
    /// Covers both nodes taking over buckets and nodes giving them up.
    pub fn changed_owners(
        &self,
        old: &ClusterState,
        new: &ClusterState,
        up: &UpStates,
    ) -> BTreeSet<NodeIdx> {
        let old_owned = self.ownership(old, up);
        let new_owned = self.ownership(new, up);
        let empty = BTreeSet::new();

        old_owned
            .keys()
            .chain(new_owned.keys())
            .copied()
            .filter(|node| {
                old_owned.get(node).unwrap_or(&empty) != new_owned.get(node).unwrap_or(&empty)
            })
            .collect()
    }
}
