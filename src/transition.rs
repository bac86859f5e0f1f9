use {
    super::{
        BucketEntry,
        BucketSpace,
        Distribution,
        MembershipView,
        node::{NodeIdx, UpStates},
    },
    std::collections::{BTreeMap, BTreeSet},
};

/// Storage nodes whose cached bucket inventory may be stale.
pub type OutdatedNodes = BTreeSet<NodeIdx>;

/// Outdated nodes of every bucket space.
///
/// Handed from a superseded transition to the one replacing it, so that
/// nodes which never answered are polled again.
pub type OutdatedNodesMap = BTreeMap<BucketSpace, OutdatedNodes>;

/// Per bucket space side of a cluster state transition.
///
/// Decides which nodes must be asked for bucket info, collects their replies
/// and finally merges them into the bucket directory. A transition is created
/// for every bucket space and owned by the
/// [`ClusterStateTransition`](crate::ClusterStateTransition).
pub trait BucketSpaceTransition: Send {
    /// Nodes to ask for bucket info.
    ///
    /// Must include every node whose set of reachable buckets could have
    /// changed between the old and the new view. Extra nodes only cost
    /// extra requests.
    fn outdated_nodes(&self) -> &OutdatedNodes;

    /// Whether bucket ownership, not just node availability, changed.
    fn ownership_transfer_required(&self) -> bool;

    /// Accepts the bucket inventory reported by `node`.
    fn record_reply(&mut self, node: NodeIdx, inventory: Vec<BucketEntry>);

    /// Applies everything collected to the bucket directory.
    fn merge_into_directory(&mut self);
}

/// Everything a bucket space transition is created from.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub space: BucketSpace,
    pub distribution: &'a Distribution,
    pub prev_view: &'a MembershipView,
    pub new_view: &'a MembershipView,
    /// Distribution changed, ownership of every bucket may have moved.
    pub distribution_changed: bool,
    /// Nodes left outdated by a superseded transition.
    pub outdated_nodes: &'a OutdatedNodes,
    pub up_states: &'a UpStates,
}

/// Creates the bucket space transitions of a cluster state transition.
pub trait TransitionFactory {
    fn create(&self, ctx: &TransitionContext<'_>) -> Box<dyn BucketSpaceTransition>;
}
