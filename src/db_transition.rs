use {
    super::{
        BucketDirectory,
        BucketEntry,
        BucketSpace,
        ClusterState,
        node::{NodeIdx, NodeRef, NodeType, UpStates},
        transition::{BucketSpaceTransition, OutdatedNodes, TransitionContext, TransitionFactory},
    },
    std::{
        collections::{BTreeMap, BTreeSet},
        sync::Arc,
    },
    tracing::debug,
};

/// Bucket space transition backed by a [`BucketDirectory`].
///
/// Outdated nodes are the union of:
/// - nodes left outdated by a superseded transition,
/// - storage nodes whose state differs between the old and the new view,
/// - storage nodes whose ideal superbuckets differ between the views,
/// - every storage node of the new view, if the distribution changed.
pub struct DbTransition {
    space: BucketSpace,
    directory: BucketDirectory,
    new_state: Arc<ClusterState>,
    up_states: UpStates,
    outdated: OutdatedNodes,
    ownership_transfer: bool,
    replies: BTreeMap<NodeIdx, Vec<BucketEntry>>,
}

impl DbTransition {
    /// Computes the transition of `ctx.space`.
    pub fn new(ctx: &TransitionContext<'_>, directory: BucketDirectory) -> Self {
        let old_state = ctx.prev_view.derived(ctx.space);
        let new_state = ctx.new_view.derived(ctx.space);

        let mut outdated = ctx.outdated_nodes.clone();
        if ctx.distribution_changed {
            outdated.extend(0..new_state.node_count(NodeType::Storage));
        } else {
            outdated.extend(changed_storage_nodes(old_state, new_state));
            outdated.extend(
                ctx.distribution
                    .changed_owners(old_state, new_state, ctx.up_states),
            );
        }

        let ownership_transfer = ctx.distribution_changed
            || available_distributors(ctx.prev_view.baseline(), ctx.up_states)
                != available_distributors(ctx.new_view.baseline(), ctx.up_states);

        debug!(
            space = %ctx.space,
            ?outdated,
            ownership_transfer,
            "computed bucket space transition"
        );

        Self {
            space: ctx.space,
            directory,
            new_state: new_state.clone(),
            up_states: ctx.up_states.clone(),
            outdated,
            ownership_transfer,
            replies: BTreeMap::new(),
        }
    }

    /// Inventory reported by `node`, if it has replied.
    pub fn reply(&self, node: NodeIdx) -> Option<&[BucketEntry]> {
        self.replies.get(&node).map(Vec::as_slice)
    }
}

impl BucketSpaceTransition for DbTransition {
    fn outdated_nodes(&self) -> &OutdatedNodes {
        &self.outdated
    }

    fn ownership_transfer_required(&self) -> bool {
        self.ownership_transfer
    }

    fn record_reply(&mut self, node: NodeIdx, inventory: Vec<BucketEntry>) {
        self.replies.insert(node, inventory);
    }

    fn merge_into_directory(&mut self) {
        let unavailable: BTreeSet<NodeIdx> = self
            .directory
            .nodes(self.space)
            .into_iter()
            .filter(|node| {
                !self
                    .up_states
                    .contains(self.new_state.node_state(NodeRef::storage(*node)))
            })
            .collect();
        self.directory.remove_nodes(self.space, &unavailable);

        for (node, inventory) in &self.replies {
            self.directory.replace_node(self.space, *node, inventory);
        }

        debug!(
            space = %self.space,
            removed = ?unavailable,
            replied = self.replies.len(),
            "merged bucket space transition"
        );
    }
}

/// Creates a [`DbTransition`] for every bucket space.
#[derive(Debug, Clone)]
pub struct DbTransitionFactory {
    directory: BucketDirectory,
}

impl DbTransitionFactory {
    pub fn new(directory: BucketDirectory) -> Self {
        Self { directory }
    }
}

impl TransitionFactory for DbTransitionFactory {
    fn create(&self, ctx: &TransitionContext<'_>) -> Box<dyn BucketSpaceTransition> {
        Box::new(DbTransition::new(ctx, self.directory.clone()))
    }
}

fn changed_storage_nodes<'a>(
    old: &'a ClusterState,
    new: &'a ClusterState,
) -> impl Iterator<Item = NodeIdx> + 'a {
    let count = old
        .node_count(NodeType::Storage)
        .max(new.node_count(NodeType::Storage));
    (0..count).filter(move |idx| {
        let node = NodeRef::storage(*idx);
        old.node_state(node) != new.node_state(node)
    })
}

fn available_distributors(state: &ClusterState, up: &UpStates) -> BTreeSet<NodeIdx> {
    state.available_nodes(NodeType::Distributor, up).collect()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{BucketId, BucketInfo, Distribution, MembershipView, node::NodeState},
    };

    struct Fixture {
        distribution: Distribution,
        up: UpStates,
        empty: OutdatedNodes,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                distribution: Distribution::new(2, 64).unwrap(),
                up: UpStates::default(),
                empty: OutdatedNodes::new(),
            }
        }

        fn ctx<'a>(
            &'a self,
            prev: &'a MembershipView,
            new: &'a MembershipView,
            distribution_changed: bool,
        ) -> TransitionContext<'a> {
            TransitionContext {
                space: BucketSpace::DEFAULT,
                distribution: &self.distribution,
                prev_view: prev,
                new_view: new,
                distribution_changed,
                outdated_nodes: &self.empty,
                up_states: &self.up,
            }
        }
    }

    #[test]
    fn unchanged_view_has_nothing_outdated() {
        let fixture = Fixture::new();
        let view = MembershipView::new(ClusterState::new(1, 2, 4));
        let transition =
            DbTransition::new(&fixture.ctx(&view, &view, false), BucketDirectory::new());
        assert!(transition.outdated_nodes().is_empty());
        assert!(!transition.ownership_transfer_required());
    }

    #[test]
    fn node_coming_up_is_outdated() {
        let fixture = Fixture::new();
        let old = ClusterState::new(1, 2, 4).with_node_state(NodeRef::storage(3), NodeState::Down);
        let new = ClusterState::new(2, 2, 4);
        let (prev, new) = (MembershipView::new(old), MembershipView::new(new));

        let transition =
            DbTransition::new(&fixture.ctx(&prev, &new, false), BucketDirectory::new());
        assert!(transition.outdated_nodes().contains(&3));
        assert!(!transition.ownership_transfer_required());
    }

    #[test]
    fn distribution_change_outdates_everything() {
        let fixture = Fixture::new();
        let view = MembershipView::new(ClusterState::new(1, 2, 4));
        let transition =
            DbTransition::new(&fixture.ctx(&view, &view, true), BucketDirectory::new());
        assert_eq!(
            transition.outdated_nodes(),
            &OutdatedNodes::from([0, 1, 2, 3])
        );
        assert!(transition.ownership_transfer_required());
    }

    #[test]
    fn distributor_change_transfers_ownership() {
        let fixture = Fixture::new();
        let prev = MembershipView::new(ClusterState::new(1, 2, 4));
        let new = MembershipView::new(
            ClusterState::new(2, 2, 4).with_node_state(NodeRef::distributor(1), NodeState::Down),
        );
        let transition =
            DbTransition::new(&fixture.ctx(&prev, &new, false), BucketDirectory::new());
        assert!(transition.ownership_transfer_required());
        // Storage layout did not change.
        assert!(transition.outdated_nodes().is_empty());
    }

    #[test]
    fn previously_outdated_nodes_are_kept() {
        let fixture = Fixture::new();
        let view = MembershipView::new(ClusterState::new(1, 2, 4));
        let carried = OutdatedNodes::from([2]);
        let ctx = TransitionContext {
            outdated_nodes: &carried,
            ..fixture.ctx(&view, &view, false)
        };
        let transition = DbTransition::new(&ctx, BucketDirectory::new());
        assert_eq!(transition.outdated_nodes(), &carried);
    }

    #[test]
    fn merge_replaces_inventory_and_drops_unavailable_nodes() {
        let fixture = Fixture::new();
        let directory = BucketDirectory::new();
        let space = BucketSpace::DEFAULT;
        let info = BucketInfo {
            checksum: 1,
            doc_count: 1,
        };
        let (b1, b2) = (BucketId::new(1), BucketId::new(2));
        directory.insert(space, b1, 1, info);
        directory.insert(space, b1, 0, info);

        let prev = MembershipView::new(ClusterState::new(1, 1, 4));
        let new = MembershipView::new(
            ClusterState::new(2, 1, 4).with_node_state(NodeRef::storage(1), NodeState::Retired),
        );
        let mut transition = DbTransition::new(&fixture.ctx(&prev, &new, false), directory.clone());
        transition.record_reply(2, vec![BucketEntry::new(b1, info), BucketEntry::new(b2, info)]);
        transition.record_reply(0, vec![]);
        assert_eq!(transition.reply(0), Some(&[][..]));
        assert_eq!(transition.reply(3), None);

        transition.merge_into_directory();
        assert_eq!(directory.copies(space, b1), vec![(2, info)]);
        assert_eq!(directory.copies(space, b2), vec![(2, info)]);
        assert!(directory.buckets_on(space, 1).is_empty());
    }
}
