use {
    super::{
        BucketEntry,
        BucketSpace,
        BucketSpaceRepo,
        Clock,
        MembershipView,
        MessageSender,
        PendingRequestTable,
        PollReply,
        PollRequest,
        RetryQueue,
        ReturnCode,
        Summary,
        TargetKey,
        TransitionConfig,
        node::{NodeIdx, NodeRef, NodeState, NodeType},
        transition::{BucketSpaceTransition, OutdatedNodesMap, TransitionContext, TransitionFactory},
    },
    std::{
        collections::{BTreeMap, BTreeSet},
        fmt::{self, Write},
        sync::Arc,
        time::Instant,
    },
    tracing::debug,
};

/// Explicit proposal of a new cluster state.
#[derive(Debug, Clone)]
pub struct SetStateCommand {
    view: MembershipView,
}

impl SetStateCommand {
    pub fn new(view: MembershipView) -> Self {
        Self { view }
    }

    pub fn view(&self) -> &MembershipView {
        &self.view
    }
}

/// What triggered a cluster state transition.
#[derive(Debug, Clone)]
pub enum TransitionCause {
    /// A new cluster state was proposed.
    StateCommand(Arc<SetStateCommand>),

    /// Distribution configuration changed, membership did not.
    DistributionChange,
}

/// One in-flight transition from the accepted membership view to a new one.
///
/// On creation, every bucket space decides which storage nodes are outdated,
/// and those still available in the new view are asked for their bucket
/// inventory. From then on the transition is driven by replies
/// ([`on_reply()`](Self::on_reply)) and a periodic tick
/// ([`resend_due_retries()`](Self::resend_due_retries)). Failed requests are
/// retried after a fixed delay for as long as the transition lives.
///
/// Once [`is_complete()`](Self::is_complete), the owner merges the
/// collected inventories with [`merge_into_directory()`](Self::merge_into_directory)
/// and drops the transition. A newer membership change supersedes the
/// transition by dropping it, late replies are then unknown to its successor.
///
/// Not internally synchronized: all calls for one transition must come from
/// a single thread of control.
pub struct ClusterStateTransition<S, C> {
    sender: S,
    clock: C,
    cause: TransitionCause,
    prev_view: MembershipView,
    new_view: MembershipView,
    config: TransitionConfig,
    created_at: Instant,

    /// Per bucket space transitions, owned for the whole transition.
    transitions: BTreeMap<BucketSpace, Box<dyn BucketSpaceTransition>>,

    /// Distribution fingerprint of every space, sent along with requests.
    distribution_hashes: BTreeMap<BucketSpace, String>,

    /// Set once any space requires a full resync, never cleared.
    ownership_transfer: bool,

    pending: PendingRequestTable,
    retries: RetryQueue,

    /// Storage nodes ever asked for bucket info.
    requested: BTreeSet<NodeIdx>,

    /// Storage nodes which answered at least once.
    replied: BTreeSet<NodeIdx>,

    merged: bool,
}

impl<S: MessageSender, C: Clock> ClusterStateTransition<S, C> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        sender: S,
        clock: C,
        repo: &BucketSpaceRepo,
        factory: &dyn TransitionFactory,
        cause: TransitionCause,
        prev_view: MembershipView,
        new_view: MembershipView,
        distribution_changed: bool,
        outdated_nodes: &OutdatedNodesMap,
        config: TransitionConfig,
    ) -> Self {
        let created_at = clock.now();
        let mut this = Self {
            sender,
            clock,
            cause,
            prev_view,
            new_view,
            config,
            created_at,
            transitions: BTreeMap::new(),
            distribution_hashes: BTreeMap::new(),
            ownership_transfer: distribution_changed,
            pending: PendingRequestTable::new(),
            retries: RetryQueue::new(),
            requested: BTreeSet::new(),
            replied: BTreeSet::new(),
            merged: false,
        };

        debug!(
            prev = %this.prev_view,
            new = %this.new_view,
            distribution_changed,
            "new cluster state transition"
        );

        this.init_space_transitions(repo, factory, distribution_changed, outdated_nodes);
        if this.should_request_bucket_info() {
            this.request_nodes();
        }
        this
    }

    fn init_space_transitions(
        &mut self,
        repo: &BucketSpaceRepo,
        factory: &dyn TransitionFactory,
        distribution_changed: bool,
        outdated_nodes: &OutdatedNodesMap,
    ) {
        let no_outdated_nodes = BTreeSet::new();
        for (space, distribution) in repo.iter() {
            let ctx = TransitionContext {
                space,
                distribution,
                prev_view: &self.prev_view,
                new_view: &self.new_view,
                distribution_changed,
                outdated_nodes: outdated_nodes.get(&space).unwrap_or(&no_outdated_nodes),
                up_states: &self.config.storage_up_states,
            };
            let transition = factory.create(&ctx);
            if transition.ownership_transfer_required() {
                self.ownership_transfer = true;
            }
            self.transitions.insert(space, transition);
            self.distribution_hashes
                .insert(space, distribution.fingerprint());
        }
    }

    fn should_request_bucket_info(&self) -> bool {
        if self.cluster_is_down() {
            debug!("new cluster state has the cluster down, not requesting bucket info");
            return false;
        }
        if self.i_am_down() {
            debug!("new cluster state has this distributor down, not requesting bucket info");
            return false;
        }
        true
    }

    fn cluster_is_down(&self) -> bool {
        self.new_view.baseline().is_cluster_down()
    }

    fn i_am_down(&self) -> bool {
        let me = NodeRef::distributor(self.sender.own_index());
        self.new_view.baseline().node_state(me) == NodeState::Down
    }

    fn storage_node_up_in_new_state(&self, space: BucketSpace, node: NodeIdx) -> bool {
        let state = self.new_view.derived(space).node_state(NodeRef::storage(node));
        self.config.storage_up_states.contains(state)
    }

    fn request_nodes(&mut self) {
        let targets: Vec<TargetKey> = self
            .transitions
            .iter()
            .flat_map(|(space, transition)| {
                transition
                    .outdated_nodes()
                    .iter()
                    .map(move |node| TargetKey::new(*space, NodeRef::storage(*node)))
            })
            .filter(|target| self.storage_node_up_in_new_state(target.space, target.node.index()))
            .collect();

        for target in targets {
            self.request_node(target);
        }
    }

    fn request_node(&mut self, target: TargetKey) {
        let distribution_hash = self
            .distribution_hashes
            .get(&target.space)
            .unwrap_or_else(|| panic!("Unknown bucket space: {}", target.space))
            .clone();
        let correlation_id = self.sender.next_correlation_id();

        debug!(
            space = %target.space,
            node = target.node.index(),
            %correlation_id,
            cluster_state = %self.new_view,
            %distribution_hash,
            "requesting bucket info"
        );

        let request = PollRequest {
            correlation_id,
            space: target.space,
            distributor: self.sender.own_index(),
            cluster_state: self.new_view.derived(target.space).clone(),
            distribution_hash,
            priority: self.config.request_priority,
            timeout: None,
        };

        self.pending.insert(correlation_id, target);
        self.requested.insert(target.node.index());
        self.sender.send_to_node(target.node, request);
    }

    /// Handles a bucket info reply.
    ///
    /// Returns `false` if the reply does not belong to a request of this
    /// transition (already resolved, or sent by a superseded one).
    pub fn on_reply(&mut self, reply: PollReply) -> bool {
        let Some(target) = self.pending.get(reply.correlation_id) else {
            return false;
        };

        let inventory = match reply.result {
            // Old protocol versions cannot encode bucket spaces. Treat as a
            // node without buckets.
            ReturnCode::EncodeError => {
                debug!(
                    node = target.node.index(),
                    correlation_id = %reply.correlation_id,
                    "got encode error, pretending success with no buckets"
                );
                Vec::new()
            }
            result if !result.is_success() => {
                let wake_at = self.clock.now() + self.config.retry_delay();
                debug!(
                    space = %target.space,
                    node = target.node.index(),
                    ?result,
                    "bucket info request failed, scheduling retry"
                );
                self.pending.remove(reply.correlation_id);
                self.retries.schedule(wake_at, target);
                return true;
            }
            _ => reply.inventory,
        };

        self.record_reply(target, inventory);
        self.pending.remove(reply.correlation_id);
        true
    }

    fn record_reply(&mut self, target: TargetKey, inventory: Vec<BucketEntry>) {
        self.replied.insert(target.node.index());
        self.transition_mut(target.space)
            .record_reply(target.node.index(), inventory);
    }

    /// Sends again every failed request whose retry delay has passed.
    ///
    /// Returns the number of requests sent.
    pub fn resend_due_retries(&mut self, now: Instant) -> usize {
        let mut resent = 0;
        while let Some((_, target)) = self.retries.pop_due(now) {
            self.request_node(target);
            resent += 1;
        }
        resent
    }

    /// Nothing is in flight and nothing is waiting to be retried.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty() && self.retries.is_empty()
    }

    /// Whether [`merge_into_directory()`](Self::merge_into_directory) ran.
    pub fn is_merged(&self) -> bool {
        self.merged
    }

    /// Merges the outcome of every bucket space into the bucket directory.
    ///
    /// # Panics
    ///
    /// Panics if the transition is not complete or has already been merged.
    pub fn merge_into_directory(&mut self) {
        assert!(
            self.is_complete(),
            "Cluster state transition merged before completion"
        );
        assert!(!self.merged, "Cluster state transition merged twice");

        for transition in self.transitions.values_mut() {
            transition.merge_into_directory();
        }
        self.merged = true;
    }

    /// Snapshot of the transition for diagnostics.
    pub fn summary(&self) -> Summary {
        let elapsed = self.clock.now().saturating_duration_since(self.created_at);
        Summary::new(
            self.prev_view.to_string(),
            self.new_view.to_string(),
            elapsed.as_millis() as u64,
        )
    }
}

impl<S, C> ClusterStateTransition<S, C> {
    pub fn cause(&self) -> &TransitionCause {
        &self.cause
    }

    pub fn prev_view(&self) -> &MembershipView {
        &self.prev_view
    }

    pub fn new_view(&self) -> &MembershipView {
        &self.new_view
    }

    /// Whether any bucket space requires a full resync.
    pub fn has_ownership_transfer(&self) -> bool {
        self.ownership_transfer
    }

    /// Number of storage nodes in the new baseline state.
    pub fn new_storage_node_count(&self) -> NodeIdx {
        self.new_view.baseline().node_count(NodeType::Storage)
    }

    /// Outdated nodes of every bucket space.
    pub fn outdated_nodes_map(&self) -> OutdatedNodesMap {
        self.transitions
            .iter()
            .map(|(space, transition)| (*space, transition.outdated_nodes().clone()))
            .collect()
    }

    /// Transition of the given bucket space.
    ///
    /// # Panics
    ///
    /// Panics if the space is not part of the deployment.
    pub fn transition(&self, space: BucketSpace) -> &dyn BucketSpaceTransition {
        &**self
            .transitions
            .get(&space)
            .unwrap_or_else(|| panic!("Unknown bucket space: {space}"))
    }

    fn transition_mut(&mut self, space: BucketSpace) -> &mut Box<dyn BucketSpaceTransition> {
        self.transitions
            .get_mut(&space)
            .unwrap_or_else(|| panic!("Unknown bucket space: {space}"))
    }

    /// Requests currently awaiting a reply.
    pub fn pending(&self) -> &PendingRequestTable {
        &self.pending
    }

    /// Failed requests waiting to be sent again.
    pub fn retries(&self) -> &RetryQueue {
        &self.retries
    }

    /// Storage nodes which answered at least once.
    pub fn replied_nodes(&self) -> &BTreeSet<NodeIdx> {
        &self.replied
    }

    /// Comma separated, ascending indexes of the nodes ever asked for
    /// bucket info.
    pub fn requested_nodes_to_string(&self) -> String {
        self.requested
            .iter()
            .map(NodeIdx::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Writes the new state and the nodes with requests in flight as XML.
    pub fn write_xml<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "<systemstate_pending state=\"{}\">",
            self.new_view.baseline()
        )?;
        let mut pending: Vec<_> = self.pending.iter().map(|(_, target)| target).collect();
        pending.sort_by_key(|target| (target.node.index(), target.space));
        for target in pending {
            write!(out, "<pending node=\"{}\"/>", target.node.index())?;
        }
        write!(out, "</systemstate_pending>")
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        // Writing to a `String` cannot fail.
        let _ = self.write_xml(&mut out);
        out
    }
}
