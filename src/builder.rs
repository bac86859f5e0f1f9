use {
    super::{
        BucketSpaceRepo,
        ClusterStateTransition,
        Clock,
        MembershipView,
        MessageSender,
        TransitionConfig,
        TransitionResult,
        coordinator::{SetStateCommand, TransitionCause},
        transition::{OutdatedNodesMap, TransitionFactory},
    },
    std::sync::Arc,
};

/// Cluster state transition builder.
///
/// Collects what both construction paths share, the path itself is picked
/// by the finishing call:
/// [`from_command()`](Self::from_command) for an explicit new cluster state,
/// [`from_distribution_change()`](Self::from_distribution_change) for a
/// placement change without membership delta.
pub struct TransitionBuilder<'a, S, C> {
    sender: S,
    clock: C,
    repo: &'a BucketSpaceRepo,
    factory: &'a dyn TransitionFactory,
    prev_view: MembershipView,
    outdated_nodes: OutdatedNodesMap,
    config: TransitionConfig,
}

impl<'a, S: MessageSender, C: Clock> TransitionBuilder<'a, S, C> {
    /// Create new transition builder starting from the accepted `prev_view`.
    pub fn new(
        sender: S,
        clock: C,
        repo: &'a BucketSpaceRepo,
        factory: &'a dyn TransitionFactory,
        prev_view: MembershipView,
    ) -> Self {
        Self {
            sender,
            clock,
            repo,
            factory,
            prev_view,
            outdated_nodes: OutdatedNodesMap::new(),
            config: TransitionConfig::default(),
        }
    }

    /// Carry over outdated nodes of a superseded transition.
    pub fn with_outdated_nodes(mut self, outdated_nodes: OutdatedNodesMap) -> Self {
        self.outdated_nodes = outdated_nodes;
        self
    }

    /// Use a custom configuration.
    pub fn with_config(mut self, config: TransitionConfig) -> Self {
        self.config = config;
        self
    }

    /// Build a transition to the cluster state carried by `cmd`.
    ///
    /// The new view is stamped with the current distribution generation of
    /// the repo. Distribution is considered changed only if the accepted view
    /// was built under an older generation.
    pub fn from_command(
        self,
        cmd: Arc<SetStateCommand>,
    ) -> TransitionResult<ClusterStateTransition<S, C>> {
        self.config.validate()?;
        let generation = self.repo.generation();
        let new_view = cmd.view().clone().with_distribution_generation(generation);
        let distribution_changed = self.prev_view.distribution_generation() != generation;

        Ok(ClusterStateTransition::new(
            self.sender,
            self.clock,
            self.repo,
            self.factory,
            TransitionCause::StateCommand(cmd),
            self.prev_view,
            new_view,
            distribution_changed,
            &self.outdated_nodes,
            self.config,
        ))
    }

    /// Build a transition caused by a distribution change.
    ///
    /// Membership stays the same, but every bucket may have changed owner,
    /// so every space is fully resynchronized. Outdated nodes carried over
    /// are ignored, since every node is outdated anyway.
    pub fn from_distribution_change(self) -> TransitionResult<ClusterStateTransition<S, C>> {
        self.config.validate()?;
        let new_view = self
            .prev_view
            .clone()
            .with_distribution_generation(self.repo.generation());

        Ok(ClusterStateTransition::new(
            self.sender,
            self.clock,
            self.repo,
            self.factory,
            TransitionCause::DistributionChange,
            self.prev_view,
            new_view,
            true,
            &OutdatedNodesMap::new(),
            self.config,
        ))
    }
}
