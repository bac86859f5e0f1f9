use {
    super::{
        BucketSpace,
        BucketSpaceRepo,
        ClusterStateTransition,
        Clock,
        Distribution,
        MembershipView,
        MessageSender,
        PollReply,
        SetStateCommand,
        Summary,
        TransitionBuilder,
        TransitionConfig,
        TransitionResult,
        transition::{OutdatedNodesMap, TransitionFactory},
    },
    std::sync::Arc,
    tracing::{debug, info},
};

/// Drives cluster state transitions of a single distributor.
///
/// Keeps the accepted membership view and at most one pending transition.
/// A newer membership change supersedes the pending transition: its
/// outdated nodes are carried over to the new one and its in-flight requests
/// are forgotten. Completed transitions are merged into the bucket
/// directory right away.
pub struct StateUpdater<S, C, F> {
    sender: S,
    clock: C,
    factory: F,
    repo: BucketSpaceRepo,
    config: TransitionConfig,
    current: MembershipView,
    pending: Option<ClusterStateTransition<S, C>>,
    last_summary: Option<Summary>,
}

impl<S, C, F> StateUpdater<S, C, F>
where
    S: MessageSender + Clone,
    C: Clock + Clone,
    F: TransitionFactory,
{
    /// Creates an updater starting from the accepted `current` view.
    pub fn new(
        sender: S,
        clock: C,
        factory: F,
        repo: BucketSpaceRepo,
        current: MembershipView,
    ) -> Self {
        Self {
            sender,
            clock,
            factory,
            repo,
            config: TransitionConfig::default(),
            current,
            pending: None,
            last_summary: None,
        }
    }

    /// Use a custom configuration for transitions started from now on.
    pub fn with_config(mut self, config: TransitionConfig) -> TransitionResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Starts a transition to the proposed cluster state.
    pub fn on_set_state(&mut self, cmd: Arc<SetStateCommand>) -> TransitionResult<()> {
        let outdated_nodes = self.supersede();
        let transition = self
            .builder()
            .with_outdated_nodes(outdated_nodes)
            .from_command(cmd)?;
        self.start(transition);
        Ok(())
    }

    /// Installs a new distribution for `space` and resynchronizes every
    /// bucket space.
    pub fn on_distribution_change(
        &mut self,
        space: BucketSpace,
        distribution: Distribution,
    ) -> TransitionResult<()> {
        self.supersede();
        self.repo.set_distribution(space, distribution);
        let transition = self.builder().from_distribution_change()?;
        self.start(transition);
        Ok(())
    }

    /// Routes a bucket info reply to the pending transition.
    ///
    /// Returns `false` if the reply belongs to no pending request.
    pub fn on_reply(&mut self, reply: PollReply) -> bool {
        let handled = self
            .pending
            .as_mut()
            .is_some_and(|transition| transition.on_reply(reply));
        if handled {
            self.complete_if_done();
        }
        handled
    }

    /// Periodic tick, sends again failed requests whose delay has passed.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if let Some(transition) = self.pending.as_mut() {
            transition.resend_due_retries(now);
        }
        self.complete_if_done();
    }

    /// Accepted membership view.
    pub fn current_view(&self) -> &MembershipView {
        &self.current
    }

    /// Transition in progress, if any.
    pub fn pending(&self) -> Option<&ClusterStateTransition<S, C>> {
        self.pending.as_ref()
    }

    /// Summary of the last merged transition.
    pub fn last_summary(&self) -> Option<&Summary> {
        self.last_summary.as_ref()
    }

    pub fn repo(&self) -> &BucketSpaceRepo {
        &self.repo
    }

    fn builder(&self) -> TransitionBuilder<'_, S, C> {
        TransitionBuilder::new(
            self.sender.clone(),
            self.clock.clone(),
            &self.repo,
            &self.factory,
            self.current.clone(),
        )
        .with_config(self.config.clone())
    }

    /// Drops the pending transition, returning its outdated nodes.
    fn supersede(&mut self) -> OutdatedNodesMap {
        match self.pending.take() {
            Some(transition) => {
                debug!(
                    in_flight = transition.pending().len(),
                    summary = ?transition.summary(),
                    "superseding pending cluster state transition"
                );
                transition.outdated_nodes_map()
            }
            None => OutdatedNodesMap::new(),
        }
    }

    fn start(&mut self, transition: ClusterStateTransition<S, C>) {
        self.pending = Some(transition);
        self.complete_if_done();
    }

    fn complete_if_done(&mut self) {
        if !self.pending.as_ref().is_some_and(|t| t.is_complete()) {
            return;
        }
        let Some(mut transition) = self.pending.take() else {
            return;
        };

        transition.merge_into_directory();
        let summary = transition.summary();
        info!(
            prev = summary.prev_state(),
            new = summary.new_state(),
            elapsed_ms = summary.elapsed_ms(),
            "cluster state transition completed"
        );
        self.current = transition.new_view().clone();
        self.last_summary = Some(summary);
    }
}
