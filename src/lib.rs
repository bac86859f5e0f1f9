//! Cluster state transitions for distribution-aware storage clusters.
//!
//! When cluster membership (or the distribution configuration) changes,
//! the cached knowledge of which storage node holds which bucket may be
//! stale. A [`ClusterStateTransition`] figures out which storage nodes are
//! outdated, asks them for their bucket inventory, retries failed requests,
//! and signals when the new membership view may be merged into the
//! [`BucketDirectory`].
//!
//! ```
//! use {
//!     cluster_transition::{
//!         BucketDirectory, BucketSpaceRepo, ClusterState, DbTransitionFactory, Distribution,
//!         ManualClock, MembershipView, MessageSender, CorrelationId, NodeRef, PollRequest,
//!         SetStateCommand, StateUpdater,
//!     },
//!     std::{cell::Cell, sync::Arc},
//! };
//!
//! #[derive(Default)]
//! struct NullSender(Cell<u64>);
//!
//! impl MessageSender for NullSender {
//!     fn own_index(&self) -> u16 {
//!         0
//!     }
//!
//!     fn next_correlation_id(&self) -> CorrelationId {
//!         self.0.set(self.0.get() + 1);
//!         CorrelationId::new(self.0.get())
//!     }
//!
//!     fn send_to_node(&self, _node: NodeRef, _request: PollRequest) {}
//! }
//!
//! let sender = Arc::new(NullSender::default());
//! let clock = Arc::new(ManualClock::new());
//! let repo = BucketSpaceRepo::with_fixed_spaces(Distribution::new(2, 64).unwrap());
//! let factory = DbTransitionFactory::new(BucketDirectory::new());
//! let current = MembershipView::new("version:1 distributor:1 storage:4".parse().unwrap());
//!
//! let mut updater = StateUpdater::new(sender, clock, factory, repo, current);
//! let new: ClusterState = "version:2 distributor:1 storage:4 .1.s:r".parse().unwrap();
//! updater
//!     .on_set_state(Arc::new(SetStateCommand::new(MembershipView::new(new))))
//!     .unwrap();
//!
//! // Bucket info requests are in flight.
//! assert!(updater.pending().is_some());
//! ```

mod builder;
mod clock;
mod config;
mod coordinator;
mod db_transition;
mod directory;
mod distribution;
mod error;
mod message;
mod node;
mod pending;
mod retry;
mod space;
mod summary;
mod transition;
mod updater;
mod view;

pub use {
    builder::TransitionBuilder,
    clock::{Clock, ManualClock, SystemClock},
    config::{DEFAULT_RETRY_DELAY_MS, TransitionConfig},
    coordinator::{ClusterStateTransition, SetStateCommand, TransitionCause},
    db_transition::{DbTransition, DbTransitionFactory},
    directory::{BucketDirectory, BucketEntry, BucketId, BucketInfo},
    distribution::Distribution,
    error::{TransitionError, TransitionResult},
    message::{CorrelationId, MessageSender, PollReply, PollRequest, Priority, ReturnCode},
    node::{NodeIdx, NodeRef, NodeState, NodeType, UpStates},
    pending::{PendingRequestTable, TargetKey},
    retry::RetryQueue,
    space::{BucketSpace, BucketSpaceRepo},
    summary::Summary,
    transition::{
        BucketSpaceTransition,
        OutdatedNodes,
        OutdatedNodesMap,
        TransitionContext,
        TransitionFactory,
    },
    updater::StateUpdater,
    view::{ClusterState, MembershipView},
};
