use {
    super::{BucketEntry, BucketSpace, ClusterState, node::{NodeIdx, NodeRef}},
    auto_impl::auto_impl,
    serde::{Deserialize, Serialize},
    std::{fmt, sync::Arc, time::Duration},
};

/// Identifier matching a reply to the request it answers.
///
/// Assigned by the transport, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrelationId(u64);

impl CorrelationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Scheduling priority the transport gives a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    High,
    Normal,
    Low,
}

/// Request for the bucket inventory of a storage node in one bucket space.
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub correlation_id: CorrelationId,
    pub space: BucketSpace,
    /// Index of the requesting distributor.
    pub distributor: NodeIdx,
    /// State of the space the storage node should filter its buckets with.
    pub cluster_state: Arc<ClusterState>,
    /// Fingerprint of the distribution in effect, diagnostics only.
    pub distribution_hash: String,
    pub priority: Priority,
    /// `None` leaves liveness timeouts to the transport.
    pub timeout: Option<Duration>,
}

/// Outcome of a bucket info request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Ok,
    /// The node speaks an older protocol which cannot encode bucket spaces.
    EncodeError,
    NotConnected,
    Timeout,
    Busy,
    Aborted,
    InternalFailure,
}

impl ReturnCode {
    pub fn is_success(&self) -> bool {
        matches!(self, ReturnCode::Ok)
    }
}

/// Reply to a [`PollRequest`].
#[derive(Debug, Clone)]
pub struct PollReply {
    pub correlation_id: CorrelationId,
    pub result: ReturnCode,
    pub inventory: Vec<BucketEntry>,
}

impl PollReply {
    /// Successful reply carrying the node's inventory.
    pub fn ok(correlation_id: CorrelationId, inventory: Vec<BucketEntry>) -> Self {
        Self {
            correlation_id,
            result: ReturnCode::Ok,
            inventory,
        }
    }

    /// Failed reply without inventory.
    pub fn failed(correlation_id: CorrelationId, result: ReturnCode) -> Self {
        Self {
            correlation_id,
            result,
            inventory: Vec::new(),
        }
    }
}

/// Outbound side of the transport.
///
/// Sending never blocks, replies are delivered later through
/// [`ClusterStateTransition::on_reply`](crate::ClusterStateTransition::on_reply).
#[auto_impl(&, Arc, Box)]
pub trait MessageSender {
    /// Index of the distributor this process runs as.
    fn own_index(&self) -> NodeIdx;

    /// Allocates a fresh correlation id.
    fn next_correlation_id(&self) -> CorrelationId;

    /// Dispatches a request to the given node.
    fn send_to_node(&self, node: NodeRef, request: PollRequest);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_codes() {
        assert!(ReturnCode::Ok.is_success());
        for code in [
            ReturnCode::EncodeError,
            ReturnCode::NotConnected,
            ReturnCode::Timeout,
            ReturnCode::Busy,
            ReturnCode::Aborted,
            ReturnCode::InternalFailure,
        ] {
            assert!(!code.is_success());
        }

        let reply = PollReply::failed(CorrelationId::new(3), ReturnCode::Busy);
        assert!(reply.inventory.is_empty());
        assert_eq!(reply.correlation_id.to_string(), "#3");
    }
}
