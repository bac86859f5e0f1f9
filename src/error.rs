#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TransitionError {
    /// Cluster state token is not of `key:value` form.
    #[error("Malformed cluster state token: '{0}'")]
    MalformedToken(String),

    /// Unknown single-character node state.
    #[error("Unknown node state: '{0}'")]
    UnknownNodeState(String),

    /// Numeric field could not be parsed.
    #[error("Invalid number in token '{0}'")]
    InvalidNumber(String),

    /// Node state given before any node type was named.
    #[error("Node state '{0}' given without a preceding node type")]
    MissingNodeType(String),

    /// Node index is not covered by the node count of its type.
    #[error("Node index {index} out of range for node count {count}")]
    NodeIndexOutOfRange { index: u16, count: u16 },

    /// Redundancy of a distribution must be at least one.
    #[error("Invalid redundancy: {0}")]
    InvalidRedundancy(usize),

    /// Distribution must cover at least one superbucket.
    #[error("Invalid superbucket count: {0}")]
    InvalidSuperbucketCount(u32),

    /// Retry delay must be non-zero.
    #[error("Retry delay must be positive")]
    ZeroRetryDelay,

    /// At least one node state must count as available.
    #[error("Empty set of storage up states")]
    NoUpStates,
}

pub type TransitionResult<T> = Result<T, TransitionError>;
