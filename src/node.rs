use {
    super::{TransitionError, TransitionResult},
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
};

/// Index of a node within its node type.
pub type NodeIdx = u16;

/// Kind of node taking part in the cluster.
///
/// Storage nodes hold buckets and answer bucket info polls, distributors
/// track which storage node holds which bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeType {
    Distributor,
    Storage,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Distributor => f.write_str("distributor"),
            NodeType::Storage => f.write_str("storage"),
        }
    }
}

/// Stable identity of a node within a membership view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    node_type: NodeType,
    index: NodeIdx,
}

impl NodeRef {
    /// Creates a reference to the node of the given type and index.
    pub const fn new(node_type: NodeType, index: NodeIdx) -> Self {
        Self { node_type, index }
    }

    /// Reference to a storage node.
    pub const fn storage(index: NodeIdx) -> Self {
        Self::new(NodeType::Storage, index)
    }

    /// Reference to a distributor node.
    pub const fn distributor(index: NodeIdx) -> Self {
        Self::new(NodeType::Distributor, index)
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn index(&self) -> NodeIdx {
        self.index
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_type, self.index)
    }
}

/// Availability state of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Up,
    Down,
    Retired,
    Maintenance,
    Initializing,
    Stopping,
}

impl NodeState {
    /// Single character code used in the textual cluster state format.
    pub fn code(&self) -> char {
        match self {
            NodeState::Up => 'u',
            NodeState::Down => 'd',
            NodeState::Retired => 'r',
            NodeState::Maintenance => 'm',
            NodeState::Initializing => 'i',
            NodeState::Stopping => 's',
        }
    }
}

impl FromStr for NodeState {
    type Err = TransitionError;

    fn from_str(s: &str) -> TransitionResult<Self> {
        match s {
            "u" => Ok(NodeState::Up),
            "d" => Ok(NodeState::Down),
            "r" => Ok(NodeState::Retired),
            "m" => Ok(NodeState::Maintenance),
            "i" => Ok(NodeState::Initializing),
            "s" => Ok(NodeState::Stopping),
            other => Err(TransitionError::UnknownNodeState(other.to_string())),
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Set of node states considered available.
///
/// A storage node is only asked for bucket info when its state in the new
/// membership view is one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpStates(Vec<NodeState>);

impl Default for UpStates {
    fn default() -> Self {
        Self(vec![NodeState::Up, NodeState::Initializing])
    }
}

impl UpStates {
    /// Creates a set from the given states.
    pub fn new<I: IntoIterator<Item = NodeState>>(states: I) -> Self {
        let mut unique = Vec::new();
        for state in states {
            if !unique.contains(&state) {
                unique.push(state);
            }
        }
        Self(unique)
    }

    /// Returns `true` if `state` counts as available.
    pub fn contains(&self, state: NodeState) -> bool {
        self.0.contains(&state)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeState> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes() {
        for state in [
            NodeState::Up,
            NodeState::Down,
            NodeState::Retired,
            NodeState::Maintenance,
            NodeState::Initializing,
            NodeState::Stopping,
        ] {
            let parsed: NodeState = state.code().to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert_eq!(
            "x".parse::<NodeState>(),
            Err(TransitionError::UnknownNodeState("x".to_string()))
        );
    }

    #[test]
    fn default_up_states() {
        let up = UpStates::default();
        assert!(up.contains(NodeState::Up));
        assert!(up.contains(NodeState::Initializing));
        assert!(!up.contains(NodeState::Retired));
        assert!(!up.contains(NodeState::Down));
        assert!(!up.contains(NodeState::Maintenance));
    }

    #[test]
    fn node_ordering() {
        let mut nodes = vec![
            NodeRef::storage(2),
            NodeRef::distributor(3),
            NodeRef::storage(0),
        ];
        nodes.sort();
        assert_eq!(
            nodes,
            vec![
                NodeRef::distributor(3),
                NodeRef::storage(0),
                NodeRef::storage(2)
            ]
        );
        assert_eq!(NodeRef::storage(7).to_string(), "storage.7");
    }
}
