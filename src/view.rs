use {
    super::{
        BucketSpace,
        TransitionError,
        TransitionResult,
        node::{NodeIdx, NodeRef, NodeState, NodeType, UpStates},
    },
    std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc},
};

/// Snapshot of node availability for every node in the cluster.
///
/// Textual form is a whitespace separated list of `key:value` tokens, e.g.
/// `version:3 distributor:4 storage:4 .1.s:r`. A `.{index}.s:{state}` token
/// applies to the node type named last. Nodes of a type not mentioned
/// explicitly are up, nodes beyond the node count are down.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterState {
    version: u32,
    cluster_down: bool,
    distributors: Vec<NodeState>,
    storage: Vec<NodeState>,
}

impl ClusterState {
    /// Creates a state with all nodes of both types up.
    pub fn new(version: u32, distributors: NodeIdx, storage: NodeIdx) -> Self {
        Self {
            version,
            cluster_down: false,
            distributors: vec![NodeState::Up; distributors as usize],
            storage: vec![NodeState::Up; storage as usize],
        }
    }

    /// Returns the same state with the given node set to `state`.
    ///
    /// Node count of the type grows when `node` lies beyond it, the nodes in
    /// between are down.
    pub fn with_node_state(mut self, node: NodeRef, state: NodeState) -> Self {
        let nodes = self.nodes_mut(node.node_type());
        let idx = node.index() as usize;
        if idx >= nodes.len() {
            nodes.resize(idx + 1, NodeState::Down);
        }
        nodes[idx] = state;
        self
    }

    /// Returns the same state with the cluster marked down (or up).
    pub fn with_cluster_down(mut self, down: bool) -> Self {
        self.cluster_down = down;
        self
    }

    /// Returns the same state with a different version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether the cluster as a whole is down.
    pub fn is_cluster_down(&self) -> bool {
        self.cluster_down
    }

    /// Number of nodes of the given type.
    pub fn node_count(&self, node_type: NodeType) -> NodeIdx {
        self.nodes(node_type).len() as NodeIdx
    }

    /// State of the given node, nodes outside of the state are down.
    pub fn node_state(&self, node: NodeRef) -> NodeState {
        self.nodes(node.node_type())
            .get(node.index() as usize)
            .copied()
            .unwrap_or(NodeState::Down)
    }

    /// Indexes of the nodes of the given type whose state is one of `up`.
    pub fn available_nodes<'a>(
        &'a self,
        node_type: NodeType,
        up: &'a UpStates,
    ) -> impl Iterator<Item = NodeIdx> + 'a {
        self.nodes(node_type)
            .iter()
            .enumerate()
            .filter(|(_, state)| up.contains(**state))
            .map(|(idx, _)| idx as NodeIdx)
    }

    fn nodes(&self, node_type: NodeType) -> &Vec<NodeState> {
        match node_type {
            NodeType::Distributor => &self.distributors,
            NodeType::Storage => &self.storage,
        }
    }

    fn nodes_mut(&mut self, node_type: NodeType) -> &mut Vec<NodeState> {
        match node_type {
            NodeType::Distributor => &mut self.distributors,
            NodeType::Storage => &mut self.storage,
        }
    }
}

impl FromStr for ClusterState {
    type Err = TransitionError;

    fn from_str(s: &str) -> TransitionResult<Self> {
        let mut state = ClusterState::default();
        let mut current: Option<NodeType> = None;

        for token in s.split_whitespace() {
            let (key, value) = token
                .split_once(':')
                .ok_or_else(|| TransitionError::MalformedToken(token.to_string()))?;
            let number = |v: &str| -> TransitionResult<u32> {
                v.parse()
                    .map_err(|_| TransitionError::InvalidNumber(token.to_string()))
            };

            match key {
                "version" => state.version = number(value)?,
                "cluster" => {
                    state.cluster_down = match value.parse::<NodeState>()? {
                        NodeState::Down => true,
                        NodeState::Up => false,
                        _ => return Err(TransitionError::UnknownNodeState(value.to_string())),
                    }
                }
                "bits" => {
                    number(value)?;
                }
                "distributor" | "storage" => {
                    let node_type = if key == "storage" {
                        NodeType::Storage
                    } else {
                        NodeType::Distributor
                    };
                    let count = number(value)?;
                    let count = NodeIdx::try_from(count)
                        .map_err(|_| TransitionError::InvalidNumber(token.to_string()))?;
                    *state.nodes_mut(node_type) = vec![NodeState::Up; count as usize];
                    current = Some(node_type);
                }
                key if key.starts_with('.') => {
                    let node_type =
                        current.ok_or_else(|| TransitionError::MissingNodeType(token.to_string()))?;
                    let index = match key[1..].split_once('.') {
                        Some((index, "s")) => index
                            .parse::<NodeIdx>()
                            .map_err(|_| TransitionError::InvalidNumber(token.to_string()))?,
                        // Other per-node attributes are not tracked.
                        Some(_) => continue,
                        None => return Err(TransitionError::MalformedToken(token.to_string())),
                    };
                    let nodes = state.nodes_mut(node_type);
                    let count = nodes.len() as NodeIdx;
                    let slot = nodes
                        .get_mut(index as usize)
                        .ok_or(TransitionError::NodeIndexOutOfRange { index, count })?;
                    *slot = value.parse()?;
                }
                _ => return Err(TransitionError::MalformedToken(token.to_string())),
            }
        }

        Ok(state)
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = Vec::new();
        if self.version != 0 {
            tokens.push(format!("version:{}", self.version));
        }
        if self.cluster_down {
            tokens.push("cluster:d".to_string());
        }
        for node_type in [NodeType::Distributor, NodeType::Storage] {
            let nodes = self.nodes(node_type);
            if nodes.is_empty() {
                continue;
            }
            tokens.push(format!("{}:{}", node_type, nodes.len()));
            for (idx, state) in nodes.iter().enumerate() {
                if *state != NodeState::Up {
                    tokens.push(format!(".{idx}.s:{state}"));
                }
            }
        }
        f.write_str(&tokens.join(" "))
    }
}

/// Accepted (or proposed) membership of the cluster.
///
/// Holds a baseline cluster state, an optional derived state per bucket
/// space (spaces without one use the baseline) and the distribution
/// generation in effect. Views are immutable, states are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipView {
    baseline: Arc<ClusterState>,
    derived: BTreeMap<BucketSpace, Arc<ClusterState>>,
    distribution_generation: u64,
}

impl MembershipView {
    /// Creates a view where every space uses the baseline state.
    pub fn new(baseline: ClusterState) -> Self {
        Self {
            baseline: Arc::new(baseline),
            derived: BTreeMap::new(),
            distribution_generation: 0,
        }
    }

    /// Returns the same view with a derived state for the given space.
    pub fn with_derived(mut self, space: BucketSpace, state: ClusterState) -> Self {
        self.derived.insert(space, Arc::new(state));
        self
    }

    /// Returns the same view tagged with a distribution generation.
    pub fn with_distribution_generation(mut self, generation: u64) -> Self {
        self.distribution_generation = generation;
        self
    }

    pub fn baseline(&self) -> &Arc<ClusterState> {
        &self.baseline
    }

    /// State of the given space, falling back to the baseline.
    pub fn derived(&self, space: BucketSpace) -> &Arc<ClusterState> {
        self.derived.get(&space).unwrap_or(&self.baseline)
    }

    pub fn distribution_generation(&self) -> u64 {
        self.distribution_generation
    }
}

impl fmt::Display for MembershipView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.baseline)?;
        for (space, state) in &self.derived {
            if **state != *self.baseline {
                write!(f, ", {space} '{state}'")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let state: ClusterState = "version:3 distributor:4 .0.s:d storage:4 .1.s:r .3.s:m"
            .parse()
            .unwrap();
        assert_eq!(state.version(), 3);
        assert!(!state.is_cluster_down());
        assert_eq!(state.node_count(NodeType::Distributor), 4);
        assert_eq!(state.node_count(NodeType::Storage), 4);
        assert_eq!(state.node_state(NodeRef::distributor(0)), NodeState::Down);
        assert_eq!(state.node_state(NodeRef::distributor(1)), NodeState::Up);
        assert_eq!(state.node_state(NodeRef::storage(1)), NodeState::Retired);
        assert_eq!(state.node_state(NodeRef::storage(3)), NodeState::Maintenance);
        assert_eq!(state.node_state(NodeRef::storage(4)), NodeState::Down);
        assert_eq!(
            state.to_string(),
            "version:3 distributor:4 .0.s:d storage:4 .1.s:r .3.s:m"
        );

        let down: ClusterState = "version:5 bits:16 cluster:d storage:2".parse().unwrap();
        assert!(down.is_cluster_down());
        assert_eq!(down.to_string(), "version:5 cluster:d storage:2");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            "storage".parse::<ClusterState>(),
            Err(TransitionError::MalformedToken("storage".to_string()))
        );
        assert_eq!(
            ".1.s:d storage:2".parse::<ClusterState>(),
            Err(TransitionError::MissingNodeType(".1.s:d".to_string()))
        );
        assert_eq!(
            "storage:2 .5.s:d".parse::<ClusterState>(),
            Err(TransitionError::NodeIndexOutOfRange { index: 5, count: 2 })
        );
        assert_eq!(
            "storage:2 .1.s:q".parse::<ClusterState>(),
            Err(TransitionError::UnknownNodeState("q".to_string()))
        );
        assert_eq!(
            "version:x".parse::<ClusterState>(),
            Err(TransitionError::InvalidNumber("version:x".to_string()))
        );
    }

    #[test]
    fn builder_methods() {
        let state = ClusterState::new(7, 2, 3)
            .with_node_state(NodeRef::storage(5), NodeState::Initializing)
            .with_node_state(NodeRef::distributor(1), NodeState::Down);
        assert_eq!(state.node_count(NodeType::Storage), 6);
        assert_eq!(state.node_state(NodeRef::storage(3)), NodeState::Down);
        assert_eq!(
            state.to_string(),
            "version:7 distributor:2 .1.s:d storage:6 .3.s:d .4.s:d .5.s:i"
        );

        let up = UpStates::default();
        let available: Vec<_> = state.available_nodes(NodeType::Storage, &up).collect();
        assert_eq!(available, vec![0, 1, 2, 5]);
    }

    #[test]
    fn view_falls_back_to_baseline() {
        let baseline = ClusterState::new(1, 2, 2);
        let global = baseline
            .clone()
            .with_node_state(NodeRef::storage(1), NodeState::Maintenance);
        let view = MembershipView::new(baseline.clone())
            .with_derived(BucketSpace::GLOBAL, global.clone());

        assert_eq!(**view.derived(BucketSpace::DEFAULT), baseline);
        assert_eq!(**view.derived(BucketSpace::GLOBAL), global);
        assert_eq!(
            view.to_string(),
            "'version:1 distributor:2 storage:2', global 'version:1 distributor:2 storage:2 .1.s:m'"
        );
    }
}
