use {
    super::{BucketSpace, CorrelationId, node::NodeRef},
    std::{
        collections::{HashMap, HashSet},
        fmt,
    },
};

/// Unit of outstanding work: one node polled for one bucket space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetKey {
    pub space: BucketSpace,
    pub node: NodeRef,
}

impl TargetKey {
    pub fn new(space: BucketSpace, node: NodeRef) -> Self {
        Self { space, node }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.space, self.node)
    }
}

/// Requests currently in flight, keyed by correlation id.
///
/// An entry exists exactly while a request is awaiting its reply. At most one
/// request per target may be in flight.
#[derive(Debug, Default)]
pub struct PendingRequestTable {
    by_id: HashMap<CorrelationId, TargetKey>,
    in_flight: HashSet<TargetKey>,
}

impl PendingRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request about to be dispatched.
    ///
    /// # Panics
    ///
    /// Panics if the correlation id is already in use, or if a request to
    /// the same target is still in flight.
    pub fn insert(&mut self, id: CorrelationId, target: TargetKey) {
        assert!(
            self.in_flight.insert(target),
            "Request to {target} already in flight"
        );
        let previous = self.by_id.insert(id, target);
        assert!(previous.is_none(), "Duplicate correlation id {id}");
    }

    /// Target of the request with the given id, if still in flight.
    pub fn get(&self, id: CorrelationId) -> Option<TargetKey> {
        self.by_id.get(&id).copied()
    }

    /// Resolves the request with the given id.
    pub fn remove(&mut self, id: CorrelationId) -> Option<TargetKey> {
        self.by_id.remove(&id).map(|target| {
            self.in_flight.remove(&target);
            target
        })
    }

    /// Whether a request to `target` is in flight.
    pub fn contains_target(&self, target: &TargetKey) -> bool {
        self.in_flight.contains(target)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterator over in-flight requests, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (CorrelationId, TargetKey)> + '_ {
        self.by_id.iter().map(|(id, target)| (*id, *target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(node: u16) -> TargetKey {
        TargetKey::new(BucketSpace::DEFAULT, NodeRef::storage(node))
    }

    #[test]
    fn basic_ops() {
        let mut table = PendingRequestTable::new();
        assert!(table.is_empty());

        table.insert(CorrelationId::new(1), target(0));
        table.insert(CorrelationId::new(2), target(1));
        // Same node, different space.
        table.insert(
            CorrelationId::new(3),
            TargetKey::new(BucketSpace::GLOBAL, NodeRef::storage(0)),
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(CorrelationId::new(2)), Some(target(1)));
        assert!(table.contains_target(&target(0)));

        assert_eq!(table.remove(CorrelationId::new(1)), Some(target(0)));
        assert_eq!(table.remove(CorrelationId::new(1)), None);
        assert!(!table.contains_target(&target(0)));
        assert_eq!(table.get(CorrelationId::new(99)), None);

        // Target may be requested again once resolved.
        table.insert(CorrelationId::new(4), target(0));
        assert_eq!(table.len(), 3);
    }

    #[test]
    #[should_panic(expected = "already in flight")]
    fn one_request_per_target() {
        let mut table = PendingRequestTable::new();
        table.insert(CorrelationId::new(1), target(0));
        table.insert(CorrelationId::new(2), target(0));
    }

    #[test]
    #[should_panic(expected = "Duplicate correlation id")]
    fn unique_correlation_ids() {
        let mut table = PendingRequestTable::new();
        table.insert(CorrelationId::new(1), target(0));
        table.insert(CorrelationId::new(1), target(1));
    }
}
