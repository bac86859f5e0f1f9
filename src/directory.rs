use {
    super::{BucketSpace, node::NodeIdx},
    parking_lot::RwLock,
    std::{
        collections::{BTreeMap, BTreeSet},
        fmt,
        sync::Arc,
    },
};

/// Identifier of a bucket within a bucket space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketId(u64);

impl BucketId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketId(0x{:016x})", self.0)
    }
}

/// What a storage node reports about one of its bucket copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketInfo {
    pub checksum: u32,
    pub doc_count: u32,
}

/// Single entry of a node's bucket inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketEntry {
    pub bucket: BucketId,
    pub info: BucketInfo,
}

impl BucketEntry {
    pub fn new(bucket: BucketId, info: BucketInfo) -> Self {
        Self { bucket, info }
    }
}

type Copies = BTreeMap<NodeIdx, BucketInfo>;

/// Authoritative directory of which storage node holds which bucket.
///
/// Cheap to clone, all clones share the same underlying map. Readers may
/// access the directory concurrently with a merge.
#[derive(Debug, Clone, Default)]
pub struct BucketDirectory {
    inner: Arc<RwLock<BTreeMap<(BucketSpace, BucketId), Copies>>>,
}

impl BucketDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a copy of `bucket` on `node`.
    pub fn insert(&self, space: BucketSpace, bucket: BucketId, node: NodeIdx, info: BucketInfo) {
        self.inner
            .write()
            .entry((space, bucket))
            .or_default()
            .insert(node, info);
    }

    /// Copies of the given bucket, ordered by node index.
    pub fn copies(&self, space: BucketSpace, bucket: BucketId) -> Vec<(NodeIdx, BucketInfo)> {
        self.inner
            .read()
            .get(&(space, bucket))
            .map(|copies| copies.iter().map(|(node, info)| (*node, *info)).collect())
            .unwrap_or_default()
    }

    /// Buckets the directory believes `node` holds.
    pub fn buckets_on(&self, space: BucketSpace, node: NodeIdx) -> BTreeSet<BucketId> {
        self.inner
            .read()
            .iter()
            .filter(|((s, _), copies)| *s == space && copies.contains_key(&node))
            .map(|((_, bucket), _)| *bucket)
            .collect()
    }

    /// Nodes holding at least one bucket in the space.
    pub fn nodes(&self, space: BucketSpace) -> BTreeSet<NodeIdx> {
        self.inner
            .read()
            .iter()
            .filter(|((s, _), _)| *s == space)
            .flat_map(|(_, copies)| copies.keys().copied())
            .collect()
    }

    /// Number of buckets with at least one copy in the space.
    pub fn bucket_count(&self, space: BucketSpace) -> usize {
        self.inner
            .read()
            .keys()
            .filter(|(s, _)| *s == space)
            .count()
    }

    /// Drops every copy held by the given nodes in the space.
    ///
    /// Buckets left without copies are removed.
    pub fn remove_nodes(&self, space: BucketSpace, nodes: &BTreeSet<NodeIdx>) {
        if nodes.is_empty() {
            return;
        }
        self.inner.write().retain(|(s, _), copies| {
            if *s == space {
                copies.retain(|node, _| !nodes.contains(node));
            }
            !copies.is_empty()
        });
    }

    /// Replaces everything known about `node` in the space with `entries`.
    pub fn replace_node(&self, space: BucketSpace, node: NodeIdx, entries: &[BucketEntry]) {
        let mut inner = self.inner.write();
        inner.retain(|(s, _), copies| {
            if *s == space {
                copies.remove(&node);
            }
            !copies.is_empty()
        });
        for entry in entries {
            inner
                .entry((space, entry.bucket))
                .or_default()
                .insert(node, entry.info);
        }
    }
}
