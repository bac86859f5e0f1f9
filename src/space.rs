use {
    super::Distribution,
    std::{collections::BTreeMap, fmt},
};

/// Disjoint namespace of buckets.
///
/// The set of spaces is fixed per deployment, see [`BucketSpaceRepo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketSpace(u64);

impl BucketSpace {
    /// Space holding regular documents.
    pub const DEFAULT: Self = Self(1);

    /// Space holding documents replicated to every node.
    pub const GLOBAL: Self = Self(2);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BucketSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BucketSpace::DEFAULT => f.write_str("default"),
            BucketSpace::GLOBAL => f.write_str("global"),
            BucketSpace(id) => write!(f, "space#{id}"),
        }
    }
}

/// Repository of the bucket spaces of a deployment.
///
/// Holds the distribution currently in effect for every space. Every
/// distribution change bumps the generation, which membership views carry
/// to tell whether placement changed between them.
#[derive(Debug, Clone)]
pub struct BucketSpaceRepo {
    spaces: BTreeMap<BucketSpace, Distribution>,
    generation: u64,
}

impl BucketSpaceRepo {
    /// Creates a repository with the given spaces and their distributions.
    pub fn new<I: IntoIterator<Item = (BucketSpace, Distribution)>>(spaces: I) -> Self {
        Self {
            spaces: spaces.into_iter().collect(),
            generation: 0,
        }
    }

    /// Repository with the `default` and `global` spaces sharing one
    /// distribution.
    pub fn with_fixed_spaces(distribution: Distribution) -> Self {
        Self::new([
            (BucketSpace::DEFAULT, distribution.clone()),
            (BucketSpace::GLOBAL, distribution),
        ])
    }

    /// Returns the distribution of the given space.
    ///
    /// # Panics
    ///
    /// Panics if the space is not part of the deployment.
    pub fn get(&self, space: BucketSpace) -> &Distribution {
        self.spaces
            .get(&space)
            .unwrap_or_else(|| panic!("Unknown bucket space: {space}"))
    }

    /// Installs a new distribution for the given space.
    ///
    /// Returns the new distribution generation.
    ///
    /// # Panics
    ///
    /// Panics if the space is not part of the deployment.
    pub fn set_distribution(&mut self, space: BucketSpace, distribution: Distribution) -> u64 {
        let slot = self
            .spaces
            .get_mut(&space)
            .unwrap_or_else(|| panic!("Unknown bucket space: {space}"));
        *slot = distribution;
        self.generation += 1;
        self.generation
    }

    /// Current distribution generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Iterator over the spaces in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (BucketSpace, &Distribution)> {
        self.spaces.iter().map(|(space, d)| (*space, d))
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }
}
