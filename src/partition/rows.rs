//! Leaf-ranged row index buffers.
//!
//! A [`Partition`] holds the row indices assigned to one bucket (train, test,
//! bag or out-of-bag) in ascending order. It is pre-sized for `max_leaves`
//! leaves so a tree learner can split it in place without reallocating:
//!
//! ```text
//! Initial (all rows in leaf 0):
//!   indices: [1, 2, 4, 5, 7]
//!   leaf_begin: [0], leaf_count: [5]
//!
//! After splitting leaf 0 on "row is even":
//!   indices: [2, 4, 1, 5, 7]
//!   leaf_begin: [0, 2], leaf_count: [2, 3]
//! ```
//!
//! Splits are stable, so each leaf still lists its rows in ascending order.

/// Leaf identifier.
pub type LeafId = u32;

/// Row indices of one bucket, grouped by leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Row indices buffer, ordered by leaf.
    indices: Box<[u32]>,
    /// Start position for each leaf in `indices`.
    leaf_begin: Vec<u32>,
    /// Number of rows in each leaf.
    leaf_count: Vec<u32>,
    /// Number of leaves currently allocated.
    n_leaves: usize,
}

impl Partition {
    /// Create a partition with every row in leaf 0.
    ///
    /// `rows` must be ascending. `max_leaves` is clamped to at least one.
    pub fn new(rows: Vec<u32>, max_leaves: usize) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0] < w[1]));
        let max_leaves = max_leaves.max(1);
        let mut leaf_begin = vec![0; max_leaves];
        let mut leaf_count = vec![0; max_leaves];
        leaf_begin[0] = 0;
        leaf_count[0] = rows.len() as u32;
        Self {
            indices: rows.into_boxed_slice(),
            leaf_begin,
            leaf_count,
            n_leaves: 1,
        }
    }

    /// All row indices, ordered by leaf.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Total number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Leaf capacity this partition was sized for.
    #[inline]
    pub fn max_leaves(&self) -> usize {
        self.leaf_begin.len()
    }

    /// Number of allocated leaves.
    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Row indices of a leaf.
    #[inline]
    pub fn leaf_indices(&self, leaf: LeafId) -> &[u32] {
        let begin = self.leaf_begin[leaf as usize] as usize;
        let count = self.leaf_count[leaf as usize] as usize;
        &self.indices[begin..begin + count]
    }

    /// Number of rows in a leaf.
    #[inline]
    pub fn leaf_count(&self, leaf: LeafId) -> u32 {
        self.leaf_count[leaf as usize]
    }

    /// Returns true if `row` belongs to this partition.
    ///
    /// Only valid before any split, while indices are globally ascending.
    pub fn contains(&self, row: u32) -> bool {
        debug_assert_eq!(self.n_leaves, 1);
        self.indices.binary_search(&row).is_ok()
    }

    /// Split a leaf by a row predicate.
    ///
    /// The original leaf keeps rows for which `goes_left` is true; a new leaf
    /// gets the rest. Returns `(right_leaf, left_count, right_count)`, or
    /// `None` when the leaf capacity is exhausted.
    pub fn split_leaf(
        &mut self,
        leaf: LeafId,
        mut goes_left: impl FnMut(u32) -> bool,
    ) -> Option<(LeafId, u32, u32)> {
        if self.n_leaves >= self.leaf_begin.len() {
            return None;
        }

        let begin = self.leaf_begin[leaf as usize] as usize;
        let end = begin + self.leaf_count[leaf as usize] as usize;

        let (left, right): (Vec<u32>, Vec<u32>) =
            self.indices[begin..end].iter().partition(|&&row| goes_left(row));
        let left_end = begin + left.len();
        self.indices[begin..left_end].copy_from_slice(&left);
        self.indices[left_end..end].copy_from_slice(&right);

        let left_count = left.len() as u32;
        let right_count = right.len() as u32;
        self.leaf_count[leaf as usize] = left_count;

        let right_leaf = self.n_leaves as LeafId;
        self.n_leaves += 1;
        self.leaf_begin[right_leaf as usize] = left_end as u32;
        self.leaf_count[right_leaf as usize] = right_count;

        Some((right_leaf, left_count, right_count))
    }

    /// Consume into the row indices.
    pub fn into_indices(self) -> Vec<u32> {
        self.indices.into_vec()
    }
}
