//! Structure-of-arrays regression tree and its mutable builder.

use serde::{Deserialize, Serialize};

/// Node identifier (index into the tree's arrays, 0 = root).
pub type NodeId = u32;

/// Immutable regression tree with numeric splits.
///
/// A row goes left at a split node when `row[feature] < threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    split_features: Box<[u32]>,
    split_thresholds: Box<[f64]>,
    left_children: Box<[NodeId]>,
    right_children: Box<[NodeId]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f64]>,
}

impl Tree {
    /// Single-leaf tree.
    pub fn leaf(value: f64) -> Self {
        let mut builder = MutableTree::new();
        builder.set_leaf(0, value);
        builder.freeze()
    }

    /// Number of nodes.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&l| l).count()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    pub fn leaf_value(&self, node: NodeId) -> f64 {
        self.leaf_values[node as usize]
    }

    /// Leaf values of every leaf node, in node order.
    pub fn leaf_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.is_leaf
            .iter()
            .zip(self.leaf_values.iter())
            .filter(|(&leaf, _)| leaf)
            .map(|(_, &v)| v)
    }

    /// Traverse to the leaf reached by `row`.
    pub fn predict_leaf(&self, row: &[f64]) -> NodeId {
        let mut node = 0;
        while !self.is_leaf(node) {
            let i = node as usize;
            let value = row[self.split_features[i] as usize];
            node = if value < self.split_thresholds[i] {
                self.left_children[i]
            } else {
                self.right_children[i]
            };
        }
        node
    }

    /// Output for one row.
    #[inline]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.leaf_value(self.predict_leaf(row))
    }

    /// Multiply every leaf value by `factor`.
    pub fn scale_leaves(&mut self, factor: f64) {
        for (value, _) in self
            .leaf_values
            .iter_mut()
            .zip(self.is_leaf.iter())
            .filter(|(_, &leaf)| leaf)
        {
            *value *= factor;
        }
    }
}

/// Tree under construction.
///
/// Nodes are allocated by [`split`](MutableTree::split); every node must be
/// either split or given a leaf value before [`freeze`](MutableTree::freeze).
#[derive(Debug, Clone, Default)]
pub struct MutableTree {
    split_features: Vec<u32>,
    split_thresholds: Vec<f64>,
    left_children: Vec<NodeId>,
    right_children: Vec<NodeId>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f64>,
}

impl MutableTree {
    /// Tree with a single root node.
    pub fn new() -> Self {
        let mut tree = Self::default();
        tree.alloc();
        tree
    }

    fn alloc(&mut self) -> NodeId {
        let id = self.is_leaf.len() as NodeId;
        self.split_features.push(0);
        self.split_thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.is_leaf.push(true);
        self.leaf_values.push(0.0);
        id
    }

    /// Turn `node` into a split and allocate its children.
    ///
    /// Returns `(left, right)`.
    pub fn split(&mut self, node: NodeId, feature: u32, threshold: f64) -> (NodeId, NodeId) {
        let left = self.alloc();
        let right = self.alloc();
        let i = node as usize;
        self.split_features[i] = feature;
        self.split_thresholds[i] = threshold;
        self.left_children[i] = left;
        self.right_children[i] = right;
        self.is_leaf[i] = false;
        (left, right)
    }

    /// Set the output of a leaf node.
    pub fn set_leaf(&mut self, node: NodeId, value: f64) {
        debug_assert!(self.is_leaf[node as usize], "node {node} is a split");
        self.leaf_values[node as usize] = value;
    }

    /// Number of nodes allocated so far.
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Finish construction.
    pub fn freeze(self) -> Tree {
        Tree {
            split_features: self.split_features.into_boxed_slice(),
            split_thresholds: self.split_thresholds.into_boxed_slice(),
            left_children: self.left_children.into_boxed_slice(),
            right_children: self.right_children.into_boxed_slice(),
            is_leaf: self.is_leaf.into_boxed_slice(),
            leaf_values: self.leaf_values.into_boxed_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stump(left: f64, right: f64) -> Tree {
        let mut t = MutableTree::new();
        let (l, r) = t.split(0, 0, 0.5);
        t.set_leaf(l, left);
        t.set_leaf(r, right);
        t.freeze()
    }

    #[test]
    fn stump_prediction() {
        let t = stump(1.0, 2.0);
        assert_eq!(t.n_nodes(), 3);
        assert_eq!(t.n_leaves(), 2);
        assert_eq!(t.predict_row(&[0.3]), 1.0);
        assert_eq!(t.predict_row(&[0.7]), 2.0);
    }

    #[test]
    fn scale_only_touches_leaves() {
        let mut t = stump(8.0, -4.0);
        t.scale_leaves(0.25);
        assert_relative_eq!(t.predict_row(&[0.0]), 2.0);
        assert_relative_eq!(t.predict_row(&[1.0]), -1.0);
        assert_eq!(t.leaf_values().collect::<Vec<_>>(), vec![2.0, -1.0]);
    }

    #[test]
    fn single_leaf_tree() {
        let t = Tree::leaf(3.0);
        assert_eq!(t.n_nodes(), 1);
        assert_eq!(t.predict_row(&[]), 3.0);
    }
}
