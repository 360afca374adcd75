//! Tree ensemble representation consumed by bagged training.

mod forest;
mod tree;

pub use forest::Forest;
pub use tree::{MutableTree, NodeId, Tree};
