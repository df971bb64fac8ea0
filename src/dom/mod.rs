//! DOM arena: slotmap-backed node tree the engine styles.

pub mod node;
pub mod tree;

pub use node::{NodeId, NodeData};
pub use tree::Dom;
