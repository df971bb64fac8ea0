//! The node view the cascade reads from.
//!
//! The engine never owns or mutates the tree. Anything that can answer these
//! questions about its nodes can be styled; [`Dom`](crate::dom::Dom) is the
//! in-crate implementation.

use crate::css::model::DeclarationBlock;
use crate::dom::NodeId;

pub trait StyleTree {
    /// Whether `node` is alive in the tree.
    fn contains(&self, node: NodeId) -> bool;

    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn class_list(&self, node: NodeId) -> &[String];

    fn id_attribute(&self, node: NodeId) -> Option<&str>;

    fn inline_style(&self, node: NodeId) -> Option<&DeclarationBlock>;

    /// Logical parent, render-capable or not.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Logical children in document order.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// Whether the node produces output (as opposed to a logical wrapper).
    fn is_render_capable(&self, node: NodeId) -> bool;

    /// Whether class/id changes on this node should re-evaluate descendant
    /// rules over its subtree.
    fn restyles_descendants(&self, node: NodeId) -> bool;

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_list(node).iter().any(|c| c == class)
    }

    /// Nearest render-capable ancestor.
    fn render_parent(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.parent(node);
        while let Some(candidate) = current {
            if self.is_render_capable(candidate) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Render-capable ancestors, nearest first.
    fn render_ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.render_parent(node);
        while let Some(ancestor) = current {
            out.push(ancestor);
            current = self.render_parent(ancestor);
        }
        out
    }

    /// Render depth, counting the node itself: a root is at depth 1.
    fn depth(&self, node: NodeId) -> u32 {
        1 + self.render_ancestors(node).len() as u32
    }
}
