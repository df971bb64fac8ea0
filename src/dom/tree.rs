//! The node arena and its parent/child links.

use slotmap::{SecondaryMap, SlotMap};

use super::node::{NodeData, NodeId};
use crate::css::model::DeclarationBlock;
use crate::css::tree::StyleTree;

#[derive(Debug, Default, Clone)]
struct Links {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A logical node tree, backed by a slotmap arena.
///
/// Node data and links live in separate maps keyed by the same [`NodeId`], so
/// a removed node's handle goes stale everywhere at once.
#[derive(Debug, Default)]
pub struct Dom {
    nodes: SlotMap<NodeId, NodeData>,
    links: SecondaryMap<NodeId, Links>,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parentless node.
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.links.insert(id, Links::default());
        id
    }

    /// Insert a node as the last child of `parent`.
    ///
    /// A stale `parent` yields a parentless node.
    pub fn insert_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.insert(data);
        if let Some(links) = self.links.get_mut(parent) {
            links.children.push(id);
            if let Some(own) = self.links.get_mut(id) {
                own.parent = Some(parent);
            }
        }
        id
    }

    /// Remove `id` and its subtree, returning the data of `id` itself.
    pub fn remove(&mut self, id: NodeId) -> Option<NodeData> {
        let parent = self.links.get(id)?.parent;
        if let Some(siblings) = parent.and_then(|p| self.links.get_mut(p)) {
            siblings.children.retain(|&child| child != id);
        }
        for node in self.subtree(id).into_iter().rev() {
            self.links.remove(node);
            if node != id {
                self.nodes.remove(node);
            }
        }
        self.nodes.remove(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.links.get(id).and_then(|links| links.parent)
    }

    /// Children in insertion order; empty for leaves and stale handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.links.get(id) {
            Some(links) => &links.children,
            None => &[],
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// `start` and its descendants in document (pre-)order.
    pub fn subtree(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(start) {
            return out;
        }
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }
}

impl StyleTree for Dom {
    fn contains(&self, node: NodeId) -> bool {
        Dom::contains(self, node)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(|data| data.tag.as_str())
    }

    fn class_list(&self, node: NodeId) -> &[String] {
        match self.nodes.get(node) {
            Some(data) => &data.classes,
            None => &[],
        }
    }

    fn id_attribute(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).and_then(|data| data.id.as_deref())
    }

    fn inline_style(&self, node: NodeId) -> Option<&DeclarationBlock> {
        self.nodes.get(node).map(|data| &data.inline_style)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        Dom::parent(self, node)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        Dom::children(self, node)
    }

    fn is_render_capable(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|data| data.render_capable)
    }

    fn restyles_descendants(&self, node: NodeId) -> bool {
        self.nodes
            .get(node)
            .is_some_and(|data| data.restyle_descendants)
    }
}
