//! Downstream delivery of merged styles.

use crate::css::model::MergedStyle;
use crate::dom::NodeId;

/// Receives a node's merged style every time the engine pushes it.
///
/// Pushes are fire-and-forget; batching is the sink's business.
pub trait StyleSink {
    fn push(&mut self, node: NodeId, style: &MergedStyle);
}

impl<F> StyleSink for F
where
    F: FnMut(NodeId, &MergedStyle),
{
    fn push(&mut self, node: NodeId, style: &MergedStyle) {
        self(node, style)
    }
}

/// A sink that records every push, for tests and headless use.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pushes: Vec<(NodeId, MergedStyle)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> &[(NodeId, MergedStyle)] {
        &self.pushes
    }

    /// All styles pushed for `node`, oldest first.
    pub fn pushes_for(&self, node: NodeId) -> Vec<&MergedStyle> {
        self.pushes
            .iter()
            .filter(|(id, _)| *id == node)
            .map(|(_, style)| style)
            .collect()
    }

    /// The most recent style pushed for `node`.
    pub fn last_for(&self, node: NodeId) -> Option<&MergedStyle> {
        self.pushes
            .iter()
            .rev()
            .find(|(id, _)| *id == node)
            .map(|(_, style)| style)
    }

    /// Drain the recorded pushes.
    pub fn take(&mut self) -> Vec<(NodeId, MergedStyle)> {
        std::mem::take(&mut self.pushes)
    }

    pub fn clear(&mut self) {
        self.pushes.clear();
    }

    pub fn len(&self) -> usize {
        self.pushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pushes.is_empty()
    }
}

impl StyleSink for RecordingSink {
    fn push(&mut self, node: NodeId, style: &MergedStyle) {
        self.pushes.push((node, style.clone()));
    }
}
