//! Document: a node tree, its style engine and a style sink.
//!
//! Every mutator runs the cascade to completion before returning: attribute
//! edits recompute the affected bucket, push the node if its style changed,
//! and propagate to opted-in subtrees. The `headless` constructor records
//! pushes in a [`RecordingSink`] for tests.

use tracing::debug;

use crate::config::EngineConfig;
use crate::css::cascade::RuleScope;
use crate::css::invalidation::AttributeChange;
use crate::css::model::{DeclarationBlock, MergedStyle};
use crate::css::rule::RuleBucket;
use crate::css::sink::{RecordingSink, StyleSink};
use crate::css::stylesheet::{SheetId, SheetSource};
use crate::dom::{Dom, NodeData, NodeId};
use crate::engine::StyleEngine;

pub struct Document<S: StyleSink = RecordingSink> {
    dom: Dom,
    engine: StyleEngine,
    sink: S,
}

impl Document<RecordingSink> {
    /// A document with default config that records pushes.
    pub fn headless() -> Self {
        Self::new(EngineConfig::default(), RecordingSink::new())
    }
}

impl<S: StyleSink> Document<S> {
    pub fn new(config: EngineConfig, sink: S) -> Self {
        Self {
            dom: Dom::new(),
            engine: StyleEngine::new(config),
            sink,
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn engine(&self) -> &StyleEngine {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ── Tree ─────────────────────────────────────────────────────────

    /// Insert a parentless node, attach it and push its initial style.
    pub fn insert_root(&mut self, data: NodeData) -> NodeId {
        let id = self.dom.insert(data);
        self.attach(id);
        id
    }

    /// Insert `data` as the last child of `parent`, attach it and push its
    /// initial style.
    pub fn insert_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.dom.insert_child(parent, data);
        self.attach(id);
        id
    }

    fn attach(&mut self, id: NodeId) {
        self.engine.attach(id);
        self.engine.restyle(&self.dom, id, RuleScope::All, &mut self.sink);
    }

    /// Detach and remove `node` with its subtree.
    ///
    /// Nodes that lose sheets registered by the removed ones are restyled.
    pub fn remove(&mut self, node: NodeId) -> Option<NodeData> {
        let subtree = self.dom.subtree(node);
        let mut affected = Vec::new();
        for &id in subtree.iter().rev() {
            affected.extend(self.engine.detach(&self.dom, id));
        }
        let removed = self.dom.remove(node);
        affected.sort();
        affected.dedup();
        for id in affected {
            self.engine.restyle(&self.dom, id, RuleScope::All, &mut self.sink);
        }
        debug!(removed = subtree.len(), "removed subtree");
        removed
    }

    // ── Sheets ───────────────────────────────────────────────────────

    /// Register `source` for `holder` and restyle every node it reaches.
    /// Returns how many nodes were pushed.
    pub fn register_sheet(
        &mut self,
        name: &str,
        source: &SheetSource,
        document_level: bool,
        holder: NodeId,
    ) -> usize {
        let affected = self
            .engine
            .register_sheet(&self.dom, name, source, document_level, holder);
        self.restyle_all(&affected)
    }

    /// Replace the declaration of `selector` in `sheet` and re-push the
    /// nodes matching it. Returns how many nodes were pushed.
    pub fn set_rule_declaration(
        &mut self,
        sheet: SheetId,
        selector: &str,
        declaration: DeclarationBlock,
    ) -> usize {
        let affected = self.engine.set_rule_declaration(sheet, selector, declaration);
        self.restyle_all(&affected)
    }

    fn restyle_all(&mut self, nodes: &[NodeId]) -> usize {
        nodes
            .iter()
            .filter(|&&id| {
                self.engine
                    .restyle(&self.dom, id, RuleScope::All, &mut self.sink)
            })
            .count()
    }

    // ── Attributes ───────────────────────────────────────────────────

    /// Replace the class list of `node`.
    pub fn set_classes(&mut self, node: NodeId, classes: impl IntoIterator<Item = impl Into<String>>) {
        let Some(data) = self.dom.get_mut(node) else {
            return;
        };
        let old = data.classes.clone();
        data.set_classes(classes);
        let new = data.classes.clone();
        if old == new {
            return;
        }
        self.attribute_changed(node, RuleBucket::Class, AttributeChange::Class { old: &old, new: &new });
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        let Some(data) = self.dom.get(node) else {
            return;
        };
        if data.has_class(class) {
            return;
        }
        let mut classes = data.classes.clone();
        classes.push(class.to_owned());
        self.set_classes(node, classes);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(data) = self.dom.get(node) else {
            return;
        };
        if !data.has_class(class) {
            return;
        }
        let classes: Vec<String> = data.classes.iter().filter(|c| *c != class).cloned().collect();
        self.set_classes(node, classes);
    }

    /// Set or clear the id attribute of `node`.
    pub fn set_id(&mut self, node: NodeId, id: Option<&str>) {
        let Some(data) = self.dom.get_mut(node) else {
            return;
        };
        let old = data.id.clone();
        if old.as_deref() == id {
            return;
        }
        data.id = id.map(str::to_owned);
        self.attribute_changed(
            node,
            RuleBucket::Id,
            AttributeChange::Id {
                old: old.as_deref(),
                new: id,
            },
        );
    }

    fn attribute_changed(&mut self, node: NodeId, bucket: RuleBucket, change: AttributeChange<'_>) {
        let scope = RuleScope::Only(bucket);
        self.engine.invalidate(node, scope);
        self.engine.restyle(&self.dom, node, scope, &mut self.sink);
        self.engine
            .on_ancestor_attribute_change(&self.dom, node, change, &mut self.sink);
    }

    /// Replace the inline style of `node`; only its inline bucket is
    /// recomputed.
    pub fn set_inline_style(&mut self, node: NodeId, style: DeclarationBlock) {
        let Some(data) = self.dom.get_mut(node) else {
            return;
        };
        if data.inline_style == style {
            return;
        }
        data.inline_style = style;
        let scope = RuleScope::Only(RuleBucket::Inline);
        self.engine.invalidate(node, scope);
        self.engine.restyle(&self.dom, node, scope, &mut self.sink);
    }

    /// Set one inline property; an empty value removes it.
    pub fn set_inline_property(&mut self, node: NodeId, property: &str, value: &str) {
        let Some(data) = self.dom.get(node) else {
            return;
        };
        let mut style = data.inline_style.clone();
        if value.is_empty() {
            style.remove(property);
        } else {
            style.insert(property.to_owned(), value.to_owned());
        }
        self.set_inline_style(node, style);
    }

    /// Opt `node` in or out of restyling its subtree on class/id changes.
    pub fn set_restyle_descendants(&mut self, node: NodeId, enabled: bool) {
        if let Some(data) = self.dom.get_mut(node) {
            data.restyle_descendants = enabled;
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The merged style of `node`, running any pending recompute.
    pub fn computed_style(&mut self, node: NodeId) -> Option<&MergedStyle> {
        self.engine.computed_style(&self.dom, node)
    }

    /// Sheets visible to `node`, document-level first.
    pub fn sheets_in_scope(&self, node: NodeId) -> Vec<SheetId> {
        self.engine.sheets_in_scope(&self.dom, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::model::declarations;
    use pretty_assertions::assert_eq;

    fn page() -> SheetSource {
        SheetSource::new()
            .rule("div", [("c", "t")])
            .rule(".x", [("c", "c")])
            .rule("#i", [("c", "i")])
    }

    #[test]
    fn insert_pushes_initial_style() {
        let mut doc = Document::headless();
        let root = doc.insert_root(NodeData::new("section"));
        doc.register_sheet("page", &page(), true, root);
        let node = doc.insert_child(root, NodeData::new("div").with_class("x"));
        assert_eq!(doc.sink().last_for(node).and_then(|s| s.get("c")), Some("c"));
    }

    #[test]
    fn class_edits_restyle_the_node() {
        let mut doc = Document::headless();
        let root = doc.insert_root(NodeData::new("section"));
        doc.register_sheet("page", &page(), true, root);
        let node = doc.insert_child(root, NodeData::new("div"));
        doc.sink_mut().clear();

        doc.add_class(node, "x");
        assert_eq!(doc.sink().last_for(node).and_then(|s| s.get("c")), Some("c"));
        doc.set_id(node, Some("i"));
        assert_eq!(doc.sink().last_for(node).and_then(|s| s.get("c")), Some("i"));
        doc.set_id(node, None);
        doc.remove_class(node, "x");
        assert_eq!(doc.sink().last_for(node).and_then(|s| s.get("c")), Some("t"));
        assert_eq!(doc.sink().len(), 4);

        // No-op edits push nothing.
        doc.remove_class(node, "x");
        doc.set_id(node, None);
        assert_eq!(doc.sink().len(), 4);
    }

    #[test]
    fn inline_edits_skip_rematching() {
        let mut doc = Document::headless();
        let root = doc.insert_root(NodeData::new("div").with_class("x"));
        doc.register_sheet("page", &page(), true, root);
        let runs = doc.engine().stats().matcher_runs;

        doc.set_inline_property(root, "c", "inline");
        assert_eq!(doc.sink().last_for(root).and_then(|s| s.get("c")), Some("inline"));
        doc.set_inline_property(root, "c", "");
        assert_eq!(doc.sink().last_for(root).and_then(|s| s.get("c")), Some("c"));
        assert_eq!(doc.engine().stats().matcher_runs, runs);
    }

    #[test]
    fn remove_detaches_subtree() {
        let mut doc = Document::headless();
        let root = doc.insert_root(NodeData::new("div"));
        doc.register_sheet("page", &page(), true, root);
        let child = doc.insert_child(root, NodeData::new("div").with_class("x"));
        let grandchild = doc.insert_child(child, NodeData::new("div"));
        let rules = doc.engine().rule_count();

        let removed = doc.remove(child);
        assert_eq!(removed.map(|data| data.tag), Some("div".to_string()));
        assert!(!doc.engine().is_attached(child));
        assert!(!doc.engine().is_attached(grandchild));
        assert_eq!(doc.engine().rule_count(), rules);
        assert!(doc.computed_style(child).is_none());
    }

    #[test]
    fn removing_local_owner_frees_its_sheet() {
        let mut doc = Document::headless();
        let root = doc.insert_root(NodeData::new("div"));
        let component = doc.insert_child(root, NodeData::new("div"));
        doc.register_sheet("comp", &page(), false, component);
        assert_eq!(doc.engine().sheet_count(), 1);

        doc.remove(component);
        assert_eq!(doc.engine().sheet_count(), 0);
        assert_eq!(doc.engine().rule_count(), 0);
    }

    #[test]
    fn rule_edit_repushes_matching_nodes() {
        let mut doc = Document::headless();
        let root = doc.insert_root(NodeData::new("section"));
        doc.register_sheet("page", &page(), true, root);
        let a = doc.insert_child(root, NodeData::new("div").with_class("x"));
        let _b = doc.insert_child(root, NodeData::new("div"));
        let sheet = doc.sheets_in_scope(a)[0];

        let pushed = doc.set_rule_declaration(sheet, ".x", declarations([("c", "edited")]));
        assert_eq!(pushed, 1);
        assert_eq!(doc.sink().last_for(a).and_then(|s| s.get("c")), Some("edited"));
    }

    #[test]
    fn closure_sink() {
        let mut seen = Vec::new();
        {
            let mut doc = Document::new(EngineConfig::default(), |node: NodeId, style: &MergedStyle| {
                seen.push((node, style.to_string()));
            });
            let root = doc.insert_root(NodeData::new("div").with_style("w", "1"));
            let _ = root;
        }
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "w: 1;");
    }
}
