//! Restyling propagation after an ancestor's class or id changes.
//!
//! Only descendant rules that mention a changed token in a non-final
//! position can flip for nodes below the changed one, so those are the only
//! rules re-run over the subtree. A node is restyled only when one of them
//! gained or lost the node; a different matching ancestor alone is not
//! enough, since declarations do not depend on which ancestor matched.

use std::collections::{BTreeSet, HashSet};

use tracing::trace;

use crate::css::cascade::RuleScope;
use crate::css::matcher;
use crate::css::model::TokenIdentity;
use crate::css::rule::RuleId;
use crate::css::sink::StyleSink;
use crate::css::stylesheet::SheetId;
use crate::css::tree::StyleTree;
use crate::dom::NodeId;
use crate::engine::StyleEngine;

/// A selector-relevant attribute edit on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeChange<'a> {
    Class {
        old: &'a [String],
        new: &'a [String],
    },
    Id {
        old: Option<&'a str>,
        new: Option<&'a str>,
    },
}

impl AttributeChange<'_> {
    /// Tokens whose presence on the node flipped.
    ///
    /// For classes this is the symmetric difference of the two lists; for
    /// ids it is the old and new id, empty values dropped.
    pub fn changed_tokens(&self) -> Vec<TokenIdentity> {
        match *self {
            AttributeChange::Class { old, new } => {
                let old: BTreeSet<&str> = old.iter().map(String::as_str).collect();
                let new: BTreeSet<&str> = new.iter().map(String::as_str).collect();
                old.symmetric_difference(&new)
                    .map(|class| TokenIdentity::class(class))
                    .collect()
            }
            AttributeChange::Id { old, new } => {
                if old == new {
                    return Vec::new();
                }
                [old, new]
                    .into_iter()
                    .flatten()
                    .filter(|id| !id.is_empty())
                    .map(TokenIdentity::id)
                    .collect()
            }
        }
    }
}

impl StyleEngine {
    /// Re-evaluate descendant rules over `node`'s subtree after its class or
    /// id changed, restyling and pushing every descendant whose match set
    /// changed.
    ///
    /// Does nothing unless `node` is attached, opted into descendant
    /// restyling, and has sheets in scope. Returns the restyled nodes.
    pub fn on_ancestor_attribute_change<T, S>(
        &mut self,
        tree: &T,
        node: NodeId,
        change: AttributeChange<'_>,
        sink: &mut S,
    ) -> Vec<NodeId>
    where
        T: StyleTree + ?Sized,
        S: StyleSink + ?Sized,
    {
        if !self.is_attached(node) || !tree.restyles_descendants(node) {
            return Vec::new();
        }
        let sheets = self.sheets_in_scope(tree, node);
        if sheets.is_empty() {
            return Vec::new();
        }

        let tokens = change.changed_tokens();
        let candidates = self.non_final_candidates(&sheets, &tokens);
        trace!(
            ?node,
            tokens = ?tokens.iter().map(TokenIdentity::as_str).collect::<Vec<_>>(),
            candidates = candidates.len(),
            "propagating attribute change"
        );
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut changed = Vec::new();
        let mut stack: Vec<NodeId> = tree.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            stack.extend(tree.children(current).iter().rev());
            if !tree.is_render_capable(current) || !self.is_attached(current) {
                continue;
            }
            let visible = self.sheets_in_scope(tree, current);
            let mut node_changed = false;
            for &(sheet, rule_id) in &candidates {
                if !visible.contains(&sheet) {
                    continue;
                }
                let (Some(rule), Some(state)) =
                    (self.rules.get_mut(rule_id), self.states.get_mut(current))
                else {
                    continue;
                };
                self.stats.matcher_runs += 1;
                if matcher::matches(rule_id, rule, current, tree, state).match_changed {
                    node_changed = true;
                }
            }
            if node_changed {
                changed.push(current);
            }
        }

        trace!(changed = changed.len(), "restyling descendants");
        for &current in &changed {
            self.invalidate(current, RuleScope::All);
            self.recompute(tree, current, RuleScope::All);
            self.push_style(current, sink, true);
        }
        changed
    }

    /// Descendant rules indexed under any of `tokens`, deduplicated, with
    /// the sheet each came from.
    fn non_final_candidates(&self, sheets: &[SheetId], tokens: &[TokenIdentity]) -> Vec<(SheetId, RuleId)> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for &sheet_id in sheets {
            let Some(sheet) = self.sheets.get(sheet_id) else {
                continue;
            };
            for token in tokens {
                for &rule_id in sheet.non_final_candidates(token) {
                    if seen.insert(rule_id) {
                        out.push((sheet_id, rule_id));
                    }
                }
            }
        }
        out
    }
}
