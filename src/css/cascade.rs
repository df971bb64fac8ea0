//! Cascade calculator: per-node rule buckets, merge, resets, push.
//!
//! A node's matched rules are kept in four independent buckets (inline, tag,
//! class, id). Each bucket is re-matched only when it has been invalidated,
//! so an edit on one axis never re-runs the matcher for the others, and a
//! second recompute with nothing invalidated does no matching at all.
//!
//! Merging flattens all buckets, sorts ascending by sort key and folds the
//! declarations so the highest-priority rule writes last.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::trace;

use crate::css::matcher;
use crate::css::model::{MergedStyle, TokenIdentity};
use crate::css::rule::{Rule, RuleBucket, RuleId};
use crate::css::sink::StyleSink;
use crate::css::stylesheet::SheetId;
use crate::css::tree::StyleTree;
use crate::dom::NodeId;
use crate::engine::StyleEngine;

/// Which buckets a recompute or invalidation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    All,
    Only(RuleBucket),
}

impl RuleScope {
    pub fn includes(self, bucket: RuleBucket) -> bool {
        match self {
            RuleScope::All => true,
            RuleScope::Only(only) => only == bucket,
        }
    }
}

/// Style bookkeeping for one attached node.
#[derive(Debug)]
pub struct NodeStyleState {
    pub(crate) matched: [Vec<RuleId>; 4],
    dirty: [bool; 4],
    pub(crate) merged: Option<MergedStyle>,
    /// Properties present in the last merge (resets excluded).
    used_properties: BTreeSet<String>,
    /// Per matched descendant rule, the ancestors that satisfied its
    /// non-final tokens last time.
    matched_paths: HashMap<RuleId, Vec<NodeId>>,
    pub(crate) inline_rule: Option<RuleId>,
    /// Last style delivered to the sink, resets dropped.
    pushed: Option<MergedStyle>,
}

impl NodeStyleState {
    /// A fresh state with every bucket pending.
    pub fn new() -> Self {
        Self {
            matched: Default::default(),
            dirty: [true; 4],
            merged: None,
            used_properties: BTreeSet::new(),
            matched_paths: HashMap::new(),
            inline_rule: None,
            pushed: None,
        }
    }

    pub fn matched(&self, bucket: RuleBucket) -> &[RuleId] {
        &self.matched[bucket.index()]
    }

    pub fn is_dirty(&self, bucket: RuleBucket) -> bool {
        self.dirty[bucket.index()]
    }

    /// The cached merge, if still valid.
    pub fn merged(&self) -> Option<&MergedStyle> {
        self.merged.as_ref()
    }

    pub fn used_properties(&self) -> &BTreeSet<String> {
        &self.used_properties
    }

    pub fn matched_path(&self, rule: RuleId) -> Option<&[NodeId]> {
        self.matched_paths.get(&rule).map(Vec::as_slice)
    }

    pub(crate) fn mark_dirty(&mut self, scope: RuleScope) {
        for bucket in RuleBucket::ALL {
            if scope.includes(bucket) {
                self.dirty[bucket.index()] = true;
            }
        }
        self.merged = None;
    }

    /// Drop the merged cache without re-matching (declaration-only edits).
    pub(crate) fn invalidate_merge(&mut self) {
        self.merged = None;
    }

    /// Every rule this node may be recorded in.
    pub(crate) fn referenced_rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.matched
            .iter()
            .flatten()
            .copied()
            .chain(self.matched_paths.keys().copied())
    }

    /// Store the outcome of a descendant-rule walk and classify the change.
    pub(crate) fn record_path(
        &mut self,
        rule: RuleId,
        now: Option<Vec<NodeId>>,
    ) -> matcher::MatchOutcome {
        let previous = self.matched_paths.get(&rule);
        match (previous, now) {
            (None, None) => matcher::MatchOutcome::default(),
            (Some(_), None) => {
                self.matched_paths.remove(&rule);
                matcher::MatchOutcome {
                    matched: false,
                    match_changed: true,
                    path_changed: false,
                }
            }
            (None, Some(path)) => {
                self.matched_paths.insert(rule, path);
                matcher::MatchOutcome {
                    matched: true,
                    match_changed: true,
                    path_changed: false,
                }
            }
            (Some(previous), Some(path)) => {
                let path_changed = *previous != path;
                if path_changed {
                    self.matched_paths.insert(rule, path);
                }
                matcher::MatchOutcome {
                    matched: true,
                    match_changed: false,
                    path_changed,
                }
            }
        }
    }
}

impl Default for NodeStyleState {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleEngine {
    /// Mark buckets of `node` for re-matching and drop its merged cache.
    ///
    /// Returns `false` if the node is not attached.
    pub fn invalidate(&mut self, node: NodeId, scope: RuleScope) -> bool {
        match self.states.get_mut(node) {
            Some(state) => {
                state.mark_dirty(scope);
                true
            }
            None => false,
        }
    }

    /// Re-match the invalidated buckets of `node` within `scope`.
    ///
    /// Returns `true` if any bucket was re-matched. Detached nodes are a
    /// no-op.
    pub fn recompute<T: StyleTree + ?Sized>(&mut self, tree: &T, node: NodeId, scope: RuleScope) -> bool {
        let Some(state) = self.states.get(node) else {
            return false;
        };
        if !tree.contains(node) {
            return false;
        }
        let pending: Vec<RuleBucket> = RuleBucket::ALL
            .into_iter()
            .filter(|&bucket| scope.includes(bucket) && state.is_dirty(bucket))
            .collect();
        if pending.is_empty() {
            return false;
        }

        let sheets = self.sheets_in_scope(tree, node);
        for bucket in pending {
            match bucket {
                RuleBucket::Inline => self.rebuild_inline(tree, node),
                _ => self.rematch_bucket(tree, node, bucket, &sheets),
            }
        }
        if let Some(state) = self.states.get_mut(node) {
            state.merged = None;
        }
        true
    }

    /// Recompute pending buckets and return the merged style of `node`.
    pub fn computed_style<T: StyleTree + ?Sized>(&mut self, tree: &T, node: NodeId) -> Option<&MergedStyle> {
        self.recompute(tree, node, RuleScope::All);
        self.merge(node)
    }

    /// Recompute within `scope` and push the merged style if it differs
    /// from the last one delivered. Returns whether a push happened.
    pub fn restyle<T, S>(&mut self, tree: &T, node: NodeId, scope: RuleScope, sink: &mut S) -> bool
    where
        T: StyleTree + ?Sized,
        S: StyleSink + ?Sized,
    {
        self.recompute(tree, node, scope);
        self.push_style(node, sink, false)
    }

    pub(crate) fn push_style<S: StyleSink + ?Sized>(&mut self, node: NodeId, sink: &mut S, force: bool) -> bool {
        let Some(merged) = self.merge(node).cloned() else {
            return false;
        };
        let Some(state) = self.states.get_mut(node) else {
            return false;
        };
        let settled = merged.without_resets();
        if !force && state.pushed.as_ref() == Some(&settled) {
            return false;
        }
        sink.push(node, &merged);
        state.pushed = Some(settled);
        self.stats.pushes += 1;
        true
    }

    /// Merge the buckets of `node`, or return the cached merge.
    fn merge(&mut self, node: NodeId) -> Option<&MergedStyle> {
        let state = self.states.get_mut(node)?;
        if state.merged.is_none() {
            let mut ranked: Vec<&Rule> = state
                .matched
                .iter()
                .flatten()
                .filter_map(|&id| self.rules.get(id))
                .collect();
            ranked.sort_by_key(|rule| rule.sort_key());

            let mut merged = MergedStyle::new();
            for rule in ranked {
                merged.extend_from(&rule.declaration);
            }

            let present: BTreeSet<String> = merged.as_map().keys().cloned().collect();
            if self.config.emit_property_resets {
                for property in state.used_properties.difference(&present) {
                    merged.insert(property.clone(), String::new());
                }
            }
            state.used_properties = present;
            state.merged = Some(merged);
            self.stats.merges += 1;
        }
        state.merged.as_ref()
    }

    fn rebuild_inline<T: StyleTree + ?Sized>(&mut self, tree: &T, node: NodeId) {
        let block = tree
            .inline_style(node)
            .filter(|block| !block.is_empty())
            .cloned();
        let Some(state) = self.states.get_mut(node) else {
            return;
        };
        if let Some(old) = state.inline_rule.take() {
            self.rules.remove(old);
        }
        let bucket = &mut state.matched[RuleBucket::Inline.index()];
        bucket.clear();
        if let Some(block) = block {
            let id = self.rules.insert(Rule::inline(node, block));
            bucket.push(id);
            state.inline_rule = Some(id);
        }
        state.dirty[RuleBucket::Inline.index()] = false;
    }

    fn rematch_bucket<T: StyleTree + ?Sized>(
        &mut self,
        tree: &T,
        node: NodeId,
        bucket: RuleBucket,
        sheets: &[SheetId],
    ) {
        let keys: Vec<TokenIdentity> = match bucket {
            RuleBucket::Tag => tree.tag_name(node).map(TokenIdentity::tag).into_iter().collect(),
            RuleBucket::Class => tree
                .class_list(node)
                .iter()
                .map(|class| TokenIdentity::class(class))
                .collect(),
            RuleBucket::Id => tree.id_attribute(node).map(TokenIdentity::id).into_iter().collect(),
            RuleBucket::Inline => return,
        };

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        for sheet in sheets.iter().filter_map(|&id| self.sheets.get(id)) {
            for key in &keys {
                for &rule_id in sheet.candidates(key) {
                    if seen.insert(rule_id) {
                        candidates.push(rule_id);
                    }
                }
            }
        }

        let Some(state) = self.states.get_mut(node) else {
            return;
        };
        let previous = std::mem::take(&mut state.matched[bucket.index()]);
        let mut matched = Vec::new();
        for rule_id in candidates {
            let Some(rule) = self.rules.get_mut(rule_id) else {
                continue;
            };
            // A rule lives in the bucket of its final token only.
            if rule.selector.bucket() != bucket {
                continue;
            }
            self.stats.matcher_runs += 1;
            if matcher::matches(rule_id, rule, node, tree, state).matched {
                matched.push(rule_id);
            }
        }
        // Rules no longer reachable from the node's own identities.
        for rule_id in previous.into_iter().filter(|id| !seen.contains(id)) {
            if let Some(rule) = self.rules.get_mut(rule_id) {
                rule.matched_nodes.remove(&node);
            }
            state.matched_paths.remove(&rule_id);
        }

        trace!(?node, ?bucket, matched = matched.len(), "re-matched bucket");
        state.matched[bucket.index()] = matched;
        state.dirty[bucket.index()] = false;
    }
}
