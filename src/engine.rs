//! The style engine: rule and sheet arenas, memo tables, sheet scopes and
//! per-node style state.
//!
//! [`StyleEngine`] never owns the node tree. Every operation that needs node
//! data takes a [`StyleTree`] view, so the engine can style any tree that
//! answers the tag/class/id/ancestry questions.

use std::collections::{HashMap, HashSet};

use slotmap::{SecondaryMap, SlotMap};
use tracing::debug;

use crate::config::EngineConfig;
use crate::css::cascade::{NodeStyleState, RuleScope};
use crate::css::model::DeclarationBlock;
use crate::css::rule::{Rule, RuleId};
use crate::css::selector::{split_group, SelectorCache};
use crate::css::stylesheet::{RuleTableBuilder, SheetId, SheetSource, StyleSheet};
use crate::css::tree::StyleTree;
use crate::dom::NodeId;

// ---------------------------------------------------------------------------
// CascadeStats
// ---------------------------------------------------------------------------

/// Counters for observing how much work the engine does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeStats {
    /// Rule-against-node matcher invocations.
    pub matcher_runs: u64,
    /// Merged styles computed (cache misses).
    pub merges: u64,
    /// Styles delivered to a sink.
    pub pushes: u64,
    pub selector_memo_hits: u64,
    pub sheet_memo_hits: u64,
}

// ---------------------------------------------------------------------------
// StyleEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Registration {
    holder: NodeId,
    name: String,
    sheet: SheetId,
}

/// Owns compiled sheets and per-node cascade state.
pub struct StyleEngine {
    pub(crate) config: EngineConfig,
    pub(crate) selectors: SelectorCache,
    pub(crate) rules: SlotMap<RuleId, Rule>,
    pub(crate) sheets: SlotMap<SheetId, StyleSheet>,
    sheet_memo: HashMap<SheetSource, SheetId>,
    /// Visible to every node, in registration order.
    document_sheets: Vec<Registration>,
    /// Visible to the owner and its descendants that own no sheet themselves.
    local_sheets: SecondaryMap<NodeId, Vec<Registration>>,
    pub(crate) states: SecondaryMap<NodeId, NodeStyleState>,
    next_order: u64,
    pub(crate) stats: CascadeStats,
}

impl StyleEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            selectors: SelectorCache::new(),
            rules: SlotMap::with_key(),
            sheets: SlotMap::with_key(),
            sheet_memo: HashMap::new(),
            document_sheets: Vec::new(),
            local_sheets: SecondaryMap::new(),
            states: SecondaryMap::new(),
            next_order: 0,
            stats: CascadeStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> CascadeStats {
        CascadeStats {
            selector_memo_hits: self.selectors.hits(),
            ..self.stats
        }
    }

    pub fn sheet(&self, id: SheetId) -> Option<&StyleSheet> {
        self.sheets.get(id)
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id)
    }

    /// Number of live rules, inline pseudo-rules included.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn state(&self, node: NodeId) -> Option<&NodeStyleState> {
        self.states.get(node)
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.states.contains_key(node)
    }

    /// Attached nodes, in no particular order.
    pub fn attached(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.states.keys()
    }

    // ── Node lifetime ────────────────────────────────────────────────

    /// Give `node` a fresh style state. Returns `false` if it already had one.
    pub fn attach(&mut self, node: NodeId) -> bool {
        if self.states.contains_key(node) {
            return false;
        }
        self.states.insert(node, NodeStyleState::new());
        true
    }

    /// Drop `node`'s style state, every rule's reference to it, and the
    /// sheets it registered.
    ///
    /// Returns the still-attached nodes whose sheet scope changed as a result;
    /// they have been invalidated and need a restyle.
    pub fn detach<T: StyleTree + ?Sized>(&mut self, tree: &T, node: NodeId) -> Vec<NodeId> {
        if let Some(state) = self.states.remove(node) {
            for rule_id in state.referenced_rules() {
                if let Some(rule) = self.rules.get_mut(rule_id) {
                    rule.matched_nodes.remove(&node);
                }
            }
            if let Some(inline) = state.inline_rule {
                self.rules.remove(inline);
            }
        }

        let mut affected = Vec::new();
        if let Some(local) = self.local_sheets.remove(node) {
            affected.extend(self.scope_subtree(tree, node));
            for registration in local {
                self.release_sheet(registration.sheet);
            }
        }
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.document_sheets)
            .into_iter()
            .partition(|registration| registration.holder == node);
        self.document_sheets = kept;
        if !dropped.is_empty() {
            affected = self.states.keys().collect();
            for registration in dropped {
                self.release_sheet(registration.sheet);
            }
        }

        affected.retain(|&id| id != node);
        self.invalidate_all(&affected);
        affected
    }

    // ── Sheets ───────────────────────────────────────────────────────

    /// Register `source` under `name` for `holder`.
    ///
    /// A document-level sheet is visible to every node; a local one to
    /// `holder` and the descendants that own no sheet themselves. A sheet
    /// already registered under `name` (document-wide, or by `holder` for
    /// local sheets) is replaced.
    ///
    /// Returns the attached nodes whose cascade may have changed; they have
    /// been invalidated and need a restyle.
    pub fn register_sheet<T: StyleTree + ?Sized>(
        &mut self,
        tree: &T,
        name: &str,
        source: &SheetSource,
        document_level: bool,
        holder: NodeId,
    ) -> Vec<NodeId> {
        let sheet = self.compile_sheet(source, name, document_level, holder);
        let registration = Registration {
            holder,
            name: name.to_owned(),
            sheet,
        };

        let replaced = if document_level {
            replace_or_push(&mut self.document_sheets, registration)
        } else {
            match self.local_sheets.get_mut(holder) {
                Some(list) => replace_or_push(list, registration),
                None => {
                    self.local_sheets.insert(holder, vec![registration]);
                    None
                }
            }
        };
        if let Some(old) = replaced {
            self.release_sheet(old);
        }

        let affected: Vec<NodeId> = if document_level {
            self.states.keys().collect()
        } else {
            self.scope_subtree(tree, holder)
        };
        debug!(name, document_level, affected = affected.len(), "registered style sheet");
        self.invalidate_all(&affected);
        affected
    }

    /// Compile `source`, or reuse an identical sheet already compiled.
    ///
    /// A compiled sheet is only reused while its rules still order after
    /// every sheet it would sit beside; otherwise a fresh copy is compiled
    /// so the later registration wins ties.
    fn compile_sheet(
        &mut self,
        source: &SheetSource,
        name: &str,
        document_level: bool,
        holder: NodeId,
    ) -> SheetId {
        if self.config.memoize_sheets {
            if let Some(&id) = self.sheet_memo.get(source) {
                let latest = self.latest_order_beside(name, document_level, holder);
                if let Some(sheet) = self.sheets.get_mut(id) {
                    let still_latest =
                        sheet.is_empty() || latest.map_or(true, |order| sheet.order_base > order);
                    if still_latest {
                        sheet.holders += 1;
                        self.stats.sheet_memo_hits += 1;
                        debug!(rules = sheet.len(), "style sheet memo hit");
                        return id;
                    }
                    debug!(name, "memoized style sheet is outranked; recompiling");
                }
            }
        }

        let order_base = self.next_order;
        let mut builder = RuleTableBuilder::new(&self.config, &mut self.selectors, &mut self.rules);
        let id = self
            .sheets
            .insert_with_key(|id| builder.build(id, order_base, source));
        if let Some(sheet) = self.sheets.get_mut(id) {
            sheet.holders = 1;
            self.next_order += sheet.len() as u64;
            if self.config.memoize_sheets {
                sheet.memo_key = Some(source.clone());
                self.sheet_memo.insert(source.clone(), id);
            }
        }
        id
    }

    /// Highest rule order among the sheets a new registration would share a
    /// scope with: every sheet for a document-level one, the document sheets
    /// and `holder`'s own otherwise. The registration it replaces is skipped.
    fn latest_order_beside(&self, name: &str, document_level: bool, holder: NodeId) -> Option<u64> {
        let document = self
            .document_sheets
            .iter()
            .filter(|registration| !(document_level && registration.name == name));
        let local: Vec<&Registration> = if document_level {
            self.local_sheets.values().flatten().collect()
        } else {
            self.local_sheets
                .get(holder)
                .into_iter()
                .flatten()
                .filter(|registration| registration.name != name)
                .collect()
        };
        document
            .chain(local)
            .filter_map(|registration| self.sheets.get(registration.sheet))
            .filter(|sheet| !sheet.is_empty())
            .map(|sheet| sheet.order_base + sheet.len() as u64 - 1)
            .max()
    }

    /// Drop one holder of `id`; the last one frees the sheet and its rules.
    fn release_sheet(&mut self, id: SheetId) {
        let Some(sheet) = self.sheets.get_mut(id) else {
            return;
        };
        sheet.holders = sheet.holders.saturating_sub(1);
        if sheet.holders > 0 {
            return;
        }
        let Some(sheet) = self.sheets.remove(id) else {
            return;
        };
        if let Some(key) = &sheet.memo_key {
            self.forget_memo(key, id);
        }
        for &rule_id in sheet.rules() {
            self.rules.remove(rule_id);
        }
        debug!(rules = sheet.len(), "released style sheet");
    }

    /// Drop the memo entry for `key` if it still points at `id`; a newer
    /// copy of the same source may have taken it over.
    fn forget_memo(&mut self, key: &SheetSource, id: SheetId) {
        if self.sheet_memo.get(key) == Some(&id) {
            self.sheet_memo.remove(key);
        }
    }

    /// Sheets visible to `node`: document sheets, then the local sheets of
    /// the nearest ancestor-or-self that owns any.
    pub fn sheets_in_scope<T: StyleTree + ?Sized>(&self, tree: &T, node: NodeId) -> Vec<SheetId> {
        let mut out: Vec<SheetId> = Vec::new();
        let mut push = |id: SheetId| {
            if !out.contains(&id) {
                out.push(id);
            }
        };
        for registration in &self.document_sheets {
            push(registration.sheet);
        }
        let mut current = Some(node);
        while let Some(candidate) = current {
            if let Some(local) = self.local_sheets.get(candidate) {
                for registration in local {
                    push(registration.sheet);
                }
                break;
            }
            current = tree.parent(candidate);
        }
        out
    }

    /// Attached nodes in `owner`'s local scope: `owner` and its subtree,
    /// not descending into nodes that own their own sheets.
    fn scope_subtree<T: StyleTree + ?Sized>(&self, tree: &T, owner: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![owner];
        while let Some(current) = stack.pop() {
            if current != owner && self.local_sheets.contains_key(current) {
                continue;
            }
            if self.states.contains_key(current) {
                out.push(current);
            }
            stack.extend(tree.children(current).iter().rev());
        }
        out
    }

    fn invalidate_all(&mut self, nodes: &[NodeId]) {
        for &node in nodes {
            if let Some(state) = self.states.get_mut(node) {
                state.mark_dirty(RuleScope::All);
            }
        }
    }

    // ── Rules ────────────────────────────────────────────────────────

    /// Rules of `sheet` compiled from `selector` (each group member counts).
    pub fn find_rules(&self, sheet: SheetId, selector: &str) -> Vec<RuleId> {
        let Some(sheet) = self.sheets.get(sheet) else {
            return Vec::new();
        };
        let members: HashSet<&str> = split_group(selector).collect();
        sheet
            .rules()
            .iter()
            .copied()
            .filter(|&id| {
                self.rules
                    .get(id)
                    .is_some_and(|rule| members.contains(rule.source.as_str()))
            })
            .collect()
    }

    /// Replace the declaration of every rule `selector` compiled to in
    /// `sheet`.
    ///
    /// Matching is unaffected, so only the merged caches of the nodes
    /// currently matching those rules are dropped. Returns those nodes.
    pub fn set_rule_declaration(
        &mut self,
        sheet: SheetId,
        selector: &str,
        declaration: DeclarationBlock,
    ) -> Vec<NodeId> {
        let targets = self.find_rules(sheet, selector);
        if targets.is_empty() {
            return Vec::new();
        }
        // The compiled sheet no longer reflects its source.
        if let Some(key) = self.sheets.get_mut(sheet).and_then(|s| s.memo_key.take()) {
            self.forget_memo(&key, sheet);
        }

        let mut affected = Vec::new();
        let mut seen = HashSet::new();
        for rule_id in targets {
            let Some(rule) = self.rules.get_mut(rule_id) else {
                continue;
            };
            rule.declaration = declaration.clone();
            for node in rule.matched_nodes() {
                if seen.insert(node) {
                    affected.push(node);
                }
            }
        }
        for &node in &affected {
            if let Some(state) = self.states.get_mut(node) {
                state.invalidate_merge();
            }
        }
        debug!(selector, affected = affected.len(), "edited rule declaration");
        affected
    }

    /// Sheets registered document-wide, in order, with their names.
    pub fn document_sheets(&self) -> impl Iterator<Item = (&str, SheetId)> {
        self.document_sheets
            .iter()
            .map(|registration| (registration.name.as_str(), registration.sheet))
    }

    /// Local sheets owned by `node`, with their names.
    pub fn local_sheets(&self, node: NodeId) -> impl Iterator<Item = (&str, SheetId)> {
        self.local_sheets
            .get(node)
            .into_iter()
            .flatten()
            .map(|registration| (registration.name.as_str(), registration.sheet))
    }
}

impl Default for StyleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Replace the registration with the same name in place, or append.
/// Returns the sheet that was replaced.
fn replace_or_push(list: &mut Vec<Registration>, registration: Registration) -> Option<SheetId> {
    match list.iter_mut().find(|existing| existing.name == registration.name) {
        Some(existing) => Some(std::mem::replace(existing, registration).sheet),
        None => {
            list.push(registration);
            None
        }
    }
}
