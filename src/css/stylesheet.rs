//! Rule table builder: declaration map → bucketed [`StyleSheet`].
//!
//! Every rule is indexed under the identity of its final token
//! (`by_last_token`), which gives O(1) candidate lookup from a node's own tag,
//! classes and id. Descendant rules are additionally indexed under each of
//! their non-final tokens (`by_non_final_token`); that index is only consulted
//! when an ancestor's class or id changes.

use std::collections::{HashMap, HashSet};

use slotmap::{new_key_type, SlotMap};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::css::model::{declarations, CompiledSelectorChain, DeclarationBlock, TokenIdentity};
use crate::css::rule::{Rule, RuleId, RuleSelector};
use crate::css::selector::{split_group, SelectorCache, SelectorError};
use crate::css::specificity::{Specificity, ORDER_SPAN};

new_key_type! {
    /// Handle to a compiled [`StyleSheet`].
    pub struct SheetId;
}

/// An uncompiled style sheet: selector keys mapped to declaration blocks, in
/// declaration order.
///
/// Behaves like an insertion-ordered map: pushing a selector that is already
/// present replaces its block in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SheetSource {
    entries: Vec<(String, DeclarationBlock)>,
}

impl SheetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule (builder).
    pub fn rule<K, V>(
        mut self,
        selector: impl Into<String>,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.push(selector, declarations(pairs));
        self
    }

    pub fn push(&mut self, selector: impl Into<String>, block: DeclarationBlock) {
        let selector = selector.into();
        match self.entries.iter_mut().find(|(key, _)| *key == selector) {
            Some((_, existing)) => *existing = block,
            None => self.entries.push((selector, block)),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &DeclarationBlock)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A compiled style sheet.
#[derive(Debug)]
pub struct StyleSheet {
    pub id: SheetId,
    /// Order of the first rule; later sheets start after earlier ones.
    pub order_base: u64,
    rules: Vec<RuleId>,
    by_last_token: HashMap<TokenIdentity, Vec<RuleId>>,
    by_non_final_token: HashMap<TokenIdentity, Vec<RuleId>>,
    /// Number of live registrations referencing this sheet.
    pub(crate) holders: usize,
    /// Key under which this sheet sits in the engine's sheet memo, if any.
    pub(crate) memo_key: Option<SheetSource>,
}

impl StyleSheet {
    /// Rules whose final token has the given identity.
    pub fn candidates(&self, identity: &TokenIdentity) -> &[RuleId] {
        self.by_last_token
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Descendant rules that use the given identity in a non-final step.
    pub fn non_final_candidates(&self, identity: &TokenIdentity) -> &[RuleId] {
        self.by_non_final_token
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All rules of the sheet in declaration order.
    pub fn rules(&self) -> &[RuleId] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn holders(&self) -> usize {
        self.holders
    }
}

/// Compiles [`SheetSource`]s into the rule arena.
pub struct RuleTableBuilder<'a> {
    config: &'a EngineConfig,
    selectors: &'a mut SelectorCache,
    rules: &'a mut SlotMap<RuleId, Rule>,
}

impl<'a> RuleTableBuilder<'a> {
    pub fn new(
        config: &'a EngineConfig,
        selectors: &'a mut SelectorCache,
        rules: &'a mut SlotMap<RuleId, Rule>,
    ) -> Self {
        Self {
            config,
            selectors,
            rules,
        }
    }

    /// Build the sheet `id` from `source`, numbering rules from `order_base`.
    ///
    /// A selector that fails to compile is logged and skipped; the rest of the
    /// sheet still compiles.
    pub fn build(&mut self, id: SheetId, order_base: u64, source: &SheetSource) -> StyleSheet {
        let mut sheet = StyleSheet {
            id,
            order_base,
            rules: Vec::new(),
            by_last_token: HashMap::new(),
            by_non_final_token: HashMap::new(),
            holders: 0,
            memo_key: None,
        };
        let mut processed: HashSet<&str> = HashSet::new();
        let mut skipped = 0usize;

        for (key, block) in source.entries() {
            if self.config.skip_reserved_blocks && key.trim_start().starts_with('@') {
                debug!(block = key, "skipping reserved block");
                continue;
            }
            for member in split_group(key) {
                if !processed.insert(member) {
                    continue;
                }
                let chain = match self.compile_member(member) {
                    Ok(chain) => chain,
                    Err(error) => {
                        warn!(selector = member, %error, "skipping style rule");
                        skipped += 1;
                        continue;
                    }
                };
                let order = order_base + sheet.rules.len() as u64;
                if order >= ORDER_SPAN {
                    warn!(order, "rule order exceeds sort key span; ties may misorder");
                }
                self.insert_rule(&mut sheet, member, chain, order, block);
            }
        }

        debug!(
            rules = sheet.rules.len(),
            skipped,
            order_base,
            "compiled style sheet"
        );
        sheet
    }

    fn compile_member(&mut self, member: &str) -> Result<CompiledSelectorChain, SelectorError> {
        let chain = self.selectors.get_or_compile(member)?;
        let simple_tokens = chain.hops() as usize + 1;
        if simple_tokens > self.config.max_chain_len {
            return Err(SelectorError::Unsupported {
                selector: member.to_owned(),
                feature: format!("chain of {simple_tokens} selectors"),
            });
        }
        Ok(chain)
    }

    fn insert_rule(
        &mut self,
        sheet: &mut StyleSheet,
        member: &str,
        chain: CompiledSelectorChain,
        order: u64,
        block: &DeclarationBlock,
    ) {
        let specificity = Specificity::of_chain(&chain);
        let non_final = chain.non_final_identities();
        let selector = RuleSelector::from_chain(chain);
        let Some(last) = selector.last_identity() else {
            return;
        };
        let is_descendant = matches!(selector, RuleSelector::Descendant(_));

        let rule_id = self
            .rules
            .insert(Rule::new(selector, member, specificity, order, block.clone()));
        sheet.rules.push(rule_id);
        sheet.by_last_token.entry(last).or_default().push(rule_id);
        if is_descendant {
            for identity in non_final {
                sheet.by_non_final_token.entry(identity).or_default().push(rule_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::rule::RuleKind;

    struct Fixture {
        config: EngineConfig,
        selectors: SelectorCache,
        rules: SlotMap<RuleId, Rule>,
        sheets: SlotMap<SheetId, ()>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: EngineConfig::default(),
                selectors: SelectorCache::new(),
                rules: SlotMap::with_key(),
                sheets: SlotMap::with_key(),
            }
        }

        fn build(&mut self, order_base: u64, source: &SheetSource) -> StyleSheet {
            let id = self.sheets.insert(());
            RuleTableBuilder::new(&self.config, &mut self.selectors, &mut self.rules)
                .build(id, order_base, source)
        }

        fn rule(&self, id: RuleId) -> &Rule {
            &self.rules[id]
        }
    }

    #[test]
    fn simple_rules_bucketed_by_identity() {
        let mut fx = Fixture::new();
        let source = SheetSource::new()
            .rule("div", [("c", "t")])
            .rule(".x", [("c", "c")])
            .rule("#i", [("c", "i")]);
        let sheet = fx.build(0, &source);

        assert_eq!(sheet.len(), 3);
        let div = sheet.candidates(&TokenIdentity::tag("div"));
        assert_eq!(div.len(), 1);
        assert_eq!(fx.rule(div[0]).kind(), RuleKind::Tag);
        assert_eq!(fx.rule(sheet.candidates(&TokenIdentity::class("x"))[0]).kind(), RuleKind::Class);
        assert_eq!(fx.rule(sheet.candidates(&TokenIdentity::id("i"))[0]).kind(), RuleKind::Id);
    }

    #[test]
    fn orders_follow_declaration_position() {
        let mut fx = Fixture::new();
        let source = SheetSource::new()
            .rule("a", [("p", "1")])
            .rule("b", [("p", "2")]);
        let sheet = fx.build(10, &source);
        let orders: Vec<u64> = sheet.rules().iter().map(|&id| fx.rule(id).order).collect();
        assert_eq!(orders, vec![10, 11]);
        assert_eq!(sheet.order_base, 10);
    }

    #[test]
    fn descendant_rule_indexed_by_last_and_non_final_tokens() {
        let mut fx = Fixture::new();
        let source = SheetSource::new().rule("#app .a > span", [("v", "1")]);
        let sheet = fx.build(0, &source);

        let last = sheet.candidates(&TokenIdentity::tag("span"));
        assert_eq!(last.len(), 1);
        let rule_id = last[0];
        assert_eq!(fx.rule(rule_id).kind(), RuleKind::Descendant);
        assert_eq!(fx.rule(rule_id).specificity.depth, 3);

        assert_eq!(sheet.non_final_candidates(&TokenIdentity::id("app")), &[rule_id]);
        assert_eq!(sheet.non_final_candidates(&TokenIdentity::class("a")), &[rule_id]);
        // Never indexed the other way round.
        assert!(sheet.non_final_candidates(&TokenIdentity::tag("span")).is_empty());
        assert!(sheet.candidates(&TokenIdentity::class("a")).is_empty());
    }

    #[test]
    fn simple_rules_never_in_non_final_index() {
        let mut fx = Fixture::new();
        let sheet = fx.build(0, &SheetSource::new().rule(".a", [("v", "1")]));
        assert!(sheet.non_final_candidates(&TokenIdentity::class("a")).is_empty());
    }

    #[test]
    fn bad_selector_skipped_rest_compiles() {
        let mut fx = Fixture::new();
        let source = SheetSource::new()
            .rule("a:hover", [("c", "x")])
            .rule("> b", [("c", "x")])
            .rule(".ok", [("c", "y")]);
        let sheet = fx.build(0, &source);
        assert_eq!(sheet.len(), 1);
        assert_eq!(fx.rule(sheet.rules()[0]).source, ".ok");
        // Skipped rules do not consume an order slot.
        assert_eq!(fx.rule(sheet.rules()[0]).order, 0);
    }

    #[test]
    fn reserved_blocks_skipped() {
        let mut fx = Fixture::new();
        let source = SheetSource::new()
            .rule("@keyframes spin", [("from", "0")])
            .rule("@font-face", [("font-family", "x")])
            .rule("div", [("c", "t")]);
        let sheet = fx.build(0, &source);
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn reserved_blocks_rejected_when_not_skipped() {
        let mut fx = Fixture::new();
        fx.config = EngineConfig::default().with_skip_reserved_blocks(false);
        let sheet = fx.build(0, &SheetSource::new().rule("@font-face", [("a", "b")]));
        assert!(sheet.is_empty());
    }

    #[test]
    fn selector_group_expands_to_one_rule_per_member() {
        let mut fx = Fixture::new();
        let source = SheetSource::new().rule("div, .x, div", [("c", "g")]);
        let sheet = fx.build(0, &source);
        assert_eq!(sheet.len(), 2);
        let orders: Vec<u64> = sheet.rules().iter().map(|&id| fx.rule(id).order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert!(sheet.rules().iter().all(|&id| fx.rule(id).declaration["c"] == "g"));
    }

    #[test]
    fn chain_length_limit() {
        let mut fx = Fixture::new();
        fx.config = EngineConfig::default().with_max_chain_len(2);
        let source = SheetSource::new()
            .rule(".a .b .c", [("v", "1")])
            .rule(".a .b", [("v", "2")]);
        let sheet = fx.build(0, &source);
        assert_eq!(sheet.len(), 1);
        assert_eq!(fx.rule(sheet.rules()[0]).source, ".a .b");
    }

    #[test]
    fn repeated_selectors_hit_the_selector_memo() {
        let mut fx = Fixture::new();
        let source = SheetSource::new().rule(".a .b", [("v", "1")]);
        fx.build(0, &source);
        fx.build(1, &source);
        assert_eq!(fx.selectors.hits(), 1);
    }

    #[test]
    fn source_push_replaces_in_place() {
        let source = SheetSource::new()
            .rule("a", [("p", "1")])
            .rule("b", [("p", "2")])
            .rule("a", [("q", "3")]);
        let entries: Vec<_> = source.entries().map(|(k, v)| (k, v.len())).collect();
        assert_eq!(entries, vec![("a", 1), ("b", 1)]);
        assert_eq!(source.entries().next().unwrap().1["q"], "3");
    }
}
