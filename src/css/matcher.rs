//! Rule ↔ node matching.
//!
//! Simple rules test the node itself. Descendant rules walk their chain from
//! the final token backwards, keeping a set of candidate nodes (nearest
//! first) that all lie on the node's render-ancestor chain:
//!
//! - a simple token filters the candidates down to those satisfying it;
//! - a descendant combinator replaces them with every render ancestor of the
//!   nearest candidate (which covers the ancestors of all the others);
//! - a child combinator replaces them with their render parents.
//!
//! The nearest candidate surviving each non-final simple token is recorded as
//! the match path. The path feeds change detection only: a different path
//! with the same boolean outcome is not a match change.

use crate::css::cascade::NodeStyleState;
use crate::css::model::{Combinator, CompiledSelectorChain, SimpleSelectorToken};
use crate::css::rule::{Rule, RuleId, RuleSelector};
use crate::css::tree::StyleTree;
use crate::dom::NodeId;

/// Result of matching one rule against one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOutcome {
    pub matched: bool,
    /// The boolean outcome differs from the previous evaluation.
    pub match_changed: bool,
    /// Still matching, but through different ancestors.
    pub path_changed: bool,
}

impl MatchOutcome {
    fn direct(matched: bool) -> Self {
        Self {
            matched,
            ..Self::default()
        }
    }
}

/// Match `rule` against `node`, updating `rule`'s matched-node set and the
/// node's recorded match paths.
pub fn matches<T: StyleTree + ?Sized>(
    rule_id: RuleId,
    rule: &mut Rule,
    node: NodeId,
    tree: &T,
    state: &mut NodeStyleState,
) -> MatchOutcome {
    let outcome = match &rule.selector {
        RuleSelector::Tag(name) => MatchOutcome::direct(tree.tag_name(node) == Some(name.as_str())),
        RuleSelector::Class(name) => MatchOutcome::direct(tree.has_class(node, name)),
        RuleSelector::Id(name) => MatchOutcome::direct(tree.id_attribute(node) == Some(name.as_str())),
        RuleSelector::Inline => MatchOutcome::direct(rule.matched_nodes.contains(&node)),
        RuleSelector::Descendant(chain) => {
            let path = if tree.depth(node) < rule.specificity.depth {
                None
            } else {
                match_chain(chain, node, tree)
            };
            state.record_path(rule_id, path)
        }
    };

    if outcome.matched {
        rule.matched_nodes.insert(node);
    } else {
        rule.matched_nodes.remove(&node);
    }
    outcome
}

/// Walk `chain` right to left from `node`.
///
/// Returns the match path (nearest satisfying node per non-final simple
/// token, right to left) or `None` if the chain does not match.
pub fn match_chain<T: StyleTree + ?Sized>(
    chain: &CompiledSelectorChain,
    node: NodeId,
    tree: &T,
) -> Option<Vec<NodeId>> {
    let mut candidates = vec![node];
    let mut path = Vec::new();
    let mut is_final = true;

    for token in chain.tokens().iter().rev() {
        match token {
            SimpleSelectorToken::Combinator(Combinator::Descendant) => {
                let nearest = *candidates.first()?;
                candidates = tree.render_ancestors(nearest);
            }
            SimpleSelectorToken::Combinator(Combinator::Child) => {
                candidates = candidates
                    .iter()
                    .filter_map(|&n| tree.render_parent(n))
                    .collect();
            }
            simple => {
                candidates.retain(|&n| token_matches(simple, n, tree));
                if !is_final {
                    if let Some(&nearest) = candidates.first() {
                        path.push(nearest);
                    }
                }
                is_final = false;
            }
        }
        if candidates.is_empty() {
            return None;
        }
    }

    Some(path)
}

/// Test a single simple token against a node.
pub fn token_matches<T: StyleTree + ?Sized>(
    token: &SimpleSelectorToken,
    node: NodeId,
    tree: &T,
) -> bool {
    match token {
        SimpleSelectorToken::Tag(name) => tree.tag_name(node) == Some(name.as_str()),
        SimpleSelectorToken::ClassAttr(name) => tree.has_class(node, name),
        SimpleSelectorToken::IdAttr(name) => tree.id_attribute(node) == Some(name.as_str()),
        SimpleSelectorToken::Combinator(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::selector::compile;
    use crate::css::specificity::Specificity;
    use crate::dom::{Dom, NodeData};
    use slotmap::SlotMap;

    struct Rules(SlotMap<RuleId, Rule>);

    impl Rules {
        fn new() -> Self {
            Self(SlotMap::with_key())
        }

        fn add(&mut self, selector: &str) -> RuleId {
            let chain = compile(selector).unwrap();
            let specificity = Specificity::of_chain(&chain);
            let rule = Rule::new(
                RuleSelector::from_chain(chain),
                selector,
                specificity,
                0,
                Default::default(),
            );
            self.0.insert(rule)
        }

        fn run(&mut self, id: RuleId, node: NodeId, dom: &Dom, state: &mut NodeStyleState) -> MatchOutcome {
            matches(id, &mut self.0[id], node, dom, state)
        }
    }

    /// ```text
    /// outer (.a)
    ///   inner (.a)
    ///     wrapper (not render-capable)
    ///       leaf (span.b)
    /// ```
    fn nested() -> (Dom, NodeId, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let outer = dom.insert(NodeData::new("div").with_class("a"));
        let inner = dom.insert_child(outer, NodeData::new("div").with_class("a"));
        let wrapper = dom.insert_child(inner, NodeData::wrapper("fragment"));
        let leaf = dom.insert_child(wrapper, NodeData::new("span").with_class("b"));
        (dom, outer, inner, wrapper, leaf)
    }

    #[test]
    fn simple_rules_test_the_node_itself() {
        let (dom, outer, _, _, leaf) = nested();
        let mut rules = Rules::new();
        let tag = rules.add("span");
        let class = rules.add(".a");
        let mut state = NodeStyleState::new();

        let out = rules.run(tag, leaf, &dom, &mut state);
        assert_eq!(out, MatchOutcome { matched: true, match_changed: false, path_changed: false });
        assert!(!rules.run(class, leaf, &dom, &mut state).matched);
        assert!(rules.run(class, outer, &dom, &mut state).matched);
        assert!(rules.0[tag].is_matched_by(leaf));
        assert!(!rules.0[class].is_matched_by(leaf));
    }

    #[test]
    fn descendant_records_nearest_ancestor_through_wrappers() {
        let (dom, _, inner, _, leaf) = nested();
        let chain = compile(".a .b").unwrap();
        assert_eq!(match_chain(&chain, leaf, &dom), Some(vec![inner]));
    }

    #[test]
    fn child_combinator_skips_wrappers() {
        let (dom, outer, inner, _, leaf) = nested();
        assert_eq!(match_chain(&compile("div > span").unwrap(), leaf, &dom), Some(vec![inner]));
        assert_eq!(
            match_chain(&compile(".a > .a > .b").unwrap(), leaf, &dom),
            Some(vec![inner, outer])
        );
        assert_eq!(match_chain(&compile(".a > .a > .a > .b").unwrap(), leaf, &dom), None);
    }

    #[test]
    fn child_after_descendant_considers_all_candidates() {
        // html > body.x > div > div > p: `.x > div p` must find the outer div
        // even though the nearest div's parent is not `.x`.
        let mut dom = Dom::new();
        let body = dom.insert(NodeData::new("body").with_class("x"));
        let outer = dom.insert_child(body, NodeData::new("div"));
        let inner = dom.insert_child(outer, NodeData::new("div"));
        let p = dom.insert_child(inner, NodeData::new("p"));
        let path = match_chain(&compile(".x > div p").unwrap(), p, &dom);
        assert_eq!(path, Some(vec![inner, body]));
    }

    #[test]
    fn first_match_and_loss_are_changes() {
        let (mut dom, outer, inner, _, leaf) = nested();
        let mut rules = Rules::new();
        let rule = rules.add(".a .b");
        let mut state = NodeStyleState::new();

        let first = rules.run(rule, leaf, &dom, &mut state);
        assert_eq!(first, MatchOutcome { matched: true, match_changed: true, path_changed: false });
        assert_eq!(state.matched_path(rule), Some(&[inner][..]));

        let again = rules.run(rule, leaf, &dom, &mut state);
        assert_eq!(again, MatchOutcome { matched: true, match_changed: false, path_changed: false });

        dom.get_mut(inner).unwrap().classes.clear();
        let moved = rules.run(rule, leaf, &dom, &mut state);
        assert_eq!(moved, MatchOutcome { matched: true, match_changed: false, path_changed: true });
        assert_eq!(state.matched_path(rule), Some(&[outer][..]));

        dom.get_mut(outer).unwrap().classes.clear();
        let lost = rules.run(rule, leaf, &dom, &mut state);
        assert_eq!(lost, MatchOutcome { matched: false, match_changed: true, path_changed: false });
        assert!(state.matched_path(rule).is_none());
        assert!(!rules.0[rule].is_matched_by(leaf));

        let still_lost = rules.run(rule, leaf, &dom, &mut state);
        assert_eq!(still_lost, MatchOutcome::default());
    }

    #[test]
    fn too_shallow_nodes_rejected_early() {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::new("div").with_class("b"));
        let mut rules = Rules::new();
        let rule = rules.add(".a .b");
        let mut state = NodeStyleState::new();
        assert!(!rules.run(rule, root, &dom, &mut state).matched);
    }

    #[test]
    fn final_token_must_match_node() {
        let (dom, _, _, _, leaf) = nested();
        let chain = compile(".a div").unwrap();
        assert_eq!(match_chain(&chain, leaf, &dom), None);
    }

    #[test]
    fn id_tokens() {
        let mut dom = Dom::new();
        let app = dom.insert(NodeData::new("div").with_id("app"));
        let item = dom.insert_child(app, NodeData::new("li").with_id("first"));
        assert_eq!(match_chain(&compile("#app #first").unwrap(), item, &dom), Some(vec![app]));
        assert!(token_matches(&SimpleSelectorToken::IdAttr("app".into()), app, &dom));
        assert!(!token_matches(&SimpleSelectorToken::Combinator(Combinator::Child), app, &dom));
    }
}
