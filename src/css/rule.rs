//! Compiled rules: one selector paired with one declaration block.

use std::collections::BTreeSet;

use slotmap::new_key_type;

use crate::css::model::{CompiledSelectorChain, DeclarationBlock, SimpleSelectorToken, TokenIdentity};
use crate::css::specificity::Specificity;
use crate::dom::NodeId;

new_key_type! {
    /// Handle to a [`Rule`] in the engine's rule arena.
    pub struct RuleId;
}

/// What a rule selects on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSelector {
    /// `div`
    Tag(String),
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    /// Any chain with at least one combinator.
    Descendant(CompiledSelectorChain),
    /// A node's own inline style.
    Inline,
}

/// Coarse classification of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Tag,
    Class,
    Id,
    Descendant,
    Inline,
}

/// The per-node cache bucket a matched rule is stored in.
///
/// Descendant rules go to the bucket of their final token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleBucket {
    Inline,
    Tag,
    Class,
    Id,
}

impl RuleBucket {
    pub const ALL: [RuleBucket; 4] = [
        RuleBucket::Inline,
        RuleBucket::Tag,
        RuleBucket::Class,
        RuleBucket::Id,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            RuleBucket::Inline => 0,
            RuleBucket::Tag => 1,
            RuleBucket::Class => 2,
            RuleBucket::Id => 3,
        }
    }
}

impl RuleSelector {
    /// Classify a compiled chain. Single-token chains become simple rules.
    pub fn from_chain(chain: CompiledSelectorChain) -> Self {
        if chain.is_compound() {
            return RuleSelector::Descendant(chain);
        }
        match chain.last() {
            Some(SimpleSelectorToken::Tag(name)) => RuleSelector::Tag(name.clone()),
            Some(SimpleSelectorToken::ClassAttr(name)) => RuleSelector::Class(name.clone()),
            Some(SimpleSelectorToken::IdAttr(name)) => RuleSelector::Id(name.clone()),
            // Compiled chains never end in a combinator and are never empty.
            Some(SimpleSelectorToken::Combinator(_)) | None => RuleSelector::Descendant(chain),
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RuleSelector::Tag(_) => RuleKind::Tag,
            RuleSelector::Class(_) => RuleKind::Class,
            RuleSelector::Id(_) => RuleKind::Id,
            RuleSelector::Descendant(_) => RuleKind::Descendant,
            RuleSelector::Inline => RuleKind::Inline,
        }
    }

    pub fn bucket(&self) -> RuleBucket {
        match self {
            RuleSelector::Tag(_) => RuleBucket::Tag,
            RuleSelector::Class(_) => RuleBucket::Class,
            RuleSelector::Id(_) => RuleBucket::Id,
            RuleSelector::Inline => RuleBucket::Inline,
            RuleSelector::Descendant(chain) => match chain.last() {
                Some(SimpleSelectorToken::ClassAttr(_)) => RuleBucket::Class,
                Some(SimpleSelectorToken::IdAttr(_)) => RuleBucket::Id,
                _ => RuleBucket::Tag,
            },
        }
    }

    /// Identity of the final token, used as the `by_last_token` key.
    pub fn last_identity(&self) -> Option<TokenIdentity> {
        match self {
            RuleSelector::Tag(name) => Some(TokenIdentity::tag(name)),
            RuleSelector::Class(name) => Some(TokenIdentity::class(name)),
            RuleSelector::Id(name) => Some(TokenIdentity::id(name)),
            RuleSelector::Descendant(chain) => chain.last().and_then(SimpleSelectorToken::identity),
            RuleSelector::Inline => None,
        }
    }
}

/// One compiled declaration.
#[derive(Debug, Clone)]
pub struct Rule {
    pub selector: RuleSelector,
    /// The selector text this rule was compiled from (empty for inline).
    pub source: String,
    pub specificity: Specificity,
    /// Global declaration order, used as tie-break.
    pub order: u64,
    pub declaration: DeclarationBlock,
    /// Nodes currently satisfying this rule.
    pub(crate) matched_nodes: BTreeSet<NodeId>,
}

impl Rule {
    pub fn new(
        selector: RuleSelector,
        source: impl Into<String>,
        specificity: Specificity,
        order: u64,
        declaration: DeclarationBlock,
    ) -> Self {
        Self {
            selector,
            source: source.into(),
            specificity,
            order,
            declaration,
            matched_nodes: BTreeSet::new(),
        }
    }

    /// The inline pseudo-rule for one node.
    pub fn inline(node: NodeId, declaration: DeclarationBlock) -> Self {
        let mut rule = Self::new(RuleSelector::Inline, "", Specificity::inline(), 0, declaration);
        rule.matched_nodes.insert(node);
        rule
    }

    pub fn kind(&self) -> RuleKind {
        self.selector.kind()
    }

    pub fn sort_key(&self) -> u64 {
        self.specificity.sort_key(self.order)
    }

    pub fn matched_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.matched_nodes.iter().copied()
    }

    pub fn is_matched_by(&self, node: NodeId) -> bool {
        self.matched_nodes.contains(&node)
    }
}
