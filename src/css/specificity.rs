//! Weighted specificity and the cascade sort key.
//!
//! A rule's weight is the sum over every simple token of its chain:
//!
//! ```text
//! id     1_000_000
//! class      1_000
//! tag            1
//! inline 1_000_000_000   (pseudo-rule for a node's own style)
//! ```
//!
//! The sort key is `weight * ORDER_SPAN + order`: a higher weight always
//! outranks order, and equal weights are broken by later declaration.

use crate::css::model::{CompiledSelectorChain, SimpleSelectorToken};

pub const ID_WEIGHT: u64 = 1_000_000;
pub const CLASS_WEIGHT: u64 = 1_000;
pub const TAG_WEIGHT: u64 = 1;
pub const INLINE_WEIGHT: u64 = 1_000_000_000;

/// Multiplier separating weight from order in the sort key. Rule orders must
/// stay below it for the key to remain a total order.
pub const ORDER_SPAN: u64 = 1_000_000;

/// Specificity of one compiled rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Specificity {
    /// Weighted sum of the chain's tag/class/id tokens.
    pub weight: u64,
    /// Combinator hops + 1. A node with fewer render levels (itself
    /// included) cannot match.
    pub depth: u32,
}

impl Specificity {
    /// Specificity of a compiled chain. Combinators weigh nothing but deepen.
    pub fn of_chain(chain: &CompiledSelectorChain) -> Self {
        let weight = chain.tokens().iter().map(token_weight).sum();
        Self {
            weight,
            depth: chain.hops() + 1,
        }
    }

    /// Specificity of a node's inline-style pseudo-rule.
    pub fn inline() -> Self {
        Self {
            weight: INLINE_WEIGHT,
            depth: 1,
        }
    }

    /// Total cascade order for a rule with this specificity at `order`.
    pub fn sort_key(&self, order: u64) -> u64 {
        self.weight.saturating_mul(ORDER_SPAN).saturating_add(order)
    }
}

fn token_weight(token: &SimpleSelectorToken) -> u64 {
    match token {
        SimpleSelectorToken::IdAttr(_) => ID_WEIGHT,
        SimpleSelectorToken::ClassAttr(_) => CLASS_WEIGHT,
        SimpleSelectorToken::Tag(_) => TAG_WEIGHT,
        SimpleSelectorToken::Combinator(_) => 0,
    }
}
