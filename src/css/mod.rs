//! Style engine core: selector compiler, rule tables, matcher, cascade and
//! invalidation.

pub mod tokenizer;
pub mod model;
pub mod selector;
pub mod specificity;
pub mod rule;
pub mod stylesheet;
pub mod tree;
pub mod matcher;
pub mod cascade;
pub mod invalidation;
pub mod sink;

pub use cascade::{NodeStyleState, RuleScope};
pub use invalidation::AttributeChange;
pub use model::{
    declarations, Combinator, CompiledSelectorChain, DeclarationBlock, MergedStyle,
    SimpleSelectorToken, TokenIdentity,
};
pub use rule::{Rule, RuleBucket, RuleId, RuleKind, RuleSelector};
pub use selector::{compile, SelectorCache, SelectorError};
pub use sink::{RecordingSink, StyleSink};
pub use specificity::Specificity;
pub use stylesheet::{SheetId, SheetSource, StyleSheet};
pub use tree::StyleTree;
