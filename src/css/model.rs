//! Selector tokens, compiled chains, bucket identities, declaration maps.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A property → value map, as declared by one rule or one inline style.
///
/// Ordered so that merged output is deterministic.
pub type DeclarationBlock = BTreeMap<String, String>;

/// A combinator between two simple selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Descendant combinator (whitespace): `A B`.
    Descendant,
    /// Child combinator: `A > B`.
    Child,
}

/// One step of a compiled selector chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimpleSelectorToken {
    /// Tag-name selector: `div`.
    Tag(String),
    /// Class selector: `.name`.
    ClassAttr(String),
    /// Id selector: `#name`.
    IdAttr(String),
    /// Combinator joining the previous and next simple selector.
    Combinator(Combinator),
}

impl SimpleSelectorToken {
    /// The bucket identity of this token, or `None` for combinators.
    pub fn identity(&self) -> Option<TokenIdentity> {
        match self {
            SimpleSelectorToken::Tag(name) => Some(TokenIdentity::tag(name)),
            SimpleSelectorToken::ClassAttr(name) => Some(TokenIdentity::class(name)),
            SimpleSelectorToken::IdAttr(name) => Some(TokenIdentity::id(name)),
            SimpleSelectorToken::Combinator(_) => None,
        }
    }

    pub fn is_combinator(&self) -> bool {
        matches!(self, SimpleSelectorToken::Combinator(_))
    }
}

/// Lookup key for rule buckets: a tag name as-is, `.class`, or `#id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenIdentity(String);

impl TokenIdentity {
    pub fn tag(name: &str) -> Self {
        Self(name.to_owned())
    }

    pub fn class(name: &str) -> Self {
        Self(format!(".{name}"))
    }

    pub fn id(name: &str) -> Self {
        Self(format!("#{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ordered token sequence for one selector.
///
/// The first token is the outermost ancestor step; the last token is the node
/// itself. Always starts and ends with a non-combinator token, and combinators
/// strictly alternate with simple selectors. Cheap to clone (shared).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompiledSelectorChain(Rc<[SimpleSelectorToken]>);

impl CompiledSelectorChain {
    pub(crate) fn new(tokens: Vec<SimpleSelectorToken>) -> Self {
        Self(tokens.into())
    }

    pub fn tokens(&self) -> &[SimpleSelectorToken] {
        &self.0
    }

    /// The token describing the node itself.
    pub fn last(&self) -> Option<&SimpleSelectorToken> {
        self.0.last()
    }

    /// Whether the chain contains at least one combinator.
    pub fn is_compound(&self) -> bool {
        self.0.iter().any(SimpleSelectorToken::is_combinator)
    }

    /// Number of combinator hops in the chain.
    pub fn hops(&self) -> u32 {
        self.0.iter().filter(|t| t.is_combinator()).count() as u32
    }

    /// Identities of every simple token except the final one, deduplicated,
    /// in chain order.
    pub fn non_final_identities(&self) -> Vec<TokenIdentity> {
        let mut out: Vec<TokenIdentity> = Vec::new();
        let Some((_, rest)) = self.0.split_last() else {
            return out;
        };
        for identity in rest.iter().filter_map(SimpleSelectorToken::identity) {
            if !out.contains(&identity) {
                out.push(identity);
            }
        }
        out
    }
}

/// The flattened result of a cascade for one node.
///
/// Properties that dropped out of the cascade since the previous merge are
/// present with an empty-string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedStyle(BTreeMap<String, String>);

impl MergedStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.0.contains_key(property)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Properties carried as explicit resets (`""`).
    pub fn resets(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| k.as_str())
    }

    /// This style with its reset entries dropped.
    pub fn without_resets(&self) -> MergedStyle {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }

    pub(crate) fn insert(&mut self, property: String, value: String) {
        self.0.insert(property, value);
    }

    pub(crate) fn extend_from(&mut self, block: &DeclarationBlock) {
        for (property, value) in block {
            self.0.insert(property.clone(), value.clone());
        }
    }
}

impl FromIterator<(String, String)> for MergedStyle {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Renders as `prop: value;` pairs in property order, separated by spaces.
impl fmt::Display for MergedStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (property, value) in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{property}: {value};")?;
        }
        Ok(())
    }
}

/// Build a [`DeclarationBlock`] from string pairs.
pub fn declarations<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> DeclarationBlock
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
