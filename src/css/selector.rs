//! Selector compiler: selector string → [`CompiledSelectorChain`].
//!
//! Whitespace between two simple selectors is a descendant combinator, `>` is
//! a child combinator. Compound selectors (`div.x`, no whitespace) are not
//! part of the supported token set and are rejected as unsupported, as are
//! `*`, `+`, `~`, pseudo-classes and attribute selectors.

use std::collections::HashMap;

use crate::css::model::{Combinator, CompiledSelectorChain, SimpleSelectorToken};
use crate::css::tokenizer::{tokenize, Spanned, Token};

/// Reasons a selector cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("malformed selector `{selector}` at byte {position}: {message}")]
    Compile {
        selector: String,
        position: usize,
        message: String,
    },
    #[error("unsupported selector `{selector}`: {feature}")]
    Unsupported { selector: String, feature: String },
}

impl SelectorError {
    fn compile(selector: &str, position: usize, message: impl Into<String>) -> Self {
        SelectorError::Compile {
            selector: selector.to_owned(),
            position,
            message: message.into(),
        }
    }

    fn unsupported(selector: &str, feature: impl Into<String>) -> Self {
        SelectorError::Unsupported {
            selector: selector.to_owned(),
            feature: feature.into(),
        }
    }
}

/// Compile one selector (no commas) into a token chain.
pub fn compile(selector: &str) -> Result<CompiledSelectorChain, SelectorError> {
    let lexed = tokenize(selector)
        .map_err(|at| SelectorError::compile(selector, at, "unrecognised character"))?;
    if lexed.is_empty() {
        return Err(SelectorError::Empty);
    }

    let mut out: Vec<SimpleSelectorToken> = Vec::new();
    let mut pending_child = false;
    // End offset of the previous simple selector, `None` before the first one.
    let mut prev_end: Option<usize> = None;
    let mut i = 0;

    while i < lexed.len() {
        let Spanned { token, span } = &lexed[i];
        match token {
            Token::GreaterThan => {
                if prev_end.is_none() || pending_child {
                    return Err(SelectorError::compile(
                        selector,
                        span.start,
                        "`>` must sit between two selectors",
                    ));
                }
                pending_child = true;
                i += 1;
            }
            Token::Ident | Token::Dot | Token::Hash => {
                let (simple, end, consumed) = simple_selector(selector, &lexed[i..])?;
                if let Some(prev) = prev_end {
                    if pending_child {
                        out.push(SimpleSelectorToken::Combinator(Combinator::Child));
                    } else if span.start > prev {
                        out.push(SimpleSelectorToken::Combinator(Combinator::Descendant));
                    } else {
                        return Err(SelectorError::unsupported(selector, "compound selector"));
                    }
                }
                out.push(simple);
                pending_child = false;
                prev_end = Some(end);
                i += consumed;
            }
            Token::Pseudo => {
                let text = &selector[span.clone()];
                return Err(SelectorError::unsupported(selector, format!("pseudo selector `{text}`")));
            }
            Token::Attribute => {
                return Err(SelectorError::unsupported(selector, "attribute selector"));
            }
            Token::Plus | Token::Tilde => {
                return Err(SelectorError::unsupported(selector, "sibling combinator"));
            }
            Token::Star => {
                return Err(SelectorError::unsupported(selector, "universal selector"));
            }
            Token::Comma => {
                return Err(SelectorError::compile(
                    selector,
                    span.start,
                    "selector groups must be split before compiling",
                ));
            }
        }
    }

    if pending_child {
        return Err(SelectorError::compile(selector, selector.len(), "dangling `>`"));
    }

    Ok(CompiledSelectorChain::new(out))
}

/// Parse one simple selector at the head of `lexed`.
///
/// Returns the token, the byte offset where it ends and how many lexer tokens
/// it consumed.
fn simple_selector(
    selector: &str,
    lexed: &[Spanned],
) -> Result<(SimpleSelectorToken, usize, usize), SelectorError> {
    let head = &lexed[0];
    if head.token == Token::Ident {
        let name = selector[head.span.clone()].to_owned();
        return Ok((SimpleSelectorToken::Tag(name), head.span.end, 1));
    }

    let what = if head.token == Token::Dot { "class" } else { "id" };
    let name = match lexed.get(1) {
        Some(next) if next.token == Token::Ident && next.span.start == head.span.end => next,
        Some(next) => {
            return Err(SelectorError::compile(
                selector,
                next.span.start,
                format!("expected {what} name"),
            ))
        }
        None => {
            return Err(SelectorError::compile(
                selector,
                selector.len(),
                format!("expected {what} name"),
            ))
        }
    };
    let text = selector[name.span.clone()].to_owned();
    let token = if head.token == Token::Dot {
        SimpleSelectorToken::ClassAttr(text)
    } else {
        SimpleSelectorToken::IdAttr(text)
    };
    Ok((token, name.span.end, 2))
}

/// Split a selector group (`a, .b`) into its trimmed members.
pub fn split_group(selector: &str) -> impl Iterator<Item = &str> {
    selector.split(',').map(str::trim)
}

/// Interning table for compiled chains, keyed by the exact selector string.
///
/// Entries are never evicted: the number of distinct selector strings in an
/// application is small and bounded.
#[derive(Debug, Default)]
pub struct SelectorCache {
    chains: HashMap<String, CompiledSelectorChain>,
    hits: u64,
}

impl SelectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `selector`, or return the chain compiled for it earlier.
    ///
    /// Failures are not cached.
    pub fn get_or_compile(&mut self, selector: &str) -> Result<CompiledSelectorChain, SelectorError> {
        if let Some(chain) = self.chains.get(selector) {
            self.hits += 1;
            return Ok(chain.clone());
        }
        let chain = compile(selector)?;
        self.chains.insert(selector.to_owned(), chain.clone());
        Ok(chain)
    }

    /// Number of lookups served from the table.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SimpleSelectorToken as T;

    fn compiled(selector: &str) -> Vec<SimpleSelectorToken> {
        compile(selector)
            .unwrap_or_else(|e| panic!("compile failed: {e}"))
            .tokens()
            .to_vec()
    }

    #[test]
    fn tag_class_id() {
        assert_eq!(compiled("div"), vec![T::Tag("div".into())]);
        assert_eq!(compiled(".x"), vec![T::ClassAttr("x".into())]);
        assert_eq!(compiled("#i"), vec![T::IdAttr("i".into())]);
    }

    #[test]
    fn whitespace_is_descendant() {
        assert_eq!(
            compiled(".a .b"),
            vec![
                T::ClassAttr("a".into()),
                T::Combinator(Combinator::Descendant),
                T::ClassAttr("b".into()),
            ]
        );
    }

    #[test]
    fn explicit_child_with_and_without_spaces() {
        let expected = vec![
            T::Tag("ul".into()),
            T::Combinator(Combinator::Child),
            T::ClassAttr("item".into()),
        ];
        assert_eq!(compiled("ul > .item"), expected);
        assert_eq!(compiled("ul>.item"), expected);
    }

    #[test]
    fn mixed_chain() {
        let tokens = compiled("#app .list > li");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[1], T::Combinator(Combinator::Descendant));
        assert_eq!(tokens[3], T::Combinator(Combinator::Child));
        assert_eq!(tokens[4], T::Tag("li".into()));
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        assert_eq!(compiled("  .x  "), vec![T::ClassAttr("x".into())]);
    }

    #[test]
    fn compound_is_unsupported() {
        assert!(matches!(
            compile("div.x"),
            Err(SelectorError::Unsupported { feature, .. }) if feature == "compound selector"
        ));
    }

    #[test]
    fn unsupported_features() {
        for selector in ["a:hover", "*", "a + b", "a ~ b", "input[type=text]"] {
            assert!(
                matches!(compile(selector), Err(SelectorError::Unsupported { .. })),
                "{selector} should be unsupported"
            );
        }
    }

    #[test]
    fn malformed_inputs() {
        for selector in ["> a", "a >", "a > > b", ". x", "#", "a $ b", "a, b"] {
            assert!(
                matches!(compile(selector), Err(SelectorError::Compile { .. })),
                "{selector} should be malformed"
            );
        }
    }

    #[test]
    fn empty_selector() {
        assert_eq!(compile(""), Err(SelectorError::Empty));
        assert_eq!(compile("   "), Err(SelectorError::Empty));
    }

    #[test]
    fn error_messages_name_the_selector() {
        let err = compile("a:hover").unwrap_err();
        assert_eq!(err.to_string(), "unsupported selector `a:hover`: pseudo selector `:hover`");
    }

    #[test]
    fn split_group_trims() {
        let members: Vec<_> = split_group("a, .b ,#c").collect();
        assert_eq!(members, vec!["a", ".b", "#c"]);
    }

    #[test]
    fn cache_memoizes_by_string() {
        let mut cache = SelectorCache::new();
        let first = cache.get_or_compile(".a .b").unwrap();
        let second = cache.get_or_compile(".a .b").unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_does_not_store_failures() {
        let mut cache = SelectorCache::new();
        assert!(cache.get_or_compile("a:hover").is_err());
        assert!(cache.get_or_compile("a:hover").is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.hits(), 0);
    }
}
