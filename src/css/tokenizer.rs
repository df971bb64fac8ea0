//! logos-based selector lexer.
//!
//! Only the surface needed to *recognise* selectors is lexed. Features the
//! engine does not support (universal, sibling combinators, pseudo-classes,
//! attribute selectors) still get their own tokens so the compiler can report
//! them as unsupported rather than as garbage.
//!
//! Longest match wins, so `:hover` lexes as one [`Token::Pseudo`] and
//! `[type=text]` as one [`Token::Attribute`].

use std::ops::Range;

use logos::Logos;

/// Selector token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token {
    /// Pseudo-class or pseudo-element: `:hover`, `::before`.
    #[regex(r"::?[a-zA-Z][a-zA-Z0-9_-]*")]
    Pseudo,

    /// Attribute selector: `[type=text]`.
    #[regex(r"\[[^\]]*\]")]
    Attribute,

    /// Identifier: tag, class or id name.
    #[regex(r"-?[a-zA-Z_][a-zA-Z0-9_-]*")]
    Ident,

    /// `.`
    #[token(".")]
    Dot,

    /// `#`
    #[token("#")]
    Hash,

    /// `>`
    #[token(">")]
    GreaterThan,

    /// `+`
    #[token("+")]
    Plus,

    /// `~`
    #[token("~")]
    Tilde,

    /// `*`
    #[token("*")]
    Star,

    /// `,`
    #[token(",")]
    Comma,
}

/// A lexed token with its byte span in the source selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// Lex a selector string.
///
/// Returns `Err(offset)` with the byte offset of the first character the lexer
/// could not recognise.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, usize> {
    let mut out = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => out.push(Spanned { token, span }),
            Err(()) => return Err(span.start),
        }
    }
    Ok(out)
}
