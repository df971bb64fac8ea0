//! Proc macros for weft: `sheet!` style-sheet literals.
//!
//! This crate is not meant to be used directly. Enable the `macros` feature on `weft`.

use proc_macro::TokenStream;

mod sheet_macro;

/// Compile-time style-sheet literal.
///
/// Parses selector blocks and produces a `weft::css::SheetSource` with one
/// entry per block, in source order.
///
/// # Syntax
///
/// ```ignore
/// let source = sheet! {
///     "div" { color: red; }
///     ".card, .panel" { padding: 4px 8px; background: #1a1a2e; }
///     "#app > .title" { font-family: "Fira Sans"; text-align: center; }
/// };
/// ```
///
/// Selectors are string literals and are compiled when the sheet is
/// registered. Property names use kebab-case. A value is one or more tokens
/// (identifiers, numbers with units, `%`, `#hex` colours, string literals,
/// `name(args)` calls) rendered back to text and joined by spaces.
#[proc_macro]
pub fn sheet(input: TokenStream) -> TokenStream {
    sheet_macro::sheet_impl(input.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
