//! `sheet!` macro: parse selector blocks at compile time and generate
//! `SheetSource` construction code.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::{braced, parenthesized, token, Error, Ident, LitFloat, LitInt, LitStr, Result, Token};

// ---------------------------------------------------------------------------
// AST types
// ---------------------------------------------------------------------------

/// A single declaration: `property-name: value tokens;`
#[derive(Debug, Clone)]
pub(crate) struct Declaration {
    /// The property name in kebab-case (e.g. "text-align").
    pub name: String,
    pub name_span: Span,
    /// The value tokens rendered back to text, joined by single spaces.
    pub value: String,
}

/// `"selector" { declarations }`
#[derive(Debug)]
pub(crate) struct SheetRule {
    pub selector: String,
    pub selector_span: Span,
    pub declarations: Vec<Declaration>,
}

/// The top-level input to the sheet! macro.
#[derive(Debug)]
struct SheetInput {
    rules: Vec<SheetRule>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl Parse for SheetInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut rules = Vec::new();
        while !input.is_empty() {
            rules.push(input.parse()?);
        }
        Ok(SheetInput { rules })
    }
}

impl Parse for SheetRule {
    fn parse(input: ParseStream) -> Result<Self> {
        let lit: LitStr = input.parse()?;
        let selector = lit.value();
        if selector.trim().is_empty() {
            return Err(Error::new(lit.span(), "empty selector"));
        }
        let content;
        braced!(content in input);
        let mut declarations = Vec::new();
        while !content.is_empty() {
            declarations.push(parse_declaration(&content)?);
        }
        Ok(SheetRule {
            selector,
            selector_span: lit.span(),
            declarations,
        })
    }
}

/// Parse a single declaration: `property-name: values;`
///
/// The trailing `;` may be omitted on the last declaration of a block.
pub(crate) fn parse_declaration(input: ParseStream) -> Result<Declaration> {
    let (name, name_span) = parse_kebab_ident(input)?;
    input.parse::<Token![:]>()?;

    let mut parts = Vec::new();
    while !input.is_empty() && !input.peek(Token![;]) {
        parts.push(parse_value(input)?);
    }
    if !input.is_empty() {
        input.parse::<Token![;]>()?;
    }

    if parts.is_empty() {
        return Err(Error::new(name_span, format!("property `{}` has no value", name)));
    }

    Ok(Declaration {
        name,
        name_span,
        value: parts.join(" "),
    })
}

/// `ident(-ident)*`, joined with hyphens.
fn parse_kebab_ident(input: ParseStream) -> Result<(String, Span)> {
    let first: Ident = input.call(Ident::parse_any)?;
    let mut name = first.to_string();
    while input.peek(Token![-]) && input.peek2(Ident) {
        input.parse::<Token![-]>()?;
        let next: Ident = input.call(Ident::parse_any)?;
        name.push('-');
        name.push_str(&next.to_string());
    }
    Ok((name, first.span()))
}

/// Parse one value token and render it back to CSS text.
pub(crate) fn parse_value(input: ParseStream) -> Result<String> {
    // Hex colour: `#` followed by an identifier or a number-ish literal.
    if input.peek(Token![#]) {
        input.parse::<Token![#]>()?;
        let hex = if input.peek(Ident) {
            input.parse::<Ident>()?.to_string()
        } else if input.peek(LitInt) {
            // `1a1a2e` lexes as the integer `1` with suffix `a1a2e`.
            input.parse::<LitInt>()?.to_string()
        } else {
            return Err(input.error("expected hex color value after `#`"));
        };
        return Ok(format!("#{}", hex));
    }

    if input.peek(LitStr) {
        return Ok(input.parse::<LitStr>()?.value());
    }

    if input.peek(LitFloat) || input.peek(LitInt) {
        return parse_number(input, String::new());
    }

    if input.peek(Token![-]) {
        let minus = input.parse::<Token![-]>()?;
        if input.peek(LitFloat) || input.peek(LitInt) {
            return parse_number(input, "-".to_string());
        }
        return Err(Error::new(minus.span, "expected a number after `-`"));
    }

    if input.peek(Ident) {
        let (word, _) = parse_kebab_ident(input)?;
        if input.peek(token::Paren) {
            return parse_function(input, word);
        }
        return Ok(word);
    }

    Err(input.error("unexpected token in style value"))
}

/// A numeric literal, its unit suffix and an optional `%`.
fn parse_number(input: ParseStream, mut out: String) -> Result<String> {
    if input.peek(LitFloat) {
        out.push_str(&input.parse::<LitFloat>()?.to_string());
    } else {
        out.push_str(&input.parse::<LitInt>()?.to_string());
    }
    if input.peek(Token![%]) {
        input.parse::<Token![%]>()?;
        out.push('%');
    }
    Ok(out)
}

/// `name(arg, arg ...)` with comma-separated value lists.
fn parse_function(input: ParseStream, name: String) -> Result<String> {
    let content;
    parenthesized!(content in input);
    let mut args = Vec::new();
    let mut current = Vec::new();
    while !content.is_empty() {
        if content.peek(Token![,]) {
            content.parse::<Token![,]>()?;
            args.push(current.join(" "));
            current.clear();
            continue;
        }
        current.push(parse_value(&content)?);
    }
    if !current.is_empty() {
        args.push(current.join(" "));
    }
    Ok(format!("{}({})", name, args.join(", ")))
}

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

fn generate_rule(rule: &SheetRule) -> TokenStream {
    let selector = LitStr::new(&rule.selector, rule.selector_span);
    let pairs = rule.declarations.iter().map(|decl| {
        let name = LitStr::new(&decl.name, decl.name_span);
        let value = &decl.value;
        quote! { (#name, #value) }
    });
    quote! {
        __sheet.push(#selector, ::weft::css::declarations::<&str, &str>([#(#pairs),*]));
    }
}

/// Main entry point for the sheet! macro.
pub fn sheet_impl(input: TokenStream) -> Result<TokenStream> {
    let parsed: SheetInput = syn::parse2(input)?;
    let rules = parsed.rules.iter().map(generate_rule);
    Ok(quote! {
        {
            let mut __sheet = ::weft::css::SheetSource::new();
            #(#rules)*
            __sheet
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_sheet(tokens: TokenStream) -> Result<SheetInput> {
        syn::parse2(tokens)
    }

    fn values(input: &SheetInput) -> Vec<(String, String)> {
        input
            .rules
            .iter()
            .flat_map(|rule| &rule.declarations)
            .map(|decl| (decl.name.clone(), decl.value.clone()))
            .collect()
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    // ── Parsing ──────────────────────────────────────────────────────

    #[test]
    fn parse_rules_and_selectors() {
        let input = parse_sheet(quote! {
            "div" { color: red; }
            ".a .b" { text-align: center; }
        })
        .unwrap();
        assert_eq!(input.rules.len(), 2);
        assert_eq!(input.rules[0].selector, "div");
        assert_eq!(input.rules[1].selector, ".a .b");
        assert_eq!(
            values(&input),
            pairs(&[("color", "red"), ("text-align", "center")])
        );
    }

    #[test]
    fn parse_numbers_and_units() {
        let input = parse_sheet(quote! {
            "p" { width: 50%; margin: 1 -2; line-height: 1.5rem; padding: 4px 8px; }
        })
        .unwrap();
        assert_eq!(
            values(&input),
            pairs(&[
                ("width", "50%"),
                ("margin", "1 -2"),
                ("line-height", "1.5rem"),
                ("padding", "4px 8px"),
            ])
        );
    }

    #[test]
    fn parse_hash_colors() {
        // Parse from a string so `#` is not taken as interpolation.
        let tokens: TokenStream =
            syn::parse_str(r#""div" { color: #ff0000; background: #1a1a2e; }"#).unwrap();
        let input = parse_sheet(tokens).unwrap();
        assert_eq!(
            values(&input),
            pairs(&[("color", "#ff0000"), ("background", "#1a1a2e")])
        );
    }

    #[test]
    fn parse_strings_functions_and_keywords() {
        let input = parse_sheet(quote! {
            "#app" {
                font-family: "Fira Sans";
                color: rgb(10, 20, 30);
                justify-content: space-between;
                display: none
            }
        })
        .unwrap();
        assert_eq!(
            values(&input),
            pairs(&[
                ("font-family", "Fira Sans"),
                ("color", "rgb(10, 20, 30)"),
                ("justify-content", "space-between"),
                ("display", "none"),
            ])
        );
    }

    #[test]
    fn empty_blocks_and_sheets() {
        assert!(parse_sheet(quote! {}).unwrap().rules.is_empty());
        let input = parse_sheet(quote! { "div" {} }).unwrap();
        assert!(input.rules[0].declarations.is_empty());
    }

    // ── Errors ───────────────────────────────────────────────────────

    #[test]
    fn error_on_missing_value() {
        let err = parse_sheet(quote! { "div" { color: ; } }).unwrap_err();
        assert!(err.to_string().contains("has no value"));
    }

    #[test]
    fn error_on_empty_selector() {
        let err = parse_sheet(quote! { "  " { color: red; } }).unwrap_err();
        assert!(err.to_string().contains("empty selector"));
    }

    #[test]
    fn error_on_unquoted_selector() {
        assert!(parse_sheet(quote! { div { color: red; } }).is_err());
    }

    #[test]
    fn error_on_missing_colon() {
        assert!(parse_sheet(quote! { "div" { color red; } }).is_err());
    }

    // ── Codegen ──────────────────────────────────────────────────────

    #[test]
    fn generates_sheet_source_pushes() {
        let out = sheet_impl(quote! { ".x" { c: y; } }).unwrap().to_string();
        assert!(out.contains("SheetSource :: new ()"));
        assert!(out.contains("__sheet . push (\".x\""));
        assert!(out.contains("(\"c\" , \"y\")"));
    }
}
