//! Tag argument parsing.
//!
//! Splits the inside of a tag into `key=value` attributes and positional
//! arguments: `{name a=1 x b="two words" y/}`.

use std::collections::HashMap;

/// Attributes and positional arguments of one tag invocation.
///
/// # Example
///
/// ```
/// use bracetag::TagArgs;
///
/// let args = TagArgs::parse(r#"a=1 x name="Tanaka Satoshi" y"#).unwrap();
/// assert_eq!(args.get("a"), Some("1"));
/// assert_eq!(args.get("name"), Some("Tanaka Satoshi"));
/// assert_eq!(args.args, vec!["x", "y"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagArgs {
    /// Key-value attributes: `key=value` or `key="quoted value"`.
    pub attrs: HashMap<String, String>,
    /// Positional arguments in source order.
    pub args: Vec<String>,
}

impl TagArgs {
    /// Parse an argument string (the part of a tag after its name).
    ///
    /// Returns `None` for a dangling quote or an attribute with an empty key.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        Self::from_tokens(split_tokens(input)?)
    }

    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Option<Self> {
        let mut parsed = Self::default();

        for token in tokens {
            match token.eq {
                Some(eq) => {
                    let (key, value) = token.text.split_at(eq);
                    if key.is_empty() {
                        return None;
                    }
                    parsed.attrs.insert(key.to_owned(), value.to_owned());
                }
                None => parsed.args.push(token.text),
            }
        }

        Some(parsed)
    }

    /// Get an attribute value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Get a positional argument by index.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Attribute keys in sorted order.
    #[must_use]
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.attrs.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Check if there are neither attributes nor arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.args.is_empty()
    }
}

/// One whitespace-delimited token with quotes and escapes resolved.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Token {
    pub text: String,
    /// Split position of the first unquoted `=` (the `=` itself is dropped).
    pub eq: Option<usize>,
    /// Whether any part of the token was quoted.
    pub quoted: bool,
}

/// Characters a backslash escapes inside a tag.
fn is_escapable(c: char) -> bool {
    matches!(c, '\\' | '"' | '{' | '}' | '/')
}

/// Split on spaces and tabs, grouping `"..."` into a single token.
///
/// Returns `None` on an unterminated quote.
pub(crate) fn split_tokens(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek().copied().is_some_and(is_escapable) => {
                let token = current.get_or_insert_with(Token::default);
                token.text.extend(chars.next());
            }
            '"' => {
                current.get_or_insert_with(Token::default).quoted = true;
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => tokens.extend(current.take()),
            '=' if !in_quotes => {
                let token = current.get_or_insert_with(Token::default);
                if token.eq.is_none() {
                    token.eq = Some(token.text.len());
                } else {
                    token.text.push('=');
                }
            }
            _ => current.get_or_insert_with(Token::default).text.push(c),
        }
    }

    if in_quotes {
        return None;
    }

    tokens.extend(current);
    Some(tokens)
}
