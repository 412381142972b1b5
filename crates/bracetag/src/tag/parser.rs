//! Tag syntax parsing.
//!
//! Parses the inside of one `{...}` candidate: `name args`, `/name` or
//! `name args/`.

use super::TagArgs;
use super::args::{Token, split_tokens};

/// Delimiter kind of a tag occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TagKind {
    /// `{name ...}`
    Open,
    /// `{/name}`
    Close,
    /// `{name .../}`
    SelfClosing,
}

/// Parsed tag from a candidate span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ParsedTag {
    pub kind: TagKind,
    pub name: String,
    pub args: TagArgs,
}

/// Parse the content between `{` and `}`.
///
/// Returns `None` when the content is not a tag: empty name, leading
/// whitespace, dangling quote, empty attribute key, or a close marker
/// combined with arguments or a self-closing marker.
pub(crate) fn parse_tag(inner: &str) -> Option<ParsedTag> {
    let (closing, body) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };

    if body.starts_with([' ', '\t']) {
        return None;
    }

    let (self_closing, body) = strip_self_closing(body);
    if closing && self_closing {
        return None;
    }

    let mut tokens = split_tokens(body)?.into_iter();
    let name = tokens.next()?;
    if !is_valid_tag_name(&name) {
        return None;
    }

    let rest: Vec<Token> = tokens.collect();
    if closing && !rest.is_empty() {
        return None;
    }

    let args = TagArgs::from_tokens(rest)?;
    let kind = if closing {
        TagKind::Close
    } else if self_closing {
        TagKind::SelfClosing
    } else {
        TagKind::Open
    };

    Some(ParsedTag {
        kind,
        name: name.text,
        args,
    })
}

/// Strip a trailing unescaped `/`, ignoring whitespace before `}`.
///
/// A bare word ending in `/` loses the slash: `{t path/}` is a self-closing
/// `t` with argument `path`.
fn strip_self_closing(body: &str) -> (bool, &str) {
    let trimmed = body.trim_end_matches([' ', '\t']);
    match trimmed.strip_suffix('/') {
        Some(stripped) if !ends_with_escape(stripped) => (true, stripped),
        _ => (false, body),
    }
}

/// Check for an odd run of trailing backslashes.
fn ends_with_escape(s: &str) -> bool {
    s.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Check if a token can be a tag name.
fn is_valid_tag_name(token: &Token) -> bool {
    !token.text.is_empty()
        && !token.quoted
        && token.eq.is_none()
        && !token.text.contains(['{', '}', '"'])
}
