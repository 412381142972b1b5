//! Tag candidate scanning.
//!
//! Splits raw source into literal text and tag tokens. A `{` starts a
//! candidate unless it is escaped as `\{`; the candidate ends at the first
//! unescaped `}` on the same line. Candidates that fail to parse leave their
//! `{` in the text and scanning resumes after it.

use super::TagArgs;
use super::parser::{TagKind, parse_tag};

/// One scanned piece of source.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
    /// Literal source text.
    Text(&'a str),
    /// A syntactically valid tag occurrence.
    Tag(TagToken<'a>),
}

/// A tag occurrence with its original source text.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TagToken<'a> {
    pub kind: TagKind,
    pub name: String,
    pub args: TagArgs,
    /// The full `{...}` text, re-emitted when the tag doesn't fire.
    pub raw: &'a str,
    /// Byte offset of the opening `{`.
    pub offset: usize,
}

/// Scan source text into literal pieces and tag tokens.
pub(crate) fn scan(source: &str) -> Vec<Piece<'_>> {
    let bytes = source.as_bytes();
    let mut pieces = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => match bytes.get(pos + 1) {
                Some(b'{') => {
                    // Drop the backslash, keep the brace as text.
                    push_text(&mut pieces, &source[text_start..pos]);
                    text_start = pos + 1;
                    pos += 2;
                }
                Some(b'\\') => pos += 2,
                _ => pos += 1,
            },
            b'{' => {
                let token = candidate_end(bytes, pos + 1).and_then(|end| {
                    let parsed = parse_tag(&source[pos + 1..end])?;
                    Some((parsed, end))
                });

                if let Some((parsed, end)) = token {
                    push_text(&mut pieces, &source[text_start..pos]);
                    pieces.push(Piece::Tag(TagToken {
                        kind: parsed.kind,
                        name: parsed.name,
                        args: parsed.args,
                        raw: &source[pos..=end],
                        offset: pos,
                    }));
                    pos = end + 1;
                    text_start = pos;
                } else {
                    pos += 1;
                }
            }
            _ => pos += 1,
        }
    }

    push_text(&mut pieces, &source[text_start..]);
    pieces
}

fn push_text<'a>(pieces: &mut Vec<Piece<'a>>, text: &'a str) {
    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
}

/// Find the index of the first unescaped `}` at or after `start`.
///
/// Returns `None` at a line break or end of input.
fn candidate_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if matches!(bytes.get(pos + 1), Some(b'\n' | b'\r')) => return None,
            b'\\' => pos += 2,
            b'}' => return Some(pos),
            b'\n' | b'\r' => return None,
            _ => pos += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(pieces: &[Piece<'_>]) -> String {
        pieces
            .iter()
            .map(|p| match p {
                Piece::Text(t) => (*t).to_owned(),
                Piece::Tag(tag) => format!("[{:?} {}]", tag.kind, tag.name),
            })
            .collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(scan("no tags here"), vec![Piece::Text("no tags here")]);
    }

    #[test]
    fn test_empty() {
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_single_tag() {
        let pieces = scan("a{br/}b");
        assert_eq!(texts(&pieces), "a[SelfClosing br]b");

        let Piece::Tag(tag) = &pieces[1] else {
            panic!("expected tag");
        };
        assert_eq!(tag.raw, "{br/}");
        assert_eq!(tag.offset, 1);
    }

    #[test]
    fn test_open_close_pair() {
        assert_eq!(
            texts(&scan("{red}This is **Red**{/red}.")),
            "[Open red]This is **Red**[Close red]."
        );
    }

    #[test]
    fn test_escaped_brace() {
        let pieces = scan(r"\{inline key=value args/}");
        assert_eq!(
            pieces,
            vec![Piece::Text("{inline key=value args/}")]
        );
    }

    #[test]
    fn test_escaped_brace_mid_text() {
        let pieces = scan(r"a\{b/}c");
        assert_eq!(pieces, vec![Piece::Text("a"), Piece::Text("{b/}c")]);
    }

    #[test]
    fn test_even_backslashes_do_not_escape() {
        assert_eq!(texts(&scan(r"\\{br/}")), r"\\[SelfClosing br]");
    }

    #[test]
    fn test_unterminated_candidate() {
        for input in ["{", "{/", "{a", "{a v=", "{a/", "a{\n"] {
            assert_eq!(texts(&scan(input)), input, "{input:?}");
        }
    }

    #[test]
    fn test_candidate_does_not_span_lines() {
        assert_eq!(texts(&scan("{a\nb}")), "{a\nb}");
    }

    #[test]
    fn test_escaped_line_break_ends_candidate() {
        assert_eq!(texts(&scan("{br x\\\ny/}")), "{br x\\\ny/}");
        assert_eq!(texts(&scan("{br x\\\r\ny/}")), "{br x\\\r\ny/}");
    }

    #[test]
    fn test_malformed_candidates_are_text() {
        for input in ["{}", "{ a}", "{a \"}", "{/a b}", "{=}"] {
            assert_eq!(texts(&scan(input)), input, "{input:?}");
        }
    }

    #[test]
    fn test_nested_brace_rescanned() {
        assert_eq!(texts(&scan("{{a}}")), "{[Open a]}");
    }

    #[test]
    fn test_escaped_close_brace_inside_candidate() {
        let pieces = scan(r#"{t v="a\}b"/}"#);
        let Piece::Tag(tag) = &pieces[0] else {
            panic!("expected tag");
        };
        assert_eq!(tag.args.get("v"), Some("a}b"));
    }

    #[test]
    fn test_multibyte_text_preserved() {
        assert_eq!(texts(&scan("日本{x/}語")), "日本[SelfClosing x]語");
    }

    #[test]
    fn test_trailing_backslash() {
        assert_eq!(texts(&scan("a\\")), "a\\");
        assert_eq!(texts(&scan("{a\\")), "{a\\");
    }
}
