//! Markdown splicing of resolved tags.
//!
//! Literal text is collected into a Markdown "flow" that is rendered in one
//! pass, so inline tag output takes part in ordinary inline parsing. Each
//! inline fragment is represented in the flow by one private-use placeholder
//! character and substituted back by the HTML writer. Block tags end the
//! current flow, emit their output standalone, and start a fresh one.
//!
//! Each flow is parsed as its own Markdown document. A fenced code block,
//! list, or blockquote interrupted by a block tag is split at the tag, and
//! link reference definitions only resolve within their own flow.

use pulldown_cmark::{Options, Parser};

use crate::html::HtmlWriter;
use crate::tag::resolver::{Resolved, ResolvedTag};
use crate::tag::tree::TagForm;

/// First code point of each private-use plane used for placeholders.
const PLANE_15: u32 = 0xF_0000;
const PLANE_16: u32 = 0x10_0000;
/// Usable code points per plane (the last two of each are noncharacters).
const PLANE_SLOTS: usize = 0xFFFE;

/// Placeholder character for a fragment index.
///
/// Returns `None` once both planes are used up.
pub(crate) fn placeholder(index: usize) -> Option<char> {
    let (base, offset) = if index < PLANE_SLOTS {
        (PLANE_15, index)
    } else if index < 2 * PLANE_SLOTS {
        (PLANE_16, index - PLANE_SLOTS)
    } else {
        return None;
    };
    char::from_u32(base + u32::try_from(offset).ok()?)
}

/// Fragment index of a placeholder character.
pub(crate) fn slot(c: char) -> Option<usize> {
    let code = u32::from(c);
    let (base, skip) = match code {
        0xF_0000..=0xF_FFFD => (PLANE_15, 0),
        0x10_0000..=0x10_FFFD => (PLANE_16, PLANE_SLOTS),
        _ => return None,
    };
    usize::try_from(code - base).ok().map(|offset| offset + skip)
}

/// Markdown text under construction plus the fragments it references.
#[derive(Default)]
struct Flow {
    markdown: String,
    fragments: Vec<String>,
    overflowed: bool,
}

impl Flow {
    /// Append literal source text.
    ///
    /// Characters that would read as placeholders are routed through a
    /// fragment of their own so they come out unchanged.
    fn push_text(&mut self, text: &str) {
        if !text.chars().any(|c| slot(c).is_some()) {
            self.markdown.push_str(text);
            return;
        }

        for c in text.chars() {
            if slot(c).is_none() {
                self.markdown.push(c);
                continue;
            }
            let mut buf = [0; 4];
            if !self.push_fragment(c.encode_utf8(&mut buf)) {
                self.markdown.push(char::REPLACEMENT_CHARACTER);
            }
        }
    }

    /// Append tag output that must reach the HTML unchanged.
    fn push_raw(&mut self, html: &str) {
        if html.is_empty() || self.push_fragment(html) {
            return;
        }
        self.markdown.push_str(html);
    }

    fn push_fragment(&mut self, html: &str) -> bool {
        let Some(c) = placeholder(self.fragments.len()) else {
            if !self.overflowed {
                tracing::warn!(
                    fragments = self.fragments.len(),
                    "Out of placeholder characters, splicing remaining tag output as Markdown"
                );
                self.overflowed = true;
            }
            return false;
        };
        self.markdown.push(c);
        self.fragments.push(html.to_owned());
        true
    }

    fn is_blank(&self) -> bool {
        self.fragments.is_empty() && self.markdown.trim().is_empty()
    }
}

/// Renders resolved nodes to HTML through pulldown-cmark.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Splicer {
    options: Options,
}

impl Splicer {
    pub(crate) fn new(options: Options) -> Self {
        Self { options }
    }

    /// Render a resolved sibling list as a standalone document.
    pub(crate) fn render(&self, items: &[Resolved<'_>]) -> String {
        let mut out = String::new();
        self.render_into(items, &mut out);
        out
    }

    fn render_into(&self, items: &[Resolved<'_>], out: &mut String) {
        let mut flow = Flow::default();

        for item in items {
            match item {
                Resolved::Text(text) => flow.push_text(text),
                Resolved::Tag(tag) if tag.is_block => {
                    self.flush(&mut flow, out);
                    self.render_block(tag, out);
                }
                Resolved::Tag(tag) => self.push_inline(&mut flow, tag, out),
            }
        }

        self.flush(&mut flow, out);
    }

    /// Emit a block tag outside any paragraph. A paired block's body is
    /// rendered as its own Markdown document.
    fn render_block(&self, tag: &ResolvedTag<'_>, out: &mut String) {
        match tag.form {
            TagForm::SelfClosing => out.push_str(&tag.output.content),
            TagForm::Paired => {
                out.push_str(&tag.output.before);
                self.render_into(&tag.children, out);
                out.push_str(&tag.output.after);
            }
        }
    }

    /// Splice an inline tag into the current flow.
    ///
    /// A block tag nested in the body still stands alone: the flow so far is
    /// flushed, the block is emitted, and the rest of the body continues in
    /// a fresh flow.
    fn push_inline(&self, flow: &mut Flow, tag: &ResolvedTag<'_>, out: &mut String) {
        match tag.form {
            TagForm::SelfClosing => flow.push_raw(&tag.output.content),
            TagForm::Paired => {
                flow.push_raw(&tag.output.before);
                for child in &tag.children {
                    match child {
                        Resolved::Text(text) => flow.push_text(text),
                        Resolved::Tag(inner) if inner.is_block => {
                            self.flush(flow, out);
                            self.render_block(inner, out);
                        }
                        Resolved::Tag(inner) => self.push_inline(flow, inner, out),
                    }
                }
                flow.push_raw(&tag.output.after);
            }
        }
    }

    /// Render the pending flow, skipping it when it would only produce
    /// empty markup.
    fn flush(&self, flow: &mut Flow, out: &mut String) {
        let flow = std::mem::take(flow);
        if flow.is_blank() {
            return;
        }

        let parser = Parser::new_ext(&flow.markdown, self.options);
        out.push_str(&HtmlWriter::new(&flow.fragments).render(parser));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagOutput;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Resolved<'_> {
        Resolved::Text(s)
    }

    fn leaf(content: &str, is_block: bool) -> Resolved<'static> {
        Resolved::Tag(ResolvedTag {
            output: TagOutput::content(content),
            is_block,
            form: TagForm::SelfClosing,
            children: Vec::new(),
        })
    }

    fn pair<'a>(before: &str, after: &str, is_block: bool, children: Vec<Resolved<'a>>) -> Resolved<'a> {
        Resolved::Tag(ResolvedTag {
            output: TagOutput::wrap(before, after),
            is_block,
            form: TagForm::Paired,
            children,
        })
    }

    fn splice(items: &[Resolved<'_>]) -> String {
        Splicer::new(Options::empty()).render(items)
    }

    #[test]
    fn test_placeholder_roundtrip_boundaries() {
        for index in [0, 1, PLANE_SLOTS - 1, PLANE_SLOTS, 2 * PLANE_SLOTS - 1] {
            let c = placeholder(index).unwrap();
            assert_eq!(slot(c), Some(index));
        }
        assert_eq!(placeholder(2 * PLANE_SLOTS), None);
        assert_eq!(slot('a'), None);
        assert_eq!(slot('\u{FFFFE}'), None);
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(splice(&[text("Hello")]), "<p>Hello</p>");
    }

    #[test]
    fn test_inline_leaf_joins_paragraph() {
        assert_eq!(
            splice(&[text("a "), leaf("<br>", false), text(" b")]),
            "<p>a <br> b</p>"
        );
    }

    #[test]
    fn test_inline_wrap_inside_strong() {
        let items = [
            text("**123"),
            pair("<span>", "</span>", false, vec![text("456")]),
            text("789**"),
        ];
        assert_eq!(
            splice(&items),
            "<p><strong>123<span>456</span>789</strong></p>"
        );
    }

    #[test]
    fn test_block_breaks_paragraph() {
        let items = [
            text("before "),
            leaf("<hr class=\"x\">", true),
            text(" after"),
        ];
        assert_eq!(
            splice(&items),
            "<p>before</p><hr class=\"x\"><p>after</p>"
        );
    }

    #[test]
    fn test_block_alone_has_no_empty_paragraph() {
        let items = [
            pair("<div>", "</div>", true, Vec::new()),
            text("\n\n"),
            pair("<span>", "</span>", false, Vec::new()),
            text("\n\n"),
            leaf("<br>", false),
            text("\n"),
        ];
        assert_eq!(splice(&items), "<div></div><p><span></span></p><p><br></p>");
    }

    #[test]
    fn test_block_body_rendered_as_markdown() {
        let items = [pair("<div>", "</div>", true, vec![text("*x*\n\ny")])];
        assert_eq!(splice(&items), "<div><p><em>x</em></p><p>y</p></div>");
    }

    #[test]
    fn test_block_inside_inline_breaks_out() {
        let items = [
            text("a "),
            pair("<span>", "</span>", false, vec![leaf("<div></div>", true)]),
            text(" b"),
        ];
        assert_eq!(splice(&items), "<p>a <span></p><div></div><p></span> b</p>");
    }

    #[test]
    fn test_flows_are_separate_documents() {
        let items = [text("see [x]\n"), leaf("<hr>", true), text("\n[x]: /u\n")];
        assert_eq!(splice(&items), "<p>see [x]</p><hr>");
    }

    #[test]
    fn test_empty_output_adds_nothing() {
        assert_eq!(splice(&[leaf("", false)]), "");
        assert_eq!(splice(&[]), "");
    }

    #[test]
    fn test_literal_placeholder_chars_survive() {
        let literal = "x\u{F0000}y";
        assert_eq!(
            splice(&[text(literal), leaf("<br>", false)]),
            "<p>x\u{F0000}y<br></p>"
        );
    }

    #[test]
    fn test_fragment_html_not_escaped_literal_is() {
        assert_eq!(
            splice(&[text("1 < 2 "), leaf("<i>&amp;</i>", false)]),
            "<p>1 &lt; 2 <i>&amp;</i></p>"
        );
    }
}
