//! Markdown event to HTML writer.
//!
//! Produces compact HTML (no newlines between blocks). Text that carries
//! placeholder characters gets the matching spliced fragment substituted
//! back verbatim; everything else is escaped.

use std::fmt::Write;

use pulldown_cmark::{Alignment, BlockQuoteKind, CodeBlockKind, Event, HeadingLevel, Tag, TagEnd};

use crate::splice::slot;

/// State for a code block being collected.
#[derive(Default)]
struct CodeBlockState {
    active: bool,
    language: Option<String>,
    buffer: String,
}

impl CodeBlockState {
    fn start(&mut self, language: Option<String>) {
        self.active = true;
        self.language = language;
        self.buffer.clear();
    }

    fn end(&mut self) -> (Option<String>, String) {
        self.active = false;
        (self.language.take(), std::mem::take(&mut self.buffer))
    }
}

/// State for the table being written.
#[derive(Default)]
struct TableState {
    in_head: bool,
    alignments: Vec<Alignment>,
    cell_index: usize,
}

impl TableState {
    fn alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align:left""#,
            Some(Alignment::Center) => r#" style="text-align:center""#,
            Some(Alignment::Right) => r#" style="text-align:right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

/// Image whose alt text is being collected.
struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

/// Writes pulldown-cmark events as HTML, expanding spliced fragments.
pub(crate) struct HtmlWriter<'f> {
    fragments: &'f [String],
    output: String,
    code: CodeBlockState,
    table: TableState,
    image: Option<PendingImage>,
    /// Alert kind per open blockquote (`None` for a plain blockquote).
    alert_stack: Vec<Option<BlockQuoteKind>>,
}

impl<'f> HtmlWriter<'f> {
    pub(crate) fn new(fragments: &'f [String]) -> Self {
        Self {
            fragments,
            output: String::new(),
            code: CodeBlockState::default(),
            table: TableState::default(),
            image: None,
            alert_stack: Vec::new(),
        }
    }

    /// Write all events and return the HTML.
    pub(crate) fn render<'a, I>(mut self, events: I) -> String
    where
        I: Iterator<Item = Event<'a>>,
    {
        for event in events {
            self.process_event(event);
        }
        self.output
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.output.push_str("<code>");
                expand_into(&mut self.output, &code, self.fragments, true);
                self.output.push_str("</code>");
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                expand_into(&mut self.output, &html, self.fragments, false);
            }
            Event::SoftBreak => {
                if self.code.active {
                    self.code.buffer.push('\n');
                } else if let Some(image) = &mut self.image {
                    image.alt.push(' ');
                } else {
                    self.output.push('\n');
                }
            }
            Event::HardBreak => self.output.push_str("<br>"),
            Event::Rule => self.output.push_str("<hr>"),
            Event::TaskListMarker(checked) => {
                let checked = if checked { " checked" } else { "" };
                let _ = write!(self.output, r#"<input type="checkbox" disabled{checked}>"#);
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                let _ = write!(self.output, "<h{}>", heading_level_to_num(level));
            }
            Tag::BlockQuote(kind) => {
                self.alert_stack.push(kind);
                match kind {
                    Some(kind) => {
                        let (class, title) = alert_class_and_title(kind);
                        let _ = write!(
                            self.output,
                            r#"<div class="alert alert-{class}"><div class="alert-title">{title}</div><div class="alert-content">"#
                        );
                    }
                    None => self.output.push_str("<blockquote>"),
                }
            }
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(ToOwned::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code.start(lang);
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>"),
                Some(n) => {
                    let _ = write!(self.output, r#"<ol start="{n}">"#);
                }
                None => self.output.push_str("<ul>"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.output.push_str("<dl>"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table = TableState {
                    alignments,
                    ..TableState::default()
                };
                self.output.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.cell_index = 0;
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.cell_index = 0;
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let cell = if self.table.in_head { "th" } else { "td" };
                let align = self.table.alignment_style();
                let _ = write!(self.output, "<{cell}{align}>");
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                dest_url, title, ..
            } => {
                let href = escape_html(&expand(&dest_url, self.fragments));
                if title.is_empty() {
                    self.push_inline(&format!(r#"<a href="{href}">"#));
                } else {
                    let title = escape_html(&expand(&title, self.fragments));
                    self.push_inline(&format!(r#"<a href="{href}" title="{title}">"#));
                }
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(PendingImage {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(level) => {
                let _ = write!(self.output, "</h{}>", heading_level_to_num(level));
            }
            TagEnd::BlockQuote(_) => match self.alert_stack.pop() {
                Some(Some(_)) => self.output.push_str("</div></div>"),
                _ => self.output.push_str("</blockquote>"),
            },
            TagEnd::CodeBlock => {
                let (lang, content) = self.code.end();
                match lang {
                    Some(lang) => {
                        let _ = write!(
                            self.output,
                            r#"<pre><code class="language-{}">"#,
                            escape_html(&lang)
                        );
                    }
                    None => self.output.push_str("<pre><code>"),
                }
                expand_into(&mut self.output, &content, self.fragments, true);
                self.output.push_str("</code></pre>");
            }
            TagEnd::List(ordered) => {
                self.output
                    .push_str(if ordered { "</ol>" } else { "</ul>" });
            }
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
            TagEnd::DefinitionList => self.output.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.table.in_head = false;
                self.output.push_str("</tr></thead><tbody>");
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output
                    .push_str(if self.table.in_head { "</th>" } else { "</td>" });
                self.table.cell_index += 1;
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => self.push_inline("</a>"),
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    let src = escape_html(&expand(&image.src, self.fragments));
                    let alt = escape_html(&expand(&image.alt, self.fragments));
                    let _ = write!(self.output, r#"<img src="{src}" alt="{alt}""#);
                    if !image.title.is_empty() {
                        let title = escape_html(&expand(&image.title, self.fragments));
                        let _ = write!(self.output, r#" title="{title}""#);
                    }
                    self.output.push('>');
                }
            }
        }
    }

    /// Push inline markup; alt text collection drops it.
    fn push_inline(&mut self, html: &str) {
        if self.image.is_none() {
            self.output.push_str(html);
        }
    }

    fn text(&mut self, text: &str) {
        if self.code.active {
            self.code.buffer.push_str(text);
        } else if let Some(image) = &mut self.image {
            image.alt.push_str(text);
        } else {
            expand_into(&mut self.output, text, self.fragments, true);
        }
    }
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alert_class_and_title(kind: BlockQuoteKind) -> (&'static str, &'static str) {
    match kind {
        BlockQuoteKind::Note => ("note", "Note"),
        BlockQuoteKind::Tip => ("tip", "Tip"),
        BlockQuoteKind::Important => ("important", "Important"),
        BlockQuoteKind::Warning => ("warning", "Warning"),
        BlockQuoteKind::Caution => ("caution", "Caution"),
    }
}

/// Append `text` to `out`, substituting fragments for placeholder characters.
///
/// With `escape`, literal characters are HTML-escaped. Fragments are always
/// inserted verbatim.
pub(crate) fn expand_into(out: &mut String, text: &str, fragments: &[String], escape: bool) {
    for c in text.chars() {
        match slot(c).and_then(|index| fragments.get(index)) {
            Some(fragment) => out.push_str(fragment),
            None if escape => push_escaped(out, c),
            None => out.push(c),
        }
    }
}

/// Substitute fragments for placeholder characters without escaping.
fn expand(text: &str, fragments: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    expand_into(&mut out, text, fragments, false);
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        _ => out.push(c),
    }
}

/// Escape HTML special characters.
pub(crate) fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        push_escaped(&mut result, c);
    }
    result
}
