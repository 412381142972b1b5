//! Tag tree building.
//!
//! Matches open/close pairs over scanned pieces using the registry active at
//! each depth. Unknown names, stray closes, and opens that never close all
//! degrade to literal text.

use std::collections::BTreeMap;

use super::parser::TagKind;
use super::scanner::{Piece, TagToken};
use super::{CustomizedTag, TagArgs, TagRegistry};

/// Node of the tag tree.
#[derive(Debug)]
pub(crate) enum Node<'a> {
    /// Literal source text.
    Text(&'a str),
    /// A recognized tag.
    Tag(TagNode<'a>),
}

impl Node<'_> {
    /// Whether this node's handler may run concurrently.
    pub(crate) fn is_async(&self) -> bool {
        matches!(self, Node::Tag(tag) if tag.tag.is_async())
    }
}

/// How a tag was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TagForm {
    /// `{name}...{/name}`: output wraps the rendered body.
    Paired,
    /// `{name/}`: output stands alone.
    SelfClosing,
}

/// A recognized tag with its registry entry and body.
#[derive(Debug)]
pub(crate) struct TagNode<'a> {
    pub name: String,
    pub args: TagArgs,
    pub tag: &'a CustomizedTag,
    pub form: TagForm,
    /// Body nodes (always empty for self-closing tags).
    pub children: Vec<Node<'a>>,
}

/// Result of building a tag tree.
#[derive(Debug)]
pub(crate) struct Tree<'a> {
    pub nodes: Vec<Node<'a>>,
    /// Degraded constructs, in source order.
    pub warnings: Vec<String>,
}

/// An open tag waiting for its close.
struct Frame<'a> {
    name: String,
    args: TagArgs,
    tag: &'a CustomizedTag,
    /// Index of the open token in the piece list.
    index: usize,
    children: Vec<Node<'a>>,
}

/// Why a tag token came out as literal text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Degraded {
    Unclosed,
    StrayClose,
    TooDeep,
}

/// Builds a [`Tree`] from scanned pieces.
pub(crate) struct TreeBuilder<'a> {
    root: &'a TagRegistry,
    max_depth: usize,
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(source: &'a str, root: &'a TagRegistry, max_depth: usize) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(at, _)| at + 1))
            .collect();
        Self {
            root,
            max_depth: max_depth.max(1),
            line_starts,
        }
    }

    /// Build the tree.
    ///
    /// Opens still unclosed at end of input become literal text, all of them
    /// at once, and the input is parsed again from the outermost one so tags
    /// scoped to their child registries stay inert there. Opens rejected for
    /// depth stay literal across re-parses. Each re-parse marks at least one
    /// more open as literal, and usually one suffices.
    pub(crate) fn build(&self, pieces: &[Piece<'a>]) -> Tree<'a> {
        let mut root_nodes: Vec<Node<'a>> = Vec::new();
        let mut stack: Vec<Frame<'a>> = Vec::new();
        let mut inert: Vec<Option<Degraded>> = vec![None; pieces.len()];
        // Keyed by piece index so a re-parse replaces stale entries.
        let mut warnings: BTreeMap<usize, String> = BTreeMap::new();
        let mut index = 0;

        loop {
            let Some(piece) = pieces.get(index) else {
                let Some(outermost) = stack.first().map(|frame| frame.index) else {
                    break;
                };
                tracing::trace!(unclosed = stack.len(), "Re-parsing after unclosed tags");
                for frame in stack.drain(..) {
                    inert[frame.index] = Some(Degraded::Unclosed);
                }
                drop(warnings.split_off(&outermost));
                index = outermost;
                continue;
            };

            match piece {
                Piece::Text(text) => container(&mut stack, &mut root_nodes).push(Node::Text(*text)),
                Piece::Tag(token) => {
                    let degraded = match inert[index] {
                        Some(degraded) => {
                            container(&mut stack, &mut root_nodes).push(Node::Text(token.raw));
                            Some(degraded)
                        }
                        None => self.apply(token, index, &mut stack, &mut root_nodes),
                    };
                    if let Some(degraded) = degraded {
                        if degraded == Degraded::TooDeep {
                            inert[index] = Some(degraded);
                        }
                        warnings.insert(index, self.warning(token, degraded));
                    }
                }
            }

            index += 1;
        }

        Tree {
            nodes: root_nodes,
            warnings: warnings.into_values().collect(),
        }
    }

    /// Apply one tag token to the builder state.
    ///
    /// Returns why the token degraded to text, unless it is simply unknown.
    fn apply(
        &self,
        token: &TagToken<'a>,
        index: usize,
        stack: &mut Vec<Frame<'a>>,
        root_nodes: &mut Vec<Node<'a>>,
    ) -> Option<Degraded> {
        match token.kind {
            TagKind::Open => {
                let Some(tag) = self.lookup(stack, &token.name) else {
                    tracing::trace!(name = %token.name, "Unknown tag rendered as text");
                    container(stack, root_nodes).push(Node::Text(token.raw));
                    return None;
                };

                if stack.len() >= self.max_depth {
                    container(stack, root_nodes).push(Node::Text(token.raw));
                    return Some(Degraded::TooDeep);
                }

                stack.push(Frame {
                    name: token.name.clone(),
                    args: token.args.clone(),
                    tag,
                    index,
                    children: Vec::new(),
                });
                None
            }
            TagKind::Close => {
                if stack.last().is_some_and(|frame| frame.name == token.name)
                    && let Some(frame) = stack.pop()
                {
                    container(stack, root_nodes).push(Node::Tag(TagNode {
                        name: frame.name,
                        args: frame.args,
                        tag: frame.tag,
                        form: TagForm::Paired,
                        children: frame.children,
                    }));
                    return None;
                }

                container(stack, root_nodes).push(Node::Text(token.raw));
                if self.lookup(stack, &token.name).is_none() {
                    tracing::trace!(name = %token.name, "Unknown closing tag rendered as text");
                    return None;
                }
                Some(Degraded::StrayClose)
            }
            TagKind::SelfClosing => {
                let node = match self.lookup(stack, &token.name) {
                    Some(tag) => Node::Tag(TagNode {
                        name: token.name.clone(),
                        args: token.args.clone(),
                        tag,
                        form: TagForm::SelfClosing,
                        children: Vec::new(),
                    }),
                    None => {
                        tracing::trace!(name = %token.name, "Unknown tag rendered as text");
                        Node::Text(token.raw)
                    }
                };
                container(stack, root_nodes).push(node);
                None
            }
        }
    }

    /// Warning text for a degraded token.
    fn warning(&self, token: &TagToken<'a>, degraded: Degraded) -> String {
        let line = self.line_at(token.offset);
        let name = &token.name;
        match degraded {
            Degraded::Unclosed => {
                tracing::debug!(line, %name, "Unclosed tag rendered as text");
                format!("line {line}: unclosed tag {{{name}}} (missing {{/{name}}})")
            }
            Degraded::StrayClose => {
                tracing::debug!(line, %name, "Stray closing tag rendered as text");
                format!("line {line}: stray closing tag {{/{name}}} with no matching opening tag")
            }
            Degraded::TooDeep => {
                tracing::debug!(line, %name, "Tag nesting too deep");
                format!(
                    "line {line}: tag {{{name}}} exceeds maximum nesting depth ({})",
                    self.max_depth
                )
            }
        }
    }

    /// Look up a name in the child registries of open tags, innermost first,
    /// then in the root registry.
    fn lookup(&self, stack: &[Frame<'a>], name: &str) -> Option<&'a CustomizedTag> {
        stack
            .iter()
            .rev()
            .filter_map(|frame| frame.tag.child())
            .find_map(|child| child.get(name))
            .or_else(|| self.root.get(name))
    }

    /// 1-indexed line number of a byte offset.
    fn line_at(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }
}

/// The node list new nodes are appended to: the innermost open tag's body,
/// or the root.
fn container<'s, 'a>(
    stack: &'s mut [Frame<'a>],
    root_nodes: &'s mut Vec<Node<'a>>,
) -> &'s mut Vec<Node<'a>> {
    match stack.last_mut() {
        Some(frame) => &mut frame.children,
        None => root_nodes,
    }
}
