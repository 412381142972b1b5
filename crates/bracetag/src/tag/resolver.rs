//! Handler resolution.
//!
//! Walks the tag tree and invokes each tag's handler. Siblings marked async
//! are resolved in parallel on a rayon pool; the resolved list always keeps
//! source order.

use super::TagOutput;
use super::tree::{Node, TagForm};

/// A node with its handler output attached.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Resolved<'a> {
    Text(&'a str),
    Tag(ResolvedTag<'a>),
}

/// A resolved tag: handler output plus placement and resolved body.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ResolvedTag<'a> {
    pub output: TagOutput,
    pub is_block: bool,
    pub form: TagForm,
    pub children: Vec<Resolved<'a>>,
}

/// Resolves tag trees, optionally on a dedicated thread pool.
///
/// Without a pool, async handlers run on rayon's global pool.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Resolver<'p> {
    pool: Option<&'p rayon::ThreadPool>,
}

impl<'p> Resolver<'p> {
    pub(crate) fn new(pool: Option<&'p rayon::ThreadPool>) -> Self {
        Self { pool }
    }

    /// Resolve a sibling list.
    ///
    /// Each node owns one output slot. Async nodes are spawned onto the pool
    /// and fill their slot when done; the rest are resolved in place while
    /// those run. The scope joins before the slots are read.
    pub(crate) fn resolve<'a>(&self, nodes: &[Node<'a>]) -> Vec<Resolved<'a>> {
        let async_count = nodes.iter().filter(|node| node.is_async()).count();
        if async_count == 0 {
            return nodes.iter().map(|node| self.resolve_node(node)).collect();
        }

        tracing::trace!(async_count, siblings = nodes.len(), "Resolving async tags");

        let mut slots: Vec<Option<Resolved<'a>>> = Vec::with_capacity(nodes.len());
        slots.resize_with(nodes.len(), || None);

        let pending = nodes.iter().zip(slots.iter_mut());
        self.scope(move |scope| {
            for (node, slot) in pending {
                if node.is_async() {
                    scope.spawn(move |_| *slot = Some(self.resolve_node(node)));
                } else {
                    *slot = Some(self.resolve_node(node));
                }
            }
        });

        slots.into_iter().flatten().collect()
    }

    fn resolve_node<'a>(&self, node: &Node<'a>) -> Resolved<'a> {
        match node {
            Node::Text(text) => Resolved::Text(*text),
            Node::Tag(tag) => {
                tracing::trace!(name = %tag.name, is_async = tag.tag.is_async(), "Resolving tag");
                let children = self.resolve(&tag.children);
                Resolved::Tag(ResolvedTag {
                    output: tag.tag.resolve(&tag.args),
                    is_block: tag.tag.is_block(),
                    form: tag.form,
                    children,
                })
            }
        }
    }

    fn scope<'scope, OP>(&self, op: OP)
    where
        OP: FnOnce(&rayon::Scope<'scope>) + Send,
    {
        match self.pool {
            Some(pool) => pool.scope(op),
            None => rayon::scope(op),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::tag::scanner::scan;
    use crate::tag::tree::TreeBuilder;
    use crate::tag::{CustomizedTag, TagRegistry};
    use pretty_assertions::assert_eq;

    /// Flatten resolved output the way a paired/self-closing tag emits it.
    fn flatten(items: &[Resolved<'_>]) -> String {
        items
            .iter()
            .map(|item| match item {
                Resolved::Text(text) => (*text).to_owned(),
                Resolved::Tag(tag) => match tag.form {
                    TagForm::SelfClosing => tag.output.content.clone(),
                    TagForm::Paired => format!(
                        "{}{}{}",
                        tag.output.before,
                        flatten(&tag.children),
                        tag.output.after
                    ),
                },
            })
            .collect()
    }

    fn resolve(source: &str, registry: &TagRegistry, pool: Option<&rayon::ThreadPool>) -> String {
        let pieces = scan(source);
        let tree = TreeBuilder::new(source, registry, 64).build(&pieces);
        flatten(&Resolver::new(pool).resolve(&tree.nodes))
    }

    /// Sleeps for `arg(0)` milliseconds, then echoes it.
    fn sleeper() -> CustomizedTag {
        CustomizedTag::from_fn(|args| {
            let ms: u64 = args.arg(0).and_then(|s| s.parse().ok()).unwrap_or(0);
            thread::sleep(Duration::from_millis(ms));
            TagOutput::content(format!("[{ms}]"))
        })
        .with_async(true)
    }

    #[test]
    fn test_sync_resolution() {
        let registry = TagRegistry::new()
            .with_tag("red", CustomizedTag::from_fn(|_| TagOutput::wrap("<r>", "</r>")))
            .with_tag("br", CustomizedTag::from_fn(|_| TagOutput::content("<br>")));
        assert_eq!(
            resolve("a{red}b{br/}c{/red}d", &registry, None),
            "a<r>b<br>c</r>d"
        );
    }

    #[test]
    fn test_paired_ignores_content_and_self_closing_ignores_wrap() {
        let both = CustomizedTag::from_fn(|_| TagOutput::wrap("(", ")").with_content("X"));
        let registry = TagRegistry::new().with_tag("t", both);
        assert_eq!(resolve("{t}body{/t}|{t/}", &registry, None), "(body)|X");
    }

    #[test]
    fn test_async_preserves_source_order() {
        let registry = TagRegistry::new().with_tag("async", sleeper());
        let source = "{async 80/}{async 40/}a{async 10/}{async 0/}";
        assert_eq!(resolve(source, &registry, None), "[80][40]a[10][0]");
    }

    #[test]
    fn test_async_inside_sync_body() {
        let registry = TagRegistry::new()
            .with_tag("async", sleeper())
            .with_tag("p", CustomizedTag::from_fn(|_| TagOutput::wrap("<p>", "</p>")));
        assert_eq!(
            resolve("{p}{async 30/}{async 1/}{/p}", &registry, None),
            "<p>[30][1]</p>"
        );
    }

    #[test]
    fn test_async_handlers_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tag = {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            CustomizedTag::from_fn(move |_| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(100));
                active.fetch_sub(1, Ordering::SeqCst);
                TagOutput::content("x")
            })
            .with_async(true)
        };
        let registry = TagRegistry::new().with_tag("slow", tag);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap();

        let out = resolve("{slow/}{slow/}{slow/}{slow/}", &registry, Some(&pool));
        assert_eq!(out, "xxxx");
        assert!(peak.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_mixed_sync_and_async_siblings() {
        let registry = TagRegistry::new()
            .with_tag("async", sleeper())
            .with_tag("now", CustomizedTag::from_fn(|_| TagOutput::content("now")));
        assert_eq!(
            resolve("{now/}{async 20/}{now/}", &registry, None),
            "now[20]now"
        );
    }
}
