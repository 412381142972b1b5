//! Markdown rendering with custom tags.

use bracetag_config::{Config, ConfigError, DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};
use pulldown_cmark::Options;

use crate::splice::Splicer;
use crate::tag::TagRegistry;
use crate::tag::resolver::Resolver;
use crate::tag::scanner::scan;
use crate::tag::tree::{Node, TreeBuilder};

/// Result of rendering markdown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderResult {
    /// Rendered HTML.
    pub html: String,
    /// Tags that degraded to text (stray closes, unclosed opens, nesting
    /// too deep), with their source line, in source order.
    pub warnings: Vec<String>,
}

/// Error building a renderer from configuration.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The async handler pool could not be started.
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Markdown renderer that expands custom tags.
///
/// A renderer holds no per-document state; one instance can render any
/// number of documents, with the same or different registries.
///
/// # Example
///
/// ```
/// use bracetag::{CustomizedTag, TagOutput, TagRegistry, TagRenderer};
///
/// let registry = TagRegistry::new().with_tag(
///     "red",
///     CustomizedTag::from_fn(|_| TagOutput::wrap(r#"<span style="color:red;">"#, "</span>")),
/// );
///
/// let result = TagRenderer::new().render("**123{red}456{/red}789**", &registry);
/// assert_eq!(
///     result.html,
///     r#"<p><strong>123<span style="color:red;">456</span>789</strong></p>"#
/// );
/// ```
#[derive(Debug)]
pub struct TagRenderer {
    gfm: bool,
    max_depth: usize,
    /// Dedicated pool for async handlers; the global rayon pool when unset.
    pool: Option<rayon::ThreadPool>,
}

impl TagRenderer {
    /// Create a renderer with GFM enabled and default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gfm: true,
            max_depth: DEFAULT_MAX_DEPTH,
            pool: None,
        }
    }

    /// Create a renderer from configuration.
    ///
    /// Starts a dedicated thread pool when `engine.async_threads` is set.
    pub fn from_config(config: &Config) -> Result<Self, RenderError> {
        config.validate()?;

        let pool = config
            .engine
            .async_threads
            .map(|threads| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("bracetag-async-{index}"))
                    .build()
            })
            .transpose()?;

        tracing::debug!(
            gfm = config.markdown.gfm,
            max_depth = config.engine.max_depth,
            async_threads = ?config.engine.async_threads,
            "Created tag renderer"
        );

        Ok(Self {
            gfm: config.markdown.gfm,
            max_depth: config.engine.max_depth,
            pool,
        })
    }

    /// Enable or disable GitHub Flavored Markdown features.
    ///
    /// GFM is enabled by default. When enabled, the parser supports:
    /// - Tables
    /// - Strikethrough (`~~text~~`)
    /// - Task lists (`- [ ] item`)
    /// - Blockquote alerts (`> [!NOTE]`)
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Set the maximum nesting depth of open tags, clamped to
    /// `1..=MAX_DEPTH_LIMIT` like `engine.max_depth`.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.clamp(1, MAX_DEPTH_LIMIT);
        self
    }

    /// Get parser options based on GFM configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Render markdown, expanding tags from `registry`.
    ///
    /// Never fails: malformed, unknown, or unmatched tags come out as
    /// literal text.
    pub fn render(&self, source: &str, registry: &TagRegistry) -> RenderResult {
        let pieces = scan(source);
        let tree = TreeBuilder::new(source, registry, self.max_depth).build(&pieces);

        let (tags, async_tags) = count_tags(&tree.nodes);
        tracing::debug!(
            tags,
            async_tags,
            warnings = tree.warnings.len(),
            "Built tag tree"
        );

        let resolved = Resolver::new(self.pool.as_ref()).resolve(&tree.nodes);
        let html = Splicer::new(self.parser_options()).render(&resolved);

        RenderResult {
            html,
            warnings: tree.warnings,
        }
    }

    /// Render raw bytes. Invalid UTF-8 is replaced with U+FFFD.
    pub fn render_bytes(&self, source: &[u8], registry: &TagRegistry) -> Vec<u8> {
        let source = String::from_utf8_lossy(source);
        self.render(&source, registry).html.into_bytes()
    }
}

impl Default for TagRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Render markdown bytes with default settings.
///
/// # Example
///
/// ```
/// use bracetag::{CustomizedTag, TagOutput, TagRegistry};
///
/// let registry = TagRegistry::new()
///     .with_tag("br", CustomizedTag::from_fn(|_| TagOutput::content("<br>")));
/// assert_eq!(bracetag::render(b"a{br/}b", &registry), b"<p>a<br>b</p>");
/// ```
pub fn render(source: &[u8], registry: &TagRegistry) -> Vec<u8> {
    TagRenderer::new().render_bytes(source, registry)
}

/// Count tags and async tags in a tree.
fn count_tags(nodes: &[Node<'_>]) -> (usize, usize) {
    nodes.iter().fold((0, 0), |(tags, async_tags), node| match node {
        Node::Text(_) => (tags, async_tags),
        Node::Tag(tag) => {
            let (inner, inner_async) = count_tags(&tag.children);
            (
                tags + 1 + inner,
                async_tags + usize::from(tag.tag.is_async()) + inner_async,
            )
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{CustomizedTag, TagOutput};
    use pretty_assertions::assert_eq;

    fn registry() -> TagRegistry {
        TagRegistry::new()
            .with_tag(
                "red",
                CustomizedTag::from_fn(|_| TagOutput::wrap("<r>", "</r>")),
            )
            .with_tag(
                "div",
                CustomizedTag::from_fn(|_| TagOutput::wrap("<div>", "</div>")).with_block(true),
            )
    }

    #[test]
    fn test_plain_markdown() {
        let result = TagRenderer::new().render("# Title\n\nText", &registry());
        assert_eq!(result.html, "<h1>Title</h1><p>Text</p>");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_warnings_reported() {
        let result = TagRenderer::new().render("{red}open\n\n{/div}", &registry());
        assert_eq!(result.html, "<p>{red}open</p><p>{/div}</p>");
        assert_eq!(
            result.warnings,
            vec![
                "line 1: unclosed tag {red} (missing {/red})",
                "line 3: stray closing tag {/div} with no matching opening tag",
            ]
        );
    }

    #[test]
    fn test_gfm_toggle() {
        let table = "| a |\n|---|\n| 1 |";
        let with = TagRenderer::new().render(table, &registry());
        assert!(with.html.contains("<table>"));

        let without = TagRenderer::new()
            .with_gfm(false)
            .render(table, &registry());
        assert!(!without.html.contains("<table>"));
    }

    #[test]
    fn test_max_depth() {
        let result = TagRenderer::new()
            .with_max_depth(1)
            .render("{red}{red}x{/red}{/red}", &registry());
        assert_eq!(result.html, "<p><r>{red}x</r>{/red}</p>");
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("maximum nesting depth (1)"));
    }

    #[test]
    fn test_max_depth_clamped() {
        assert_eq!(TagRenderer::new().with_max_depth(0).max_depth, 1);
        assert_eq!(
            TagRenderer::new().with_max_depth(usize::MAX).max_depth,
            MAX_DEPTH_LIMIT
        );

        let deep = "{red}".repeat(MAX_DEPTH_LIMIT + 1);
        let result = TagRenderer::new()
            .with_max_depth(usize::MAX)
            .render(&deep, &registry());
        assert_eq!(result.html, format!("<p>{deep}</p>"));
        assert_eq!(result.warnings.len(), MAX_DEPTH_LIMIT + 1);
    }

    #[test]
    fn test_from_config() {
        let config = Config::from_toml_str("[markdown]\ngfm = false\n[engine]\nmax_depth = 3\nasync_threads = 2\n")
            .unwrap();
        let renderer = TagRenderer::from_config(&config).unwrap();
        assert!(!renderer.gfm);
        assert_eq!(renderer.max_depth, 3);
        assert_eq!(renderer.pool.as_ref().map(rayon::ThreadPool::current_num_threads), Some(2));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = Config::default();
        config.engine.async_threads = Some(0);
        let err = TagRenderer::from_config(&config).unwrap_err();
        assert!(matches!(err, RenderError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn test_render_bytes_lossy() {
        let out = TagRenderer::new().render_bytes(b"a\xFFb{red}c{/red}", &registry());
        assert_eq!(String::from_utf8(out).unwrap(), "<p>a\u{FFFD}b<r>c</r></p>");
    }

    #[test]
    fn test_count_tags() {
        let registry = registry().with_tag(
            "slow",
            CustomizedTag::from_fn(|_| TagOutput::default()).with_async(true),
        );
        let source = "{red}{slow/}{/red}{slow/}x";
        let pieces = scan(source);
        let tree = TreeBuilder::new(source, &registry, 64).build(&pieces);
        assert_eq!(count_tags(&tree.nodes), (3, 2));
    }
}
