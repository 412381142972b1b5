//! Custom `{tag}` extensions for markdown rendering.
//!
//! Callers register named tag handlers in a [`TagRegistry`]. Occurrences of
//! those tags in markdown source are expanded with the handler output and the
//! result is rendered to HTML with pulldown-cmark.
//!
//! # Syntax
//!
//! - `{name attr=value arg/}`: self-closing, emits [`TagOutput::content`]
//! - `{name attr=value}...{/name}`: paired, emits [`TagOutput::before`], the
//!   rendered body, then [`TagOutput::after`]
//! - `\{`: a literal brace that never starts a tag
//!
//! Attribute values may be quoted (`name="Tanaka Satoshi"`). Unknown names,
//! unmatched tags, and malformed syntax are passed through as text.
//!
//! # Placement
//!
//! Inline tags (the default) are spliced into the surrounding paragraph and
//! take part in inline parsing, so `**a{red}b{/red}c**` stays bold throughout.
//! Block tags ([`CustomizedTag::with_block`]) end the current paragraph and
//! stand on their own.
//!
//! # Async handlers
//!
//! Handlers of tags marked [`CustomizedTag::with_async`] run concurrently with
//! their async siblings on a rayon pool. Output order always follows the
//! source, whatever order the handlers finish in.
//!
//! # Example
//!
//! ```
//! use bracetag::{CustomizedTag, TagOutput, TagRegistry, TagRenderer};
//!
//! let registry = TagRegistry::new()
//!     .with_tag(
//!         "note",
//!         CustomizedTag::from_fn(|_| TagOutput::wrap(r#"<aside class="note">"#, "</aside>"))
//!             .with_block(true),
//!     )
//!     .with_tag(
//!         "kbd",
//!         CustomizedTag::from_fn(|args| {
//!             TagOutput::content(format!("<kbd>{}</kbd>", args.args.join("+")))
//!         }),
//!     );
//!
//! let result = TagRenderer::new().render("Press {kbd Ctrl C/}.\n{note}*Saved.*{/note}", &registry);
//! assert_eq!(
//!     result.html,
//!     r#"<p>Press <kbd>Ctrl+C</kbd>.</p><aside class="note"><p><em>Saved.</em></p></aside>"#
//! );
//! ```

mod html;
mod renderer;
mod splice;
mod tag;

pub use renderer::{RenderError, RenderResult, TagRenderer, render};
pub use tag::{CustomizedTag, TagArgs, TagHandler, TagOutput, TagRegistry};
