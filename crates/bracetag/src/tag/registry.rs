//! Tag registration.
//!
//! A [`TagRegistry`] maps tag names to [`CustomizedTag`] entries. Entries may
//! carry a child registry that is only visible inside their own body.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{TagArgs, TagOutput};

/// Handler invoked for every recognized occurrence of a tag.
///
/// Handlers receive only the parsed attributes and positional arguments. For
/// paired tags the engine renders the body itself and wraps it with
/// [`TagOutput::before`] and [`TagOutput::after`].
///
/// Handlers of async tags run on rayon worker threads, hence `Send + Sync`.
///
/// # Example
///
/// ```
/// use bracetag::{TagArgs, TagHandler, TagOutput};
///
/// struct Kbd;
///
/// impl TagHandler for Kbd {
///     fn resolve(&self, args: &TagArgs) -> TagOutput {
///         TagOutput::content(format!("<kbd>{}</kbd>", args.args.join("+")))
///     }
/// }
/// ```
pub trait TagHandler: Send + Sync {
    /// Produce the output for one invocation.
    fn resolve(&self, args: &TagArgs) -> TagOutput;
}

impl<F> TagHandler for F
where
    F: Fn(&TagArgs) -> TagOutput + Send + Sync,
{
    fn resolve(&self, args: &TagArgs) -> TagOutput {
        self(args)
    }
}

/// A registered tag: handler plus placement and scheduling flags.
#[derive(Clone)]
pub struct CustomizedTag {
    handler: Arc<dyn TagHandler>,
    is_block: bool,
    is_async: bool,
    child: Option<TagRegistry>,
}

impl CustomizedTag {
    /// Create an inline, synchronous tag.
    pub fn new<H: TagHandler + 'static>(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            is_block: false,
            is_async: false,
            child: None,
        }
    }

    /// Create a tag from a closure.
    ///
    /// # Example
    ///
    /// ```
    /// use bracetag::{CustomizedTag, TagOutput};
    ///
    /// let red = CustomizedTag::from_fn(|_| {
    ///     TagOutput::wrap(r#"<span style="color:red;">"#, "</span>")
    /// });
    /// assert!(!red.is_block());
    /// ```
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&TagArgs) -> TagOutput + Send + Sync + 'static,
    {
        Self::new(handler)
    }

    /// Render this tag outside paragraph wrapping.
    #[must_use]
    pub fn with_block(mut self, is_block: bool) -> Self {
        self.is_block = is_block;
        self
    }

    /// Allow this tag's handler to run concurrently with its siblings.
    #[must_use]
    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    /// Register tags that are only recognized inside this tag's body.
    #[must_use]
    pub fn with_child(mut self, child: TagRegistry) -> Self {
        self.child = Some(child);
        self
    }

    /// Whether the output must stand outside paragraph wrapping.
    #[must_use]
    pub fn is_block(&self) -> bool {
        self.is_block
    }

    /// Whether the handler may run concurrently with its siblings.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Tags scoped to this tag's body.
    #[must_use]
    pub fn child(&self) -> Option<&TagRegistry> {
        self.child.as_ref()
    }

    /// Invoke the handler.
    #[must_use]
    pub fn resolve(&self, args: &TagArgs) -> TagOutput {
        self.handler.resolve(args)
    }
}

impl fmt::Debug for CustomizedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomizedTag")
            .field("is_block", &self.is_block)
            .field("is_async", &self.is_async)
            .field("child", &self.child)
            .finish_non_exhaustive()
    }
}

/// Name to [`CustomizedTag`] mapping.
///
/// The engine only ever reads a registry; one registry can serve any number
/// of independent renders.
///
/// # Example
///
/// ```
/// use bracetag::{CustomizedTag, TagOutput, TagRegistry};
///
/// let registry = TagRegistry::new()
///     .with_tag("br", CustomizedTag::from_fn(|_| TagOutput::content("<br>")));
/// assert!(registry.contains("br"));
/// assert!(!registry.contains("hr"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct TagRegistry {
    tags: HashMap<String, CustomizedTag>,
}

impl TagRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag, replacing any previous entry with the same name.
    #[must_use]
    pub fn with_tag(mut self, name: impl Into<String>, tag: CustomizedTag) -> Self {
        self.insert(name, tag);
        self
    }

    /// Register a tag, returning the entry it replaced.
    pub fn insert(&mut self, name: impl Into<String>, tag: CustomizedTag) -> Option<CustomizedTag> {
        self.tags.insert(name.into(), tag)
    }

    /// Look up a tag by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CustomizedTag> {
        self.tags.get(name)
    }

    /// Check if a tag is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// Number of registered tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check if no tags are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
