//! Tag handler output.

/// Output produced by a tag handler.
///
/// Paired invocations (`{name}...{/name}`) emit `before`, the rendered body,
/// then `after`. Self-closing invocations (`{name/}`) emit `content` alone.
///
/// # Example
///
/// ```
/// use bracetag::TagOutput;
///
/// let leaf = TagOutput::content("<br>");
/// assert_eq!(leaf.content, "<br>");
///
/// let wrapper = TagOutput::wrap("<span>", "</span>");
/// assert_eq!(wrapper.before, "<span>");
/// assert!(wrapper.content.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagOutput {
    /// Emitted before the rendered body of a paired tag.
    pub before: String,
    /// Emitted after the rendered body of a paired tag.
    pub after: String,
    /// Emitted for a self-closing tag.
    pub content: String,
}

impl TagOutput {
    /// Create output for self-closing use.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Create output wrapping the body of a paired tag.
    #[must_use]
    pub fn wrap(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
            content: String::new(),
        }
    }

    /// Set the self-closing content, keeping `before`/`after`.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content() {
        let output = TagOutput::content("<br>");
        assert_eq!(
            output,
            TagOutput {
                before: String::new(),
                after: String::new(),
                content: "<br>".to_owned(),
            }
        );
    }

    #[test]
    fn test_wrap_with_content() {
        let output = TagOutput::wrap("<", ">").with_content("500");
        assert_eq!(output.before, "<");
        assert_eq!(output.after, ">");
        assert_eq!(output.content, "500");
    }

    #[test]
    fn test_default_is_empty() {
        let output = TagOutput::default();
        assert!(output.before.is_empty());
        assert!(output.after.is_empty());
        assert!(output.content.is_empty());
    }
}
