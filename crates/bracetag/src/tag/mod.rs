//! Tag engine.
//!
//! Source goes through four stages before it reaches Markdown:
//!
//! 1. [`scanner`] splits raw text into literal pieces and tag tokens
//! 2. [`parser`] turns one `{...}` candidate into a tag token
//! 3. [`tree`] pairs open/close tokens against the registry in scope
//! 4. [`resolver`] invokes handlers, concurrently for async tags

mod args;
mod output;
pub(crate) mod parser;
mod registry;
pub(crate) mod resolver;
pub(crate) mod scanner;
pub(crate) mod tree;

pub use args::TagArgs;
pub use output::TagOutput;
pub use registry::{CustomizedTag, TagHandler, TagRegistry};
