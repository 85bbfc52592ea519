//! Content loading and markdown rendering for folio.
//!
//! This crate discovers content files, splits YAML front-matter from the markdown
//! body, and renders the body into a [`ContentTree`] whose fenced blocks carry a
//! declared kind for the annotation pass.

pub mod document;
pub mod fence;
pub mod frontmatter;
pub mod html;
pub mod loader;
pub mod node;
pub mod renderer;
pub mod slug;

pub use document::Document;
pub use fence::{DiagramEngine, FenceKind, FencedBlock, Language};
pub use frontmatter::{FrontMatter, MetadataError};
pub use html::escape_html;
pub use loader::{ContentLoader, LoadError, SourceFile};
pub use node::{Block, ContentTree, Inline, TocEntry};
pub use renderer::{render, render_with_offset, RenderError, Rendered};
pub use slug::slugify;
