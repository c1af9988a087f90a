//! Markdown documents with YAML front matter.
//!
//! This crate splits a document into its front matter and body, and renders
//! the body to HTML with site-relative link handling and a hook for image
//! markup.

pub mod document;
pub mod frontmatter;
pub mod render;

pub use document::{parse_document, Document, ParseError};
pub use frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};
pub use render::{render_markdown, rewrite_href, ImageRenderer};
