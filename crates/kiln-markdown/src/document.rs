//! Markdown document parser.

use crate::frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};

/// A parsed markdown document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Parsed frontmatter (default when the document has none)
    pub frontmatter: Frontmatter,

    /// Markdown body (without frontmatter)
    pub body: String,
}

/// Errors that can occur when parsing a document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// Parse a markdown document into frontmatter and body.
pub fn parse_document(source: &str) -> Result<Document, ParseError> {
    let (frontmatter, body) = extract_frontmatter(source)?;

    Ok(Document {
        frontmatter,
        body: body.to_string(),
    })
}
