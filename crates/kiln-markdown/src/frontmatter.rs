//! Frontmatter extraction and parsing.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Parsed frontmatter from a markdown document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    /// Page title
    #[serde(default)]
    pub title: Option<String>,

    /// Publication date, usually `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<String>,

    /// Extra class for the page `<body>`
    #[serde(default)]
    pub body_class: Option<String>,

    /// Pin this entry at the top of a listing
    #[serde(default)]
    pub featured: bool,

    /// Any other keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Extract frontmatter from markdown content.
///
/// Returns the parsed frontmatter and the remaining content after the frontmatter block.
/// The block opens with a `---` line and closes with a `---` or `...` line. A document
/// without a complete block yields the default (empty) frontmatter and the whole source,
/// so a leading horizontal rule stays part of the body.
pub fn extract_frontmatter(source: &str) -> Result<(Frontmatter, &str), FrontmatterError> {
    let Some((yaml_content, remaining)) = split_block(source) else {
        return Ok((Frontmatter::default(), source));
    };

    let yaml_content = yaml_content.trim();
    if yaml_content.is_empty() {
        return Ok((Frontmatter::default(), remaining));
    }

    let frontmatter: Frontmatter = serde_yaml::from_str(yaml_content)
        .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    Ok((frontmatter, remaining))
}

/// Split a fenced block off the start of `source` into (yaml, rest).
fn split_block(source: &str) -> Option<(&str, &str)> {
    let text = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lines = text.split_inclusive('\n');

    let open = lines.next()?;
    if open.trim_end() != "---" {
        return None;
    }

    let yaml_start = open.len();
    let mut pos = yaml_start;
    for line in lines {
        if matches!(line.trim_end(), "---" | "...") {
            return Some((&text[yaml_start..pos], &text[pos + line.len()..]));
        }
        pos += line.len();
    }

    None
}

/// Errors that can occur when parsing frontmatter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),
}
