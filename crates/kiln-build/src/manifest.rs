//! Asset manifest: original output paths to their content-hashed paths.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Mapping from an asset's original output-relative path to its hashed path.
///
/// Keys and values use `/` separators and are relative to the output root,
/// e.g. `static/css/style.css -> static/css/style.1a2b3c4d5e.css`.
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
    entries: BTreeMap<String, String>,
    /// Alternation of all keys, longest first; rebuilt after every insert.
    matcher: OnceLock<Option<Regex>>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hashed path for `original`.
    pub fn insert(&mut self, original: impl Into<String>, hashed: impl Into<String>) {
        self.entries.insert(original.into(), hashed.into());
        self.matcher = OnceLock::new();
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    /// Hashed path for `original`, or `original` itself when unknown.
    pub fn resolve<'a>(&'a self, original: &'a str) -> &'a str {
        self.get(original).unwrap_or(original)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every reference to an original path in `html` with its hashed path.
    ///
    /// Root-prefixed forms (`../static/app.js`, `/static/app.js`) contain the
    /// bare key and are rewritten along with it. A match glued to surrounding
    /// name characters (`mystatic/app.js`, `static/app.json`) is left alone.
    /// References to unknown paths pass through unchanged.
    pub fn rewrite(&self, html: &str) -> String {
        match self.matcher() {
            Some(matcher) => self.replace_matches(html, matcher, &BTreeMap::new()),
            None => html.to_string(),
        }
    }

    /// [`rewrite`](Self::rewrite) for a page in the output-relative directory
    /// `page_dir`, also resolving references relative to that directory
    /// (`demo.js` or `./demo.js` from `posts/a/index.html`).
    pub fn rewrite_in(&self, html: &str, page_dir: &str) -> String {
        let relative = self.relative_to(page_dir);
        if relative.is_empty() {
            return self.rewrite(html);
        }

        let keys = self.entries.keys().chain(relative.keys()).map(String::as_str);
        match compile_matcher(keys) {
            Some(matcher) => self.replace_matches(html, &matcher, &relative),
            None => html.to_string(),
        }
    }

    /// Entries under `dir`, keyed and valued relative to it.
    fn relative_to(&self, dir: &str) -> BTreeMap<String, String> {
        let dir = dir.trim_matches('/');
        if dir.is_empty() {
            return BTreeMap::new();
        }
        let prefix = format!("{}/", dir);

        self.iter()
            .filter_map(|(original, hashed)| {
                let original = original.strip_prefix(&prefix)?;
                let hashed = hashed.strip_prefix(&prefix)?;
                Some((original.to_string(), hashed.to_string()))
            })
            .collect()
    }

    fn replace_matches(
        &self,
        html: &str,
        matcher: &Regex,
        relative: &BTreeMap<String, String>,
    ) -> String {
        let bytes = html.as_bytes();
        let mut out = String::with_capacity(html.len());
        let mut last = 0;

        for m in matcher.find_iter(html) {
            let glued_before = m.start() > 0 && is_name_byte(bytes[m.start() - 1]);
            let glued_after = match bytes.get(m.end()) {
                Some(b'.') => bytes.get(m.end() + 1).is_some_and(u8::is_ascii_alphanumeric),
                Some(b) => is_name_byte(*b),
                None => false,
            };
            if glued_before || glued_after {
                continue;
            }

            let hashed = relative
                .get(m.as_str())
                .filter(|_| is_page_relative(bytes, m.start()))
                .or_else(|| self.entries.get(m.as_str()));

            if let Some(hashed) = hashed {
                out.push_str(&html[last..m.start()]);
                out.push_str(hashed);
                last = m.end();
            }
        }

        out.push_str(&html[last..]);
        out
    }

    fn matcher(&self) -> Option<&Regex> {
        self.matcher
            .get_or_init(|| compile_matcher(self.entries.keys().map(String::as_str)))
            .as_ref()
    }
}

/// Alternation of `keys`, longest first. `None` when there are no keys.
fn compile_matcher<'a>(keys: impl Iterator<Item = &'a str>) -> Option<Regex> {
    let mut keys: Vec<&str> = keys.collect();
    if keys.is_empty() {
        return None;
    }
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    keys.dedup();

    let pattern = keys
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");

    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Asset manifest matcher failed to compile: {}", e);
            None
        }
    }
}

/// A match at `start` is page-relative when bare or after a lone `./`.
fn is_page_relative(bytes: &[u8], start: usize) -> bool {
    if start == 0 || bytes[start - 1] != b'/' {
        return true;
    }
    if start < 2 || bytes[start - 2] != b'.' {
        return false;
    }
    start == 2 || !(matches!(bytes[start - 3], b'.' | b'/') || is_name_byte(bytes[start - 3]))
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}
