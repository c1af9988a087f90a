//! Site configuration.
//!
//! Defaults are layered under an optional JSON file. Every key is optional and
//! nested objects merge field by field, so a file containing only
//! `{"images": {"maxSize": 1200}}` keeps every other default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration for building a site. Loaded once per process.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    /// Content tree (markdown documents, images, other files)
    pub source_dir: PathBuf,

    /// Output tree
    pub output_dir: PathBuf,

    /// Local static assets, mirrored under `<output>/static`
    pub static_dir: PathBuf,

    /// Local page and partial templates
    pub templates_dir: PathBuf,

    /// Packaged fallback holding `static/` and `templates/`
    pub theme_dir: Option<PathBuf>,

    /// Template used for every document
    pub page_template: String,

    /// Domain written to `CNAME`; no file when absent
    pub custom_domain: Option<String>,

    /// Google Analytics measurement id
    pub google_analytics: Option<String>,

    /// Responsive image policy
    pub images: ImagePolicy,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("content"),
            output_dir: PathBuf::from("docs"),
            static_dir: PathBuf::from("static"),
            templates_dir: PathBuf::from("templates"),
            theme_dir: None,
            page_template: "page.html".to_string(),
            custom_domain: None,
            google_analytics: None,
            images: ImagePolicy::default(),
        }
    }
}

/// Image sizes and encoder settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ImagePolicy {
    /// Widths to generate, in pixels
    pub sizes: Vec<u32>,

    /// Largest width ever generated
    pub max_size: u32,

    /// Encoder quality per format
    pub quality: ImageQuality,

    /// Breakpoints for the `sizes` attribute
    pub responsive: ResponsivePolicy,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            sizes: vec![480, 960],
            max_size: 960,
            quality: ImageQuality::default(),
            responsive: ResponsivePolicy::default(),
        }
    }
}

impl ImagePolicy {
    /// Widths to generate for a source image `source_width` pixels wide.
    ///
    /// Configured sizes above the source width or `max_size` are skipped; an
    /// image smaller than every configured size gets a single variant at its
    /// own width.
    pub fn target_widths(&self, source_width: u32) -> Vec<u32> {
        let limit = source_width.min(self.max_size);

        let mut widths: Vec<u32> = self
            .sizes
            .iter()
            .copied()
            .filter(|w| *w > 0 && *w <= limit)
            .collect();
        widths.sort_unstable();
        widths.dedup();

        if widths.is_empty() && limit > 0 {
            widths.push(limit);
        }

        widths
    }

    /// Value of the `sizes` attribute for full-width images.
    pub fn sizes_attr(&self) -> String {
        let mut parts: Vec<String> = self
            .responsive
            .breakpoints
            .iter()
            .map(|bp| format!("(max-width: {}px) {}", bp.max_width, bp.width))
            .collect();
        parts.push(self.responsive.max_width.clone());
        parts.join(", ")
    }
}

/// Encoder quality settings (0-100).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageQuality {
    pub webp: u8,
    pub avif: u8,
}

impl Default for ImageQuality {
    fn default() -> Self {
        Self { webp: 82, avif: 55 }
    }
}

/// Breakpoint table for responsive images.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponsivePolicy {
    pub breakpoints: Vec<Breakpoint>,

    /// Rendered width above the last breakpoint
    pub max_width: String,
}

impl Default for ResponsivePolicy {
    fn default() -> Self {
        Self {
            breakpoints: vec![
                Breakpoint {
                    max_width: 480,
                    width: "96vw".to_string(),
                },
                Breakpoint {
                    max_width: 960,
                    width: "90vw".to_string(),
                },
            ],
            max_width: "960px".to_string(),
        }
    }
}

/// Viewport width up to which an image renders at `width`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    pub max_width: u32,
    pub width: String,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl SiteConfig {
    /// Parse a JSON override on top of the defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load configuration from `path` if it exists, defaults otherwise.
    ///
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config = Self::from_json(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// First existing directory among the local one and the theme's `name` subdirectory.
    fn resolve_dir(&self, local: &Path, name: &str) -> Option<PathBuf> {
        if local.is_dir() {
            return Some(local.to_path_buf());
        }

        self.theme_dir
            .as_ref()
            .map(|theme| theme.join(name))
            .filter(|dir| dir.is_dir())
    }

    /// Static asset directory, local first, then the theme's.
    pub fn resolve_static_dir(&self) -> Option<PathBuf> {
        self.resolve_dir(&self.static_dir, "static")
    }

    /// Template directory, local first, then the theme's.
    pub fn resolve_templates_dir(&self) -> Option<PathBuf> {
        self.resolve_dir(&self.templates_dir, "templates")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn merges_partial_override() {
        let config =
            SiteConfig::from_json(r#"{"outputDir": "public", "images": {"maxSize": 1200}}"#)
                .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("public"));
        assert_eq!(config.source_dir, PathBuf::from("content"));
        assert_eq!(config.images.max_size, 1200);
        assert_eq!(config.images.sizes, vec![480, 960]);
        assert_eq!(config.images.quality.avif, 55);
        assert!(config.custom_domain.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();

        let config = SiteConfig::load(&temp.path().join("kiln.json")).unwrap();

        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("kiln.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            SiteConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn target_widths_respect_limits() {
        let policy = ImagePolicy::default();

        assert_eq!(policy.target_widths(2000), vec![480, 960]);
        assert_eq!(policy.target_widths(700), vec![480]);
        assert_eq!(policy.target_widths(300), vec![300]);
    }

    #[test]
    fn builds_sizes_attribute() {
        let policy = ImagePolicy::default();

        assert_eq!(
            policy.sizes_attr(),
            "(max-width: 480px) 96vw, (max-width: 960px) 90vw, 960px"
        );
    }

    #[test]
    fn resolves_theme_fallback() {
        let temp = tempdir().unwrap();
        let theme = temp.path().join("theme");
        fs::create_dir_all(theme.join("static")).unwrap();

        let config = SiteConfig {
            static_dir: temp.path().join("static"),
            theme_dir: Some(theme.clone()),
            ..Default::default()
        };

        assert_eq!(config.resolve_static_dir(), Some(theme.join("static")));
        assert_eq!(config.resolve_templates_dir(), None);

        fs::create_dir_all(theme.join("templates")).unwrap();
        assert_eq!(config.resolve_templates_dir(), Some(theme.join("templates")));

        fs::create_dir_all(&config.templates_dir).unwrap();
        assert_eq!(config.resolve_templates_dir(), Some(config.templates_dir.clone()));
    }
}
