//! Extension-keyed transform registry.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::SiteConfig;
use crate::context::{BuildContext, SourceFile};
use crate::images::ImageResizer;
use crate::templates::TemplateEngine;
use crate::transforms::{
    CopyTransform, DocumentTransform, ImageTransform, ScriptTransform, StyleTransform,
};

/// What a transform produces, used for phase ordering and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Rendered page; runs after every asset
    Document,
    /// Fingerprinted style or script
    Asset,
    /// Image and its variants
    Image,
    /// Verbatim copy
    Copy,
}

/// Result of transforming one source file.
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    /// Every output path written or kept
    pub outputs: Vec<PathBuf>,

    /// `original -> hashed` output-relative paths to register
    pub manifest_entry: Option<(String, String)>,
}

impl TransformOutput {
    pub fn single(path: PathBuf) -> Self {
        Self {
            outputs: vec![path],
            manifest_entry: None,
        }
    }
}

/// Errors raised by a single transform.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Failed to minify: {0}")]
    Minify(String),

    #[error("Failed to render template: {0}")]
    Template(String),

    #[error("Failed to process image: {0}")]
    Image(String),
}

impl TransformError {
    pub(crate) fn io(path: &std::path::Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// A per-extension file transform.
pub trait Transform: Send + Sync {
    /// Transform identifier (e.g. "style", "document")
    fn name(&self) -> &'static str;

    /// Lowercase extensions this transform handles
    fn extensions(&self) -> &[&'static str];

    fn kind(&self) -> OutputKind;

    /// Transform `file`, returning every output path produced.
    fn process(
        &self,
        ctx: &BuildContext,
        file: &SourceFile,
    ) -> Result<TransformOutput, TransformError>;
}

/// Outcome of dispatching one file.
#[derive(Debug)]
pub struct Dispatched {
    pub output: TransformOutput,
    pub kind: OutputKind,
    /// The selected transform failed and the file was copied instead
    pub fell_back: bool,
}

/// Maps extensions to transforms, with verbatim copy for everything else.
pub struct Dispatcher {
    transforms: HashMap<&'static str, Arc<dyn Transform>>,
    fallback: CopyTransform,
}

impl Dispatcher {
    /// Dispatcher that copies every file.
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
            fallback: CopyTransform,
        }
    }

    /// Dispatcher with the style, script, document and image transforms.
    pub fn standard(
        config: Arc<SiteConfig>,
        templates: TemplateEngine,
        resizer: Arc<dyn ImageResizer>,
    ) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(StyleTransform);
        dispatcher.register(ScriptTransform);
        dispatcher.register(DocumentTransform::new(config, templates));
        dispatcher.register(ImageTransform::new(resizer));
        dispatcher
    }

    /// Register `transform` for all of its extensions, replacing earlier ones.
    pub fn register(&mut self, transform: impl Transform + 'static) {
        let transform: Arc<dyn Transform> = Arc::new(transform);
        for &ext in transform.extensions() {
            self.transforms.insert(ext, Arc::clone(&transform));
        }
    }

    /// Transform selected for `file`.
    pub fn transform_for(&self, file: &SourceFile) -> &dyn Transform {
        file.extension()
            .and_then(|ext| self.transforms.get(ext.as_str()))
            .map(|t| t.as_ref())
            .unwrap_or(&self.fallback)
    }

    pub fn kind_of(&self, file: &SourceFile) -> OutputKind {
        self.transform_for(file).kind()
    }

    /// Process one file, falling back to a verbatim copy when its transform fails.
    ///
    /// Only a failing fallback copy is returned as an error.
    pub fn process(
        &self,
        ctx: &BuildContext,
        file: &SourceFile,
    ) -> Result<Dispatched, TransformError> {
        let transform = self.transform_for(file);

        match transform.process(ctx, file) {
            Ok(output) => {
                tracing::debug!("{}: {}", transform.name(), file.rel);
                Ok(Dispatched {
                    output,
                    kind: transform.kind(),
                    fell_back: false,
                })
            }
            Err(e) => {
                tracing::warn!("Error processing {}: {}", file.rel, e);
                let output = self.fallback.process(ctx, file)?;
                Ok(Dispatched {
                    output,
                    kind: OutputKind::Copy,
                    fell_back: true,
                })
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
