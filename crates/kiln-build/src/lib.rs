//! Incremental static site builder for kiln.
//!
//! Builds a site from a content tree of markdown documents and a static asset
//! tree. Styles and scripts are minified under content-hashed names, images
//! get responsive variants, and documents render through page templates with
//! every asset reference rewritten to its hashed path. Output files the build
//! did not produce are swept.

pub mod assets;
pub mod builder;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod hash;
pub mod images;
pub mod listings;
pub mod manifest;
pub mod sweep;
pub mod templates;
pub mod transforms;

pub use builder::{BuildError, BuildReport, SiteBuilder};
pub use config::{ConfigError, ImagePolicy, SiteConfig};
pub use context::{BuildContext, BuildOptions, ProcessedSet, SourceFile, TreeRoot};
pub use dispatch::{Dispatcher, OutputKind, Transform, TransformError, TransformOutput};
pub use images::{ImagePipeline, ImageResizer};
pub use manifest::AssetManifest;
pub use sweep::{sweep_orphans, SweepReport};
pub use templates::{PageContext, TemplateEngine};
