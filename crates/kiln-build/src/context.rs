//! Per-build state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::manifest::AssetManifest;

/// Options for a single build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Empty the output directory before building
    pub clean: bool,

    /// Regenerate image variants even when they are up to date
    pub force_regenerate: bool,

    /// Markup injected into every page for live reload
    pub dev_reload: Option<String>,
}

/// Output paths written or confirmed during the current build.
#[derive(Debug, Clone, Default)]
pub struct ProcessedSet {
    paths: HashSet<PathBuf>,
}

impl ProcessedSet {
    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    pub fn extend<I: IntoIterator<Item = PathBuf>>(&mut self, paths: I) {
        self.paths.extend(paths);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// State owned by exactly one build. Created fresh at the start of every build.
#[derive(Debug, Default)]
pub struct BuildContext {
    pub options: BuildOptions,
    pub manifest: AssetManifest,
    pub processed: ProcessedSet,
}

impl BuildContext {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            manifest: AssetManifest::new(),
            processed: ProcessedSet::default(),
        }
    }
}

/// Which source tree a file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeRoot {
    /// Static assets, mirrored under `<output>/static`
    Static,
    /// Content tree, mirrored at the output root
    Content,
}

/// A source file with its destination.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name
    pub name: String,

    /// Path on disk
    pub src: PathBuf,

    /// Path relative to the tree root, `/`-separated
    pub rel: String,

    /// Destination path under the output directory
    pub dest: PathBuf,

    /// Destination relative to the output directory, `/`-separated
    pub output_rel: String,

    pub root: TreeRoot,
}

impl SourceFile {
    /// Lowercased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// Join path components with `/` regardless of platform.
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
