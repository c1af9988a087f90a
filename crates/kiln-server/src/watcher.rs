//! File watching for watch mode.

use std::path::{Path, PathBuf};

use kiln_build::SiteConfig;
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::scheduler::SchedulerHandle;

/// Which changed files under a watched root trigger a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchFilter {
    /// Every file
    Any,
    /// Only files with this extension
    Only(String),
    /// Every file except those with this extension
    Except(String),
}

impl WatchFilter {
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match self {
            Self::Any => true,
            Self::Only(wanted) => ext.as_deref() == Some(wanted.as_str()),
            Self::Except(skipped) => ext.as_deref() != Some(skipped.as_str()),
        }
    }
}

/// A directory watched recursively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRoot {
    pub path: PathBuf,
    pub filter: WatchFilter,
}

impl WatchRoot {
    pub fn new(path: impl Into<PathBuf>, filter: WatchFilter) -> Self {
        Self {
            path: path.into(),
            filter,
        }
    }
}

/// Errors that can occur when setting up watches.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: String,
        #[source]
        source: notify::Error,
    },
}

/// Roots watched for a site: the content tree, templates, stylesheets and the
/// rest of the static tree.
pub fn site_roots(config: &SiteConfig) -> Vec<WatchRoot> {
    let mut roots = vec![WatchRoot::new(&config.source_dir, WatchFilter::Any)];

    if let Some(templates) = config.resolve_templates_dir() {
        roots.push(WatchRoot::new(templates, WatchFilter::Only("html".into())));
    }
    if let Some(static_dir) = config.resolve_static_dir() {
        roots.push(WatchRoot::new(
            static_dir.join("css"),
            WatchFilter::Only("css".into()),
        ));
        roots.push(WatchRoot::new(static_dir, WatchFilter::Except("css".into())));
    }

    roots
}

/// Whether an event kind reflects a content change.
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Active watches. Dropping this stops watching.
pub struct SiteWatcher {
    watchers: Vec<RecommendedWatcher>,
}

impl SiteWatcher {
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}

/// Watch every existing root, requesting a rebuild on each matching change.
///
/// Roots that do not exist are skipped.
pub fn watch_roots(
    roots: &[WatchRoot],
    handle: &SchedulerHandle,
) -> Result<SiteWatcher, WatchError> {
    let mut watchers = Vec::new();

    for root in roots {
        if !root.path.is_dir() {
            tracing::debug!("Not watching missing {}", root.path.display());
            continue;
        }

        let filter = root.filter.clone();
        let handle = handle.clone();
        let to_error = |source: notify::Error| WatchError::Watch {
            path: root.path.display().to_string(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    if !is_content_change(&event.kind) {
                        return;
                    }
                    if let Some(path) = event.paths.iter().find(|p| filter.matches(p)) {
                        tracing::info!("Change detected in {}", path.display());
                        handle.request();
                    }
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        })
        .map_err(to_error)?;

        watcher
            .watch(&root.path, RecursiveMode::Recursive)
            .map_err(to_error)?;
        tracing::debug!("Watching {} ({:?})", root.path.display(), root.filter);
        watchers.push(watcher);
    }

    Ok(SiteWatcher { watchers })
}
