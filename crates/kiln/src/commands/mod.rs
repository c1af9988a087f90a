//! CLI subcommands.

use std::sync::Arc;

use anyhow::Result;
use kiln_build::{BuildOptions, SiteBuilder};
use kiln_server::{
    site_roots, watch_roots, BuildNotifier, RebuildScheduler, SchedulerHandle, SiteWatcher,
};

pub mod build;
pub mod serve;

/// Active watch mode. Dropping it stops watching.
pub struct WatchSession {
    _watcher: SiteWatcher,
    _handle: SchedulerHandle,
}

/// Run an initial build, then rebuild on every change.
///
/// Only the initial build honours `clean`. Build failures are logged and never
/// end the session.
pub async fn start_watching(
    builder: SiteBuilder,
    options: BuildOptions,
    notifier: Arc<dyn BuildNotifier>,
) -> Result<WatchSession> {
    if let Err(e) = builder.build(options.clone()).await {
        tracing::error!("Build failed: {}", e);
    }

    let roots = site_roots(builder.config());
    let rebuild_options = BuildOptions {
        clean: false,
        ..options
    };
    let (handle, _worker) = RebuildScheduler::for_site(builder, rebuild_options, notifier);
    let watcher = watch_roots(&roots, &handle)?;

    tracing::info!("Watching {} directories for changes", watcher.len());

    Ok(WatchSession {
        _watcher: watcher,
        _handle: handle,
    })
}
