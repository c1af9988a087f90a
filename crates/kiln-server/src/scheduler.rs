//! Single-flight rebuild scheduling with trailing coalescing.
//!
//! Requests go into a one-slot channel drained by a single worker task. A
//! request made while the slot is full is absorbed, so any number of changes
//! during a build cause exactly one follow-up build.

use std::future::Future;
use std::sync::Arc;

use kiln_build::{BuildError, BuildOptions, BuildReport, SiteBuilder};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::task::JoinHandle;

/// Hook fired when the worker goes idle after one or more builds.
pub trait BuildNotifier: Send + Sync + 'static {
    fn build_finished(&self);
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl BuildNotifier for NoopNotifier {
    fn build_finished(&self) {}
}

/// Cloneable handle for requesting rebuilds.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Ask for a rebuild. Never blocks.
    ///
    /// Returns `false` if the request was absorbed by one already pending or
    /// the worker has stopped.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                tracing::debug!("Rebuild already pending");
                false
            }
            Err(TrySendError::Closed(())) => {
                tracing::warn!("Rebuild requested after scheduler stopped");
                false
            }
        }
    }
}

/// The rebuild worker.
pub struct RebuildScheduler;

impl RebuildScheduler {
    /// Spawn a worker running `build` for every accepted request.
    ///
    /// The worker stops once every handle is dropped.
    pub fn spawn<F, Fut>(
        build: F,
        notifier: Arc<dyn BuildNotifier>,
    ) -> (SchedulerHandle, JoinHandle<()>)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BuildReport, BuildError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let worker = tokio::spawn(run_worker(rx, build, notifier));
        (SchedulerHandle { tx }, worker)
    }

    /// Spawn a worker building `builder` with `options` on every request.
    pub fn for_site(
        builder: SiteBuilder,
        options: BuildOptions,
        notifier: Arc<dyn BuildNotifier>,
    ) -> (SchedulerHandle, JoinHandle<()>) {
        Self::spawn(
            move || {
                let builder = builder.clone();
                let options = options.clone();
                async move { builder.build(options).await }
            },
            notifier,
        )
    }
}

async fn run_worker<F, Fut>(
    mut rx: mpsc::Receiver<()>,
    build: F,
    notifier: Arc<dyn BuildNotifier>,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<BuildReport, BuildError>>,
{
    while rx.recv().await.is_some() {
        loop {
            if let Err(e) = build().await {
                tracing::error!("Build failed: {}", e);
            }

            match rx.try_recv() {
                Ok(()) => {
                    tracing::info!("Changes arrived during build, rebuilding");
                }
                Err(TryRecvError::Empty) => {
                    notifier.build_finished();
                    break;
                }
                Err(TryRecvError::Disconnected) => return,
            }
        }
    }
}
