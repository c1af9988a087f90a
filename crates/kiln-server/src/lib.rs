//! Watch mode and development server for kiln.
//!
//! File changes feed a single-flight rebuild scheduler; finished builds are
//! announced to browsers over a WebSocket live-reload channel.

pub mod reload;
pub mod scheduler;
pub mod server;
pub mod watcher;

pub use reload::{dev_reload_snippet, ReloadHub, ReloadMessage};
pub use scheduler::{BuildNotifier, NoopNotifier, RebuildScheduler, SchedulerHandle};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{site_roots, watch_roots, SiteWatcher, WatchError, WatchFilter, WatchRoot};
