//! Development server command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use kiln_build::{BuildOptions, SiteBuilder, SiteConfig};
use kiln_server::{dev_reload_snippet, DevServer, DevServerConfig, ReloadHub};

/// Run the dev server: build, watch, and serve with live reload.
pub async fn run(config_path: &Path, port: u16, open: bool, options: BuildOptions) -> Result<()> {
    let config = SiteConfig::load(config_path)?;
    let hub = ReloadHub::new();

    let server = DevServer::new(
        DevServerConfig {
            output_dir: config.output_dir.clone(),
            port,
            open,
            ..Default::default()
        },
        hub.clone(),
    );

    let options = BuildOptions {
        dev_reload: Some(dev_reload_snippet()),
        ..options
    };
    let _session = super::start_watching(SiteBuilder::new(config), options, Arc::new(hub)).await?;

    tokio::select! {
        result = server.start() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
