//! Site build command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use kiln_build::{BuildOptions, SiteBuilder, SiteConfig};
use kiln_server::NoopNotifier;

/// Run the build command.
pub async fn run(config_path: &Path, watch: bool, options: BuildOptions) -> Result<()> {
    let config = SiteConfig::load(config_path)?;
    let builder = SiteBuilder::new(config);

    if watch {
        let _session = super::start_watching(builder, options, Arc::new(NoopNotifier)).await?;
        tracing::info!("Press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
        return Ok(());
    }

    tracing::info!("Building site...");
    let report = builder.build(options).await?;

    tracing::info!("Output: {}", report.output_dir.display());

    Ok(())
}
