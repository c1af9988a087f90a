//! Kiln CLI - incremental static site builder.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use kiln_build::BuildOptions;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Incremental static site builder")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to kiln.json config file
    #[arg(short, long, default_value = "kiln.json", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site
    Build {
        /// Keep rebuilding on changes
        #[arg(short, long)]
        watch: bool,

        #[command(flatten)]
        build: BuildFlags,
    },

    /// Build, watch and serve the site with live reload
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,

        #[command(flatten)]
        build: BuildFlags,
    },
}

#[derive(Args)]
struct BuildFlags {
    /// Empty the output directory before building
    #[arg(long)]
    clean: bool,

    /// Regenerate all image variants
    #[arg(long)]
    force_regenerate: bool,
}

impl BuildFlags {
    fn options(&self) -> BuildOptions {
        BuildOptions {
            clean: self.clean,
            force_regenerate: self.force_regenerate,
            dev_reload: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Build { watch, build } => {
            commands::build::run(&cli.config, watch, build.options()).await?;
        }
        Commands::Serve {
            port,
            no_open,
            build,
        } => {
            commands::serve::run(&cli.config, port, !no_open, build.options()).await?;
        }
    }

    Ok(())
}
