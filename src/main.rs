//! Picture-in-picture compositor - Main Entry Point
//!
//! Loads the configuration, builds the two-source graph on the simulated
//! media framework and plays it until end-of-stream or the first error.
//!
//! Exit status: `0` on end-of-stream, `1` on a runtime error, `2` when the
//! configuration or the graph cannot be set up.
//!
//! Library errors are wrapped in `CompositorError` with context and reported
//! through `anyhow` at this edge.

use std::sync::Arc;

use pip_compositor::{
    config::{self, PipConfig},
    error::ResultExt,
    framework::SimFramework,
    pipeline::{PipelineBuilder, EXIT_BUILD_FAILURE},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pip_compositor=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            EXIT_BUILD_FAILURE
        }
    };
    std::process::exit(code);
}

fn run() -> anyhow::Result<i32> {
    let arg = std::env::args().nth(1);
    let config = match config::resolve_config_path(arg.as_deref()) {
        Some(path) => {
            tracing::info!("Loading configuration from {:?}", path);
            PipConfig::load(&path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?
        }
        None => {
            tracing::info!("No configuration file found, using defaults");
            PipConfig::default()
        }
    };
    config.validate().context("Invalid configuration")?;

    tracing::info!("Main source: {}", config.main.uri);
    tracing::info!("PiP source: {}", config.pip.uri);

    let framework = Arc::new(SimFramework::new());
    let (pipeline, _node_ids) = PipelineBuilder::new(config)
        .build(framework)
        .context("Failed to build pipeline")?;

    let report = pipeline.run().context("Failed to run pipeline")?;
    for failure in &report.link_failures {
        tracing::warn!("Stream not linked: {}", failure);
    }
    tracing::info!(
        "Finished with {} links: {}",
        report.topology.links.len(),
        report.terminal
    );
    Ok(report.exit_code())
}
