//! botbot-plugins - Plugin dispatch engine
//!
#![doc = "botbot-plugins - Plugin dispatch engine"]
#![doc = "Main entry point for the botbot plugin runner."]

use anyhow::Result;

use botbot_plugins::cli::Cli;
use botbot_plugins::config::Config;
use botbot_plugins::logging::{init_logging, with_bootstrap_logging};
use botbot_plugins::Lifecycle;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load and validate configuration; warnings go to stderr until the
    // configured subscriber is installed
    let config_path = Config::path_from_env();
    let config = with_bootstrap_logging(|| {
        let config = Config::load(&config_path, &cli)?;
        config.validate()?;
        Ok::<_, anyhow::Error>(config)
    })?;

    init_logging(&config.logging)?;
    tracing::info!(config = %config_path, "Starting botbot-plugins");

    let lifecycle = match Lifecycle::from_config(&config).await {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e);
        }
    };

    let report = lifecycle.run_until_signal().await;
    if report.clean {
        tracing::info!(
            handled = ?report.handled,
            "Drained cleanly"
        );
    } else {
        tracing::warn!("Grace period expired before the pipeline drained; exiting anyway");
    }

    Ok(())
}
