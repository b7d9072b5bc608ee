//! `purchase-vault` daemon entry point.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use core_runtime::config::{load_env_file, AppConfig, DOTENV_FILE};
use core_runtime::logging::init_logging;
use core_service::{bootstrap_desktop, CycleScheduler};
use tracing::{info, warn};

/// How long Ctrl-C waits for in-flight archives before exiting
const SHUTDOWN_GRACE: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging is not up yet; report the outcome once it is
    let env_file = load_env_file(Path::new(DOTENV_FILE));

    let config = AppConfig::from_env().context("failed to load configuration")?;
    init_logging(config.logging.clone()).context("failed to initialize logging")?;

    match env_file {
        Ok(true) => info!(path = DOTENV_FILE, "Loaded environment file"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Ignoring environment file"),
    }

    let schedule = config.schedule.clone();
    let timezone = config.timezone;

    let service = bootstrap_desktop(config)
        .await
        .context("failed to start core service")?;
    let scheduler = CycleScheduler::start(service, &schedule, timezone)
        .await
        .context("failed to start scheduler")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    scheduler.shutdown(SHUTDOWN_GRACE).await?;
    Ok(())
}
