use anyhow::Result;
use std::env;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. `LOG_LEVEL` sets the baseline level,
/// `RUST_LOG` directives refine it. stdout stays reserved for the report.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    let log_level = env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => default_level,
        })
        .unwrap_or(default_level);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}
