use crate::pruner::PruneReport;
use crate::{CONSOLE_TARGET, ERROR_TARGET, RUN_TARGET};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Run log file name
pub const RUN_LOG_FILE: &str = "runs";

/// Initialize the logging system with console and file outputs
pub fn init(log_dir: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Create log directory if it doesn't exist
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    // Set up file appender with daily rotation
    let run_file = RollingFileAppender::new(Rotation::DAILY, log_dir, RUN_LOG_FILE);

    // Create a layer for console output (human-readable format)
    let console_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(true);

    // Create a layer for run logs (JSON format)
    let run_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_writer(run_file);

    // Default to INFO level if not specified, but keep the HTTP stack quiet
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("hyper=warn".parse().expect("static directive"))
            .add_directive("reqwest=warn".parse().expect("static directive"))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(run_layer)
        .try_init()?;

    info!("Logging system initialized");
    Ok(())
}

/// Log where the configuration came from
pub fn log_config_source(path: &Path) {
    if path.exists() {
        info!("Loaded configuration from {}", path.display());
    } else {
        warn!("No configuration file at {}, using defaults", path.display());
    }
}

/// Log the outcome of one community
pub fn log_community_summary(report: &PruneReport) {
    info!(
        target: RUN_TARGET,
        community = %report.community,
        original_count = report.original_count,
        pruned = report.pruned_count(),
        remaining = report.remaining(),
        removal_skips = report.removal_skips,
        event = "community_done",
        "Community processed"
    );
}

/// Log a fatal error that ends the run
pub fn log_fatal(error: &(dyn std::error::Error + 'static)) {
    error!(
        target: ERROR_TARGET,
        error = %error,
        "Run aborted"
    );
}

pub fn log_console(message: String) {
    info!(
        target: CONSOLE_TARGET,
        message = %message,
        event = "console",
    );
}
