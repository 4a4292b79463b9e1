//! Logging initialization for scanlytix-daemon.
//!
//! Configures `tracing-subscriber` based on the `[general]` section
//! of `ScanlytixConfig`. Supports JSON structured logging and
//! human-readable pretty format.
//!
//! Flattened records are written by `LogSink` as `info` events under the
//! `scanlytix::records` target. That target stays enabled at `info` whatever
//! the configured log level, so raising the level to `warn` silences
//! diagnostics without dropping output records.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use scanlytix_core::config::GeneralConfig;
use scanlytix_core::sink::RECORD_TARGET;

/// Build the filter directive string for a configured log level.
pub fn filter_directives(log_level: &str) -> String {
    format!("{log_level},{RECORD_TARGET}=info")
}

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
/// `RUST_LOG` takes precedence over the configured level when set.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines (default for production)
/// * `"pretty"` - Human-readable colored output (for development)
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let build_filter = || {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(filter_directives(&config.log_level)))
            .map_err(|e| anyhow::anyhow!("invalid log filter '{}': {}", config.log_level, e))
    };

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(build_filter()?)
                .with(tracing_subscriber::fmt::layer().json().with_target(true))
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(build_filter()?)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)
                })?;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                config.log_format
            ));
        }
    }

    Ok(())
}
