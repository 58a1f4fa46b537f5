//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for the bot process. The level comes from
//! `--log`, then `core.log_level`, and `RUST_LOG` overrides both. Debug
//! builds print pretty lines, release builds emit JSON with the current span.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with the given log level from config.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter > default "info".
/// Only the first call installs a subscriber; later calls are no-ops.
pub fn init_telemetry_with_level(log_level: &str) {
    let default_filter = format!(
        "{},dozio_engine={},sqlx=warn",
        log_level, log_level
    );

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    }
}

/// Initialize the tracing subscriber with default settings.
///
/// Used when the config could not be loaded.
pub fn init_telemetry() {
    init_telemetry_with_level("info");
}
