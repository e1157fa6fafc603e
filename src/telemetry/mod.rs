//! Structured logging setup.

use tracing_subscriber::{fmt, prelude::*, util::TryInitError, EnvFilter};

/// Used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info,waypoint=info,tower_http=info,axum=info";

/// Install the global subscriber: `RUST_LOG` filter plus a fmt layer with targets.
///
/// e.g. `RUST_LOG=debug,waypoint=trace,tower_http=info`. Fails if a global
/// subscriber is already set.
pub fn init() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
}
