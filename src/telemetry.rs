//! Logging setup for applications embedding the SDK.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global tracing subscriber with an env filter and a fmt layer.
///
/// `RUST_LOG` takes precedence; otherwise the SDK logs at `info`, or at
/// `debug` (including SQL statements) when `is_debug` is set. Returns `false`
/// if a global subscriber was already installed.
pub fn init(is_debug: bool) -> bool {
    let default_directive = if is_debug {
        "repository_sdk=debug,sqlx=debug"
    } else {
        "repository_sdk=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
