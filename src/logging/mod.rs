// Logging module for structured logging using the tracing crate

use std::error::Error;

use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Initialize the tracing subscriber for structured logging
///
/// Installs a JSON formatter writing to stdout, filtered by `RUST_LOG`
/// (falling back to `info`). Pingora's own `log` output is not bridged.
///
/// # Errors
///
/// Returns an error if the filter directive is malformed or a global
/// subscriber has already been installed.
///
/// # Examples
///
/// ```
/// use kagami::logging::init_subscriber;
///
/// // A second initialization in the same process is an error, not a panic.
/// let _ = init_subscriber();
/// tracing::info!("gateway starting");
/// ```
pub fn init_subscriber() -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref())?;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_target(true)
        .try_init()
}

/// Build an EnvFilter from an optional directive string
fn build_filter(directive: Option<&str>) -> Result<EnvFilter, Box<dyn Error + Send + Sync>> {
    let directive = match directive {
        Some(d) if !d.trim().is_empty() => d,
        _ => DEFAULT_LOG_FILTER,
    };
    Ok(EnvFilter::try_new(directive)?)
}
