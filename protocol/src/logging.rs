//! # Structured Logging
//!
//! The contracts and the ledger only emit `tracing` events with structured
//! fields (`vault`, `account`, `locked_value`, ...). They never install a
//! subscriber. A host process or test harness that wants the output calls
//! [`try_init_logging`].
//!
//! `RUST_LOG` overrides the default filter, e.g.
//! `RUST_LOG=lockvault_contracts=debug,lockvault_protocol=trace`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines with source locations.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs the global subscriber, or reports that one already exists.
///
/// Integration tests share one process, so each test calls this and
/// ignores the error.
pub fn try_init_logging(
    default_level: &str,
    format: LogFormat,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_file(true).with_line_number(true))
            .try_init()?,
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).try_init()?,
    }

    tracing::debug!(?format, "lockvault logging installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_reports_error() {
        let first = try_init_logging("warn", LogFormat::Json);
        let second = try_init_logging("warn", LogFormat::Pretty);
        assert!(first.is_ok() || second.is_err());
        assert!(second.is_err());
    }
}
