//! Logging bootstrap.
//!
//! Installs a `tracing` fmt subscriber writing to stderr, so stdout stays clean
//! for command output and `--json` results. The filter comes from `PODLINE_LOG`
//! when set (full `EnvFilter` syntax, e.g. `podline::engine=debug`), otherwise
//! from the configured level.
//!
//! Initialization happens at most once per process; later calls are no-ops.

use crate::error::{PodError, Result};
use once_cell::sync::OnceCell;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const LOG_ENV: &str = "PODLINE_LOG";

static INITIALIZED: OnceCell<&'static str> = OnceCell::new();

/// Install the global subscriber with `level` as the fallback filter.
pub fn init(level: &str) -> Result<()> {
    let level = normalize_level(level)?;
    INITIALIZED
        .get_or_try_init(|| -> Result<&'static str> {
            let filter = EnvFilter::builder()
                .with_env_var(LOG_ENV)
                .try_from_env()
                .or_else(|_| EnvFilter::try_new(level))
                .map_err(|e| PodError::Settings(format!("invalid log filter: {}", e)))?;

            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false),
                )
                .with(filter)
                .try_init()
                .map_err(|e| PodError::Settings(format!("cannot install logger: {}", e)))?;
            Ok(level)
        })
        .map(|_| ())
}

/// The level `init` settled on, if it ran.
pub fn active_level() -> Option<&'static str> {
    INITIALIZED.get().copied()
}

pub fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        other => Err(PodError::Settings(format!(
            "unsupported log level `{}`; expected trace|debug|info|warn|error|off",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level(" INFO ").unwrap(), "info");
        assert_eq!(normalize_level("warning").unwrap(), "warn");
        assert!(matches!(
            normalize_level("verbose"),
            Err(PodError::Settings(_))
        ));
    }

    #[test]
    fn test_init_is_idempotent() {
        init("warn").unwrap();
        init("debug").unwrap();
        assert_eq!(active_level(), Some("warn"));
    }
}
