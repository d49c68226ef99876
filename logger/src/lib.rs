//! Logging facade shared by every Arkona subsystem.
//!
//! Code never talks to `tracing` directly; it goes through the re-exported
//! macros so that the subscriber setup stays in one place.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

pub use tracing::{self, debug, error, info, instrument, span, trace, warn, Instrument};

/// Default log level used when the configuration does not override it.
pub const DEFAULT_LEVEL: Level = Level::Info;

/// Severity threshold for emitted records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct Configuration {
    /// Severity threshold.
    pub level: Level,
    /// Emit machine-readable JSON records instead of the human format.
    pub json: bool,
}

/// Failure to install the global subscriber.
#[derive(Debug, thiserror::Error)]
#[error("Failed to set logger: {0}")]
pub struct InitError(#[from] tracing_subscriber::util::TryInitError);

/// Install the global subscriber described by `configuration`.
///
/// Must be called at most once per process; subsequent calls error.
///
/// # Errors
/// If a global subscriber is already installed.
pub fn init(configuration: &Configuration) -> Result<(), InitError> {
    use tracing_subscriber::util::SubscriberInitExt as _;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(configuration.level.as_filter_str()));

    if configuration.json {
        fmt()
            .json()
            .with_env_filter(filter)
            .finish()
            .try_init()
            .map_err(Into::into)
    } else {
        fmt().with_env_filter(filter).finish().try_init().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_errors() {
        let configuration = Configuration::default();
        init(&configuration).expect("Valid");
        assert!(init(&configuration).is_err());
    }

    #[test]
    fn level_round_trips_through_serde() {
        let level: Level = serde_json::from_str("\"WARN\"").expect("Valid");
        assert_eq!(level, Level::Warn);
    }
}
