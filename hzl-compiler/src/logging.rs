//! Tracing subscriber setup
//!
//! The subscriber is installed before configuration is read, so that
//! configuration warnings are not lost. It starts from `RUST_LOG` (or
//! [`DEFAULT_LEVEL`]); the configured `[logging] level` is applied afterwards
//! unless `RUST_LOG` was set.

use hzl_common::{Error, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Level used until the configuration has been loaded
pub const DEFAULT_LEVEL: &str = "info";

/// Handle to swap the active filter once the configured level is known
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

/// Install the global subscriber, writing to stderr
pub fn init() -> LogLevelHandle {
    let (initial, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(DEFAULT_LEVEL), false),
    };
    let (filter, handle) = reload::Layer::new(initial);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    LogLevelHandle { handle, from_env }
}

impl LogLevelHandle {
    /// Switch to the configured level; `RUST_LOG` keeps precedence
    pub fn apply_configured(&self, level: &str) -> Result<()> {
        if self.from_env {
            return Ok(());
        }
        let filter = EnvFilter::try_new(level)
            .map_err(|e| Error::Config(format!("Invalid logging level '{}': {}", level, e)))?;
        self.handle
            .reload(filter)
            .map_err(|e| Error::Config(format!("Cannot apply logging level '{}': {}", level, e)))
    }

    /// Active filter directives
    pub fn current(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_handle(from_env: bool) -> (Box<dyn tracing::Subscriber + Send + Sync>, LogLevelHandle) {
        let (filter, handle) = reload::Layer::new(EnvFilter::new(DEFAULT_LEVEL));
        let subscriber = Registry::default().with(filter);
        (Box::new(subscriber), LogLevelHandle { handle, from_env })
    }

    #[test]
    fn test_configured_level_applied() {
        let (_subscriber, levels) = local_handle(false);

        levels.apply_configured("debug").unwrap();
        let current = levels.current().unwrap();
        assert!(current.contains("debug"), "{}", current);
    }

    #[test]
    fn test_env_filter_wins_over_configured_level() {
        let (_subscriber, levels) = local_handle(true);

        levels.apply_configured("trace").unwrap();
        let current = levels.current().unwrap();
        assert!(current.contains(DEFAULT_LEVEL), "{}", current);
    }

    #[test]
    fn test_invalid_level_is_config_error() {
        let (_subscriber, levels) = local_handle(false);
        assert!(matches!(
            levels.apply_configured("loud=[nonsense"),
            Err(Error::Config(_))
        ));
    }
}
