//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging with optional file output.
//! `RUST_LOG` takes precedence over the configured level.
//!
//! Configuration is loaded before the configured subscriber can exist, so
//! [`with_bootstrap_logging`] scopes a plain stderr subscriber around that
//! step to keep its warnings visible.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used before the configuration is known
const BOOTSTRAP_LEVEL: &str = "warn";

/// Run `f` with a temporary subscriber writing to stderr.
///
/// Used around config loading; `RUST_LOG` is honoured, otherwise only
/// warnings and errors are shown.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    tracing::subscriber::with_default(bootstrap_subscriber(std::io::stderr), f)
}

fn bootstrap_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_LEVEL));
    fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .finish()
}

/// Initialize logging based on configuration.
///
/// # Errors
///
/// Returns error if the level filter is invalid, the log file cannot be
/// opened, or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use botbot_plugins::config::LoggingConfig;
/// use botbot_plugins::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = filter_for(config)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let file = match &config.file_path {
        Some(path) => Some(Arc::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    if config.json_format {
        let stdout_layer = fmt::layer().json().with_current_span(true);
        let file_layer = file.map(|file| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(file)
        });
        registry.with(stdout_layer).with(file_layer).try_init()?;
    } else {
        let stdout_layer = fmt::layer().with_target(true).with_thread_ids(true);
        let file_layer = file.map(|file| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(file)
        });
        registry.with(stdout_layer).with(file_layer).try_init()?;
    }

    Ok(())
}

fn filter_for(config: &LoggingConfig) -> Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_bootstrap_subscriber_shows_config_load_warnings() {
        std::env::remove_var("RUST_LOG");
        std::env::set_var("BOTBOT_POP_TIMEOUT_SECS", "soon");
        let captured = Captured::default();
        let writer = captured.clone();

        let config = tracing::subscriber::with_default(
            bootstrap_subscriber(move || writer.clone()),
            || crate::config::Config::load("/nonexistent/botbot.yaml", &Default::default()),
        );
        std::env::remove_var("BOTBOT_POP_TIMEOUT_SECS");

        assert!(config.is_ok());
        let output = captured.text();
        assert!(output.contains("Config file not found"), "{}", output);
        assert!(output.contains("BOTBOT_POP_TIMEOUT_SECS"), "{}", output);
    }

    #[test]
    fn test_bootstrap_subscriber_hides_info() {
        let captured = Captured::default();
        let writer = captured.clone();
        tracing::subscriber::with_default(bootstrap_subscriber(move || writer.clone()), || {
            tracing::info!("routine detail");
        });
        if std::env::var("RUST_LOG").is_err() {
            assert!(!captured.text().contains("routine detail"));
        }
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json_format);
        assert_eq!(config.file_path, None);
    }

    #[test]
    fn test_filter_accepts_directives() {
        let config = LoggingConfig {
            level: "botbot_plugins=debug,warn".to_string(),
            json_format: false,
            file_path: Some(PathBuf::from("/tmp/botbot.log")),
        };
        assert!(filter_for(&config).is_ok());
    }
}
