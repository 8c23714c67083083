//! Error types for botbot-plugins
//!
//! This module defines the error taxonomy used throughout the dispatch
//! engine, using `thiserror` for ergonomic error handling.
//!
//! Errors fall into three classes:
//!
//! - **Transient I/O** (`Queue`, `Storage`, `Http`): logged, the operation is
//!   skipped and the owning loop continues.
//! - **Decode** (`Decode`, `Serialization`): logged, the event is dropped.
//! - **Fatal startup** (`Config`, `Startup`): aborts the process before the
//!   engine enters the running state.

use thiserror::Error;

/// Main error type for botbot-plugins operations
#[derive(Error, Debug)]
pub enum BotbotError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required collaborators could not be constructed
    #[error("Startup error: {0}")]
    Startup(String),

    /// Queue client errors (connection, protocol, unexpected replies)
    #[error("Queue error: {0}")]
    Queue(String),

    /// A queue payload could not be decoded into a line
    #[error("Decode error: {0}")]
    Decode(String),

    /// Index store errors (non-success status, unreadable response)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A plugin failed while handling a line
    #[error("Plugin '{plugin}' failed: {message}")]
    Plugin {
        /// Name of the failing plugin
        plugin: String,
        /// What went wrong
        message: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BotbotError {
    /// Returns true for errors that must abort the process before it starts
    /// consuming the queue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotbotError::Config(_) | BotbotError::Startup(_))
    }
}

/// Result type alias for botbot-plugins operations
///
/// Uses `anyhow::Error` so call sites can attach context while still
/// downcasting to [`BotbotError`] where the class of failure matters.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = BotbotError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_queue_error_display() {
        let error = BotbotError::Queue("connection refused".to_string());
        assert_eq!(error.to_string(), "Queue error: connection refused");
    }

    #[test]
    fn test_decode_error_display() {
        let error = BotbotError::Decode("expected a JSON object".to_string());
        assert_eq!(error.to_string(), "Decode error: expected a JSON object");
    }

    #[test]
    fn test_plugin_error_display() {
        let error = BotbotError::Plugin {
            plugin: "ping".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "Plugin 'ping' failed: boom");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(BotbotError::Config("x".to_string()).is_fatal());
        assert!(BotbotError::Startup("x".to_string()).is_fatal());
        assert!(!BotbotError::Queue("x".to_string()).is_fatal());
        assert!(!BotbotError::Storage("x".to_string()).is_fatal());
        assert!(!BotbotError::Decode("x".to_string()).is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: BotbotError = io_error.into();
        assert!(matches!(error, BotbotError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: BotbotError = json_error.into();
        assert!(matches!(error, BotbotError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: BotbotError = yaml_error.into();
        assert!(matches!(error, BotbotError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BotbotError>();
    }
}
