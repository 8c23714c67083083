//! Configuration management for botbot-plugins
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Every address and name the engine talks to lives here and is handed to
//! the [`Context`](crate::context::Context) once at startup.

use crate::error::{BotbotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for botbot-plugins
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Queue used for ingesting lines and publishing responses
    #[serde(default)]
    pub queue: QueueConfig,

    /// Elasticsearch index store settings
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,

    /// Plugin dispatch settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue location: `redis://host:port` or `memory://`
    #[serde(default = "default_queue_url")]
    pub url: String,

    /// Key the listener pops incoming lines from
    #[serde(default = "default_ingest_key")]
    pub ingest_key: String,

    /// Key responses are pushed onto for the delivering bot
    #[serde(default = "default_response_key")]
    pub response_key: String,

    /// Bounded wait for a single pop, in seconds
    #[serde(default = "default_pop_timeout")]
    pub pop_timeout_secs: u64,
}

impl QueueConfig {
    /// Bounded wait for a single pop
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_secs(self.pop_timeout_secs)
    }
}

fn default_queue_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_ingest_key() -> String {
    "q".to_string()
}

fn default_response_key() -> String {
    "bot".to_string()
}

fn default_pop_timeout() -> u64 {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: default_queue_url(),
            ingest_key: default_ingest_key(),
            response_key: default_response_key(),
            pop_timeout_secs: default_pop_timeout(),
        }
    }
}

/// How documents submitted to the index store get their id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdPolicy {
    /// `POST /<index>/<type>`, Elasticsearch assigns the id
    #[default]
    Auto,
    /// `PUT /<index>/<type>/<fixed_id>`, every submission overwrites one document
    Fixed,
}

impl std::str::FromStr for IdPolicy {
    type Err = BotbotError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(IdPolicy::Auto),
            "fixed" => Ok(IdPolicy::Fixed),
            other => Err(BotbotError::Config(format!(
                "Invalid id policy: {}. Must be one of: auto, fixed",
                other
            ))),
        }
    }
}

/// Elasticsearch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// `host:port` of the Elasticsearch node
    #[serde(default = "default_es_addr")]
    pub addr: String,

    /// Index documents are written to
    #[serde(default = "default_es_index")]
    pub index: String,

    /// Document type segment of the URL
    #[serde(default = "default_es_type")]
    pub doc_type: String,

    /// Id assignment policy
    #[serde(default)]
    pub id_policy: IdPolicy,

    /// Id used when `id_policy` is `fixed`
    #[serde(default = "default_fixed_id")]
    pub fixed_id: String,

    /// Request timeout in seconds
    #[serde(default = "default_es_timeout")]
    pub timeout_secs: u64,
}

fn default_es_addr() -> String {
    "localhost:9200".to_string()
}

fn default_es_index() -> String {
    "botbot".to_string()
}

fn default_es_type() -> String {
    "line".to_string()
}

fn default_fixed_id() -> String {
    "1".to_string()
}

fn default_es_timeout() -> u64 {
    10
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            addr: default_es_addr(),
            index: default_es_index(),
            doc_type: default_es_type(),
            id_policy: IdPolicy::default(),
            fixed_id: default_fixed_id(),
            timeout_secs: default_es_timeout(),
        }
    }
}

/// Plugin dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Names of the plugins to run
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,

    /// Lines buffered per plugin mailbox
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Actions buffered ahead of the executor
    #[serde(default = "default_action_capacity")]
    pub action_capacity: usize,

    /// Time allowed for draining after a shutdown signal, in seconds
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
}

impl DispatchConfig {
    /// Time allowed for draining after a shutdown signal
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

fn default_plugins() -> Vec<String> {
    vec!["ping".to_string(), "store".to_string(), "debug".to_string()]
}

fn default_mailbox_capacity() -> usize {
    1
}

fn default_action_capacity() -> usize {
    64
}

fn default_grace_period() -> u64 {
    30
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            plugins: default_plugins(),
            mailbox_capacity: default_mailbox_capacity(),
            action_capacity: default_action_capacity(),
            grace_period_secs: default_grace_period(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, STDOUT only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "BOTBOT_CONFIG";

/// Config file used when `BOTBOT_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/botbot.yaml";

impl Config {
    /// Path of the config file: `BOTBOT_CONFIG`, else [`DEFAULT_CONFIG_PATH`]
    pub fn path_from_env() -> String {
        std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BotbotError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| BotbotError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("BOTBOT_QUEUE_URL") {
            self.queue.url = url;
        }
        if let Ok(key) = std::env::var("BOTBOT_INGEST_KEY") {
            self.queue.ingest_key = key;
        }
        if let Ok(key) = std::env::var("BOTBOT_RESPONSE_KEY") {
            self.queue.response_key = key;
        }
        if let Some(secs) = parse_env("BOTBOT_POP_TIMEOUT_SECS") {
            self.queue.pop_timeout_secs = secs;
        }

        if let Ok(addr) = std::env::var("BOTBOT_ES_ADDR") {
            self.elasticsearch.addr = addr;
        }
        if let Ok(index) = std::env::var("BOTBOT_ES_INDEX") {
            self.elasticsearch.index = index;
        }
        if let Ok(doc_type) = std::env::var("BOTBOT_ES_TYPE") {
            self.elasticsearch.doc_type = doc_type;
        }
        if let Some(policy) = parse_env("BOTBOT_ES_ID_POLICY") {
            self.elasticsearch.id_policy = policy;
        }

        if let Some(secs) = parse_env("BOTBOT_GRACE_PERIOD_SECS") {
            self.dispatch.grace_period_secs = secs;
        }

        if let Ok(level) = std::env::var("BOTBOT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = parse_env("BOTBOT_JSON_LOGS") {
            self.logging.json_format = json;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(level) = cli.verbosity_level() {
            self.logging.level = level.to_string();
        }
        if cli.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Config` describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.queue.ingest_key.is_empty() || self.queue.response_key.is_empty() {
            return Err(BotbotError::Config("queue keys cannot be empty".to_string()).into());
        }

        if self.queue.ingest_key == self.queue.response_key {
            return Err(BotbotError::Config(
                "queue.ingest_key and queue.response_key must differ".to_string(),
            )
            .into());
        }

        if self.queue.pop_timeout_secs == 0 {
            return Err(BotbotError::Config(
                "queue.pop_timeout_secs must be greater than 0".to_string(),
            )
            .into());
        }

        if self.elasticsearch.addr.is_empty()
            || self.elasticsearch.index.is_empty()
            || self.elasticsearch.doc_type.is_empty()
        {
            return Err(BotbotError::Config(
                "elasticsearch addr, index and doc_type must be set".to_string(),
            )
            .into());
        }

        if self.elasticsearch.id_policy == IdPolicy::Fixed && self.elasticsearch.fixed_id.is_empty()
        {
            return Err(BotbotError::Config(
                "elasticsearch.fixed_id is required when id_policy is fixed".to_string(),
            )
            .into());
        }

        if self.dispatch.plugins.is_empty() {
            return Err(
                BotbotError::Config("dispatch.plugins cannot be empty".to_string()).into(),
            );
        }

        if self.dispatch.mailbox_capacity == 0 || self.dispatch.action_capacity == 0 {
            return Err(BotbotError::Config(
                "dispatch capacities must be greater than 0".to_string(),
            )
            .into());
        }

        if self.dispatch.grace_period_secs <= self.queue.pop_timeout_secs {
            return Err(BotbotError::Config(format!(
                "dispatch.grace_period_secs ({}) must exceed queue.pop_timeout_secs ({})",
                self.dispatch.grace_period_secs, self.queue.pop_timeout_secs
            ))
            .into());
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={}", name, raw);
            None
        }
    }
}
