//! botbot-plugins - Plugin dispatch engine for the botbot chat bot
//!
//! This library pops chat lines from a queue, hands every line to each
//! enabled plugin and performs the actions the plugins request: indexing
//! the line in Elasticsearch or pushing a reply onto the response queue.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `dispatch`: Listener, plugin workers, executor and lifecycle
//! - `plugins`: The plugin trait and the built-in plugins
//! - `queue`: Queue abstraction with Redis and in-memory backends
//! - `storage`: Index store abstraction and the Elasticsearch client
//! - `line` / `action`: The data flowing through the engine
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use botbot_plugins::{Config, Lifecycle};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/botbot.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let lifecycle = Lifecycle::from_config(&config).await?;
//!     let report = lifecycle.run_until_signal().await;
//!     assert!(report.clean);
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod line;
pub mod logging;
pub mod plugins;
pub mod queue;
pub mod storage;

// Re-export commonly used types
pub use action::{Action, PluginAction};
pub use config::Config;
pub use context::Context;
pub use dispatch::{DrainReport, Lifecycle, LifecycleState};
pub use error::{BotbotError, Result};
pub use line::Line;
pub use plugins::Plugin;

#[cfg(test)]
pub mod test_utils;
