//! Plugins
//!
//! A [`Plugin`] looks at one [`Line`] and decides on an [`Action`]. Plugins
//! only produce data; the executor performs whatever effect the action
//! describes. Each enabled plugin runs in its own worker, so a plugin may
//! keep private state behind interior mutability without coordinating with
//! the others.
//!
//! Built-in plugins:
//!
//! - [`ping::PingPlugin`] -- answers `<botnick>: ping`.
//! - [`store::StorePlugin`] -- stores every user message.
//! - [`debug::DebugPlugin`] -- logs every line.

pub mod debug;
pub mod ping;
pub mod store;

use std::sync::Arc;

use crate::action::Action;
use crate::context::Context;
use crate::error::{BotbotError, Result};
use crate::line::Line;

pub use debug::DebugPlugin;
pub use ping::PingPlugin;
pub use store::StorePlugin;

/// Handler turning a line into at most one action.
///
/// Implementations must return promptly: a plugin that blocks stalls
/// delivery of later lines to every plugin.
///
/// # Examples
///
/// ```
/// use botbot_plugins::action::Action;
/// use botbot_plugins::context::Context;
/// use botbot_plugins::line::Line;
/// use botbot_plugins::plugins::Plugin;
///
/// struct Shout;
///
/// #[async_trait::async_trait]
/// impl Plugin for Shout {
///     fn name(&self) -> &str {
///         "shout"
///     }
///
///     async fn invoke(&self, line: &Line, _ctx: &Context) -> anyhow::Result<Action> {
///         Ok(Action::Respond(line.content.to_uppercase().into()))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in configuration and logs
    fn name(&self) -> &str;

    /// Decide what to do about `line`.
    ///
    /// # Errors
    ///
    /// An error is logged by the worker and treated as [`Action::NoOp`].
    async fn invoke(&self, line: &Line, ctx: &Context) -> Result<Action>;
}

/// Names of the built-in plugins
pub const BUILTIN_PLUGINS: [&str; 3] = [PingPlugin::NAME, StorePlugin::NAME, DebugPlugin::NAME];

/// Instantiate the built-in plugins named in `names`, in order.
///
/// # Errors
///
/// Returns `BotbotError::Config` for an unknown or repeated name.
pub fn build_plugins(names: &[String]) -> Result<Vec<Arc<dyn Plugin>>> {
    let mut plugins: Vec<Arc<dyn Plugin>> = Vec::with_capacity(names.len());
    for name in names {
        if plugins.iter().any(|p| p.name() == name) {
            return Err(BotbotError::Config(format!("plugin '{}' listed twice", name)).into());
        }
        let plugin: Arc<dyn Plugin> = match name.as_str() {
            PingPlugin::NAME => Arc::new(PingPlugin),
            StorePlugin::NAME => Arc::new(StorePlugin),
            DebugPlugin::NAME => Arc::new(DebugPlugin),
            other => {
                return Err(BotbotError::Config(format!(
                    "Unknown plugin: {}. Must be one of: {}",
                    other,
                    BUILTIN_PLUGINS.join(", ")
                ))
                .into())
            }
        };
        plugins.push(plugin);
    }
    Ok(plugins)
}
