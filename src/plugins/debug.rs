//! Debug plugin: logs each line and never acts.

use tracing::debug;

use crate::action::Action;
use crate::context::Context;
use crate::error::Result;
use crate::line::Line;
use crate::plugins::Plugin;

/// Logs every line it sees
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugPlugin;

impl DebugPlugin {
    /// Configuration name
    pub const NAME: &'static str = "debug";
}

#[async_trait::async_trait]
impl Plugin for DebugPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn invoke(&self, line: &Line, _ctx: &Context) -> Result<Action> {
        debug!(
            user = %line.user,
            channel = %line.channel,
            command = %line.command,
            content = %line.content,
            "Line received"
        );
        Ok(Action::NoOp)
    }
}
