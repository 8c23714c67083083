//! Store plugin
//!
//! Every user message is stored verbatim; protocol events are skipped.

use crate::action::Action;
use crate::context::Context;
use crate::error::Result;
use crate::line::Line;
use crate::plugins::Plugin;

/// Sends user messages to the index store
#[derive(Debug, Default, Clone, Copy)]
pub struct StorePlugin;

impl StorePlugin {
    /// Configuration name
    pub const NAME: &'static str = "store";
}

#[async_trait::async_trait]
impl Plugin for StorePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn invoke(&self, line: &Line, _ctx: &Context) -> Result<Action> {
        if line.is_message() {
            Ok(Action::Store(line.raw().clone()))
        } else {
            Ok(Action::NoOp)
        }
    }
}
