//! Plugin worker
//!
//! Each enabled plugin gets its own [`PluginWorker`] task reading from a
//! private mailbox. Lines are handled one at a time in the order the
//! listener popped them, and every invocation yields exactly one action.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Instrument};

use crate::action::{Action, PluginAction};
use crate::context::Context;
use crate::line::Line;
use crate::plugins::Plugin;

/// Runs one plugin over its mailbox
pub struct PluginWorker {
    plugin: Arc<dyn Plugin>,
    ctx: Context,
    inbox: mpsc::Receiver<Arc<Line>>,
    actions: mpsc::Sender<PluginAction>,
}

impl PluginWorker {
    /// Create a worker reading `inbox` and reporting to `actions`
    pub fn new(
        plugin: Arc<dyn Plugin>,
        ctx: Context,
        inbox: mpsc::Receiver<Arc<Line>>,
        actions: mpsc::Sender<PluginAction>,
    ) -> Self {
        Self {
            plugin,
            ctx,
            inbox,
            actions,
        }
    }

    /// Handle lines until the mailbox is closed and empty.
    ///
    /// The mailbox closes when the listener stops, so everything delivered
    /// before shutdown is still handled. Returns the number of lines seen.
    pub async fn run(mut self) -> u64 {
        let name = self.plugin.name().to_string();
        let span = tracing::info_span!("plugin", plugin = %name);
        async move {
            info!("Plugin worker started");
            let mut handled = 0;

            while let Some(line) = self.inbox.recv().await {
                handled += 1;
                let action = self.invoke(&line).await;
                debug!(action = action.kind(), "Plugin produced action");

                let produced = PluginAction {
                    plugin: name.clone(),
                    action,
                };
                if self.actions.send(produced).await.is_err() {
                    error!("Executor has stopped; discarding remaining lines");
                    break;
                }
            }

            info!(handled, "Plugin worker stopped");
            handled
        }
        .instrument(span)
        .await
    }

    /// Invoke the plugin, turning errors and panics into [`Action::NoOp`]
    async fn invoke(&self, line: &Line) -> Action {
        let call = AssertUnwindSafe(self.plugin.invoke(line, &self.ctx)).catch_unwind();
        match call.await {
            Ok(Ok(action)) => action,
            Ok(Err(e)) => {
                warn!(error = %e, "Plugin failed; treating as no-op");
                Action::NoOp
            }
            Err(_) => {
                error!("Plugin panicked; treating as no-op");
                Action::NoOp
            }
        }
    }
}
