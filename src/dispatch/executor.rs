//! Action executor
//!
//! The [`Executor`] is the single consumer of plugin actions. It performs
//! each side effect once, in arrival order, and keeps going when one fails.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::action::{Action, PluginAction};
use crate::context::Context;

/// Counters reported when the executor stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorReport {
    /// Documents accepted by the index store
    pub stored: u64,
    /// Responses pushed onto the response key
    pub responded: u64,
    /// Actions with nothing to do
    pub skipped: u64,
    /// Side effects that failed
    pub failed: u64,
}

impl ExecutorReport {
    /// Total number of actions consumed
    pub fn total(&self) -> u64 {
        self.stored + self.responded + self.skipped + self.failed
    }
}

/// Performs the side effects described by plugin actions
#[derive(Debug)]
pub struct Executor {
    ctx: Context,
    actions: mpsc::Receiver<PluginAction>,
}

impl Executor {
    /// Create an executor consuming `actions`
    pub fn new(ctx: Context, actions: mpsc::Receiver<PluginAction>) -> Self {
        Self { ctx, actions }
    }

    /// Consume actions until every sender is gone and the channel is empty
    pub async fn run(mut self) -> ExecutorReport {
        info!("Executor started");
        let mut report = ExecutorReport::default();

        while let Some(produced) = self.actions.recv().await {
            self.execute(produced, &mut report).await;
        }

        info!(
            stored = report.stored,
            responded = report.responded,
            failed = report.failed,
            "Executor stopped"
        );
        report
    }

    async fn execute(&self, produced: PluginAction, report: &mut ExecutorReport) {
        let PluginAction { plugin, action } = produced;
        match action {
            Action::NoOp | Action::Remember(_) => {
                report.skipped += 1;
            }
            Action::Store(document) => match self.ctx.store().submit(document).await {
                Ok(response) => {
                    report.stored += 1;
                    debug!(
                        plugin = %plugin,
                        response = %String::from_utf8_lossy(&response),
                        "Document stored"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!(plugin = %plugin, error = %e, "Failed to store document");
                }
            },
            Action::Respond(message) => {
                let key = self.ctx.response_key();
                match self.ctx.queue().push(key, message).await {
                    Ok(()) => {
                        report.responded += 1;
                        debug!(plugin = %plugin, key = %key, "Response pushed");
                    }
                    Err(e) => {
                        report.failed += 1;
                        error!(plugin = %plugin, key = %key, error = %e, "Failed to push response");
                    }
                }
            }
        }
    }
}
