//! Queue listener
//!
//! The [`Listener`] is the only task that pops from the ingest queue. Each
//! decoded line is offered to every plugin mailbox before the next pop.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::context::Context;
use crate::line::Line;

/// Pause before polling again after a failed pop
const POP_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Sending half of one plugin's mailbox
#[derive(Debug, Clone)]
pub struct Mailbox {
    plugin: String,
    tx: mpsc::Sender<Arc<Line>>,
}

impl Mailbox {
    /// Wrap the sender feeding `plugin`'s worker
    pub fn new(plugin: impl Into<String>, tx: mpsc::Sender<Arc<Line>>) -> Self {
        Self {
            plugin: plugin.into(),
            tx,
        }
    }

    /// Name of the plugin behind this mailbox
    pub fn plugin(&self) -> &str {
        &self.plugin
    }
}

/// Counters reported when the listener stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerReport {
    /// Lines offered to the plugins
    pub dispatched: u64,
    /// Payloads dropped because they did not decode
    pub malformed: u64,
    /// Pops that failed with a queue error
    pub pop_errors: u64,
}

/// Pops lines from the ingest key and fans them out to plugin mailboxes
#[derive(Debug)]
pub struct Listener {
    ctx: Context,
    mailboxes: Vec<Mailbox>,
    shutdown: CancellationToken,
}

impl Listener {
    /// Create a listener feeding `mailboxes` until `shutdown` fires
    pub fn new(ctx: Context, mailboxes: Vec<Mailbox>, shutdown: CancellationToken) -> Self {
        Self {
            ctx,
            mailboxes,
            shutdown,
        }
    }

    /// Run until the shutdown token is cancelled.
    ///
    /// The token is checked before every pop. A pop already in progress is
    /// allowed to finish (it is bounded by the pop timeout) because
    /// abandoning it could lose an item the queue has already handed over.
    /// Whatever it returns is still delivered. Dropping the listener at the
    /// end closes every mailbox.
    pub async fn run(self) -> ListenerReport {
        let keys = vec![self.ctx.ingest_key().to_string()];
        let timeout = self.ctx.pop_timeout();
        let mut report = ListenerReport::default();

        info!(
            key = %keys[0],
            plugins = self.mailboxes.len(),
            "Listener started"
        );

        while !self.shutdown.is_cancelled() {
            let popped = match self.ctx.queue().blocking_pop(&keys, timeout).await {
                Ok(Some(popped)) => popped,
                Ok(None) => {
                    trace!("No data within pop timeout, polling again");
                    continue;
                }
                Err(e) => {
                    report.pop_errors += 1;
                    warn!(error = %e, "Queue pop failed");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => {}
                        _ = tokio::time::sleep(POP_ERROR_BACKOFF) => {}
                    }
                    continue;
                }
            };

            let line = match Line::decode(popped.payload.clone()) {
                Ok(line) => Arc::new(line),
                Err(e) => {
                    report.malformed += 1;
                    warn!(key = %popped.key, error = %e, "Dropping undecodable payload");
                    debug!(raw = %String::from_utf8_lossy(&popped.payload), "Dropped payload");
                    continue;
                }
            };

            self.broadcast(line).await;
            report.dispatched += 1;
        }

        info!(
            dispatched = report.dispatched,
            malformed = report.malformed,
            "Listener stopped"
        );
        report
    }

    /// Offer `line` to every mailbox, waiting until each has accepted it.
    ///
    /// Sends proceed concurrently so a full mailbox only delays its own
    /// plugin's delivery, not the others'.
    async fn broadcast(&self, line: Arc<Line>) {
        let sends = self.mailboxes.iter().map(|mailbox| {
            let line = Arc::clone(&line);
            async move { (mailbox, mailbox.tx.send(line).await) }
        });

        for (mailbox, result) in join_all(sends).await {
            if result.is_err() {
                error!(plugin = %mailbox.plugin, "Plugin worker has stopped; line not delivered");
            }
        }
    }
}
