//! Engine lifecycle
//!
//! [`Lifecycle`] wires the listener, one worker per plugin and the executor
//! together, runs them until the shutdown token fires, then waits up to the
//! grace period for the pipeline to drain. Progress is published as a
//! [`LifecycleState`] on a watch channel.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::config::{Config, DispatchConfig};
use crate::context::Context;
use crate::dispatch::{Executor, ExecutorReport, Listener, ListenerReport, Mailbox, PluginWorker};
use crate::error::Result;
use crate::plugins::{build_plugins, Plugin};

/// Phase of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Tasks are being spawned
    Starting,
    /// Lines are being popped and dispatched
    Running,
    /// Shutdown requested; in-flight work is finishing
    Draining,
    /// Every task has finished or been aborted
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// True when every task finished within the grace period
    pub clean: bool,
    /// Listener counters, absent if it was aborted
    pub listener: Option<ListenerReport>,
    /// Executor counters, absent if it was aborted
    pub executor: Option<ExecutorReport>,
    /// Lines handled per plugin, for workers that finished
    pub handled: Vec<(String, u64)>,
}

/// Owns the engine's tasks from startup to drain
pub struct Lifecycle {
    ctx: Context,
    plugins: Vec<Arc<dyn Plugin>>,
    config: DispatchConfig,
    shutdown: CancellationToken,
    state: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    /// Create a lifecycle for `plugins` sharing `ctx`
    pub fn new(ctx: Context, plugins: Vec<Arc<dyn Plugin>>, config: DispatchConfig) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            ctx,
            plugins,
            config,
            shutdown: CancellationToken::new(),
            state,
        }
    }

    /// Build the collaborators and plugins described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Config` for an unknown plugin name and
    /// `BotbotError::Startup` when the queue or index store is unusable.
    /// Both are fatal; the engine never starts with a partial setup.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let plugins = build_plugins(&config.dispatch.plugins)?;
        let ctx = Context::from_config(config).await?;
        Ok(Self::new(ctx, plugins, config.dispatch.clone()))
    }

    /// Token that starts the drain when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Watch the engine's state
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn transition(&self, next: LifecycleState) {
        info!(state = %next, "Lifecycle transition");
        self.state.send_replace(next);
    }

    /// Run until the shutdown token is cancelled, then drain.
    ///
    /// Tasks still running when the grace period ends are aborted and the
    /// report is marked unclean.
    pub async fn run(self) -> DrainReport {
        let tracker = TaskTracker::new();
        let (action_tx, action_rx) = mpsc::channel(self.config.action_capacity.max(1));

        let mut mailboxes = Vec::with_capacity(self.plugins.len());
        let mut workers: Vec<(String, JoinHandle<u64>)> = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            let (tx, rx) = mpsc::channel(self.config.mailbox_capacity.max(1));
            let name = plugin.name().to_string();
            mailboxes.push(Mailbox::new(name.clone(), tx));
            let worker = PluginWorker::new(Arc::clone(plugin), self.ctx.clone(), rx, action_tx.clone());
            workers.push((name, tracker.spawn(worker.run())));
        }
        // The executor ends once every worker has dropped its clone.
        drop(action_tx);

        let executor = tracker.spawn(Executor::new(self.ctx.clone(), action_rx).run());
        let listener =
            tracker.spawn(Listener::new(self.ctx.clone(), mailboxes, self.shutdown.clone()).run());
        tracker.close();

        self.transition(LifecycleState::Running);

        tokio::select! {
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested, draining");
            }
            _ = tracker.wait() => {
                error!("Pipeline stopped without a shutdown request");
            }
        }
        self.transition(LifecycleState::Draining);

        let grace = self.config.grace_period();
        let clean = tokio::time::timeout(grace, tracker.wait()).await.is_ok();
        if !clean {
            warn!(
                grace_secs = grace.as_secs(),
                remaining = tracker.len(),
                "Grace period expired, aborting remaining tasks"
            );
            listener.abort();
            executor.abort();
            for (_, handle) in &workers {
                handle.abort();
            }
        }

        let mut handled = Vec::with_capacity(workers.len());
        for (name, handle) in workers {
            if let Ok(count) = handle.await {
                handled.push((name, count));
            }
        }
        let report = DrainReport {
            clean,
            listener: listener.await.ok(),
            executor: executor.await.ok(),
            handled,
        };

        self.transition(LifecycleState::Stopped);
        report
    }

    /// Run until SIGINT or SIGTERM, then drain
    pub async fn run_until_signal(self) -> DrainReport {
        let token = self.shutdown_token();
        let signals = tokio::spawn(async move {
            shutdown_signal().await;
            token.cancel();
        });
        let report = self.run().await;
        signals.abort();
        report
    }
}

/// Resolve on Ctrl+C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
