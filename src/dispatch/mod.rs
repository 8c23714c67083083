//! Plugin dispatch engine
//!
//! The engine is four kinds of task talking only through channels:
//!
//! ```text
//! queue --pop--> Listener --Arc<Line>--> PluginWorker (one per plugin)
//!                                              |
//!                                        PluginAction
//!                                              v
//!                                          Executor --> index store / response queue
//! ```
//!
//! - [`listener`]: pops raw events, decodes them and offers every line to
//!   every plugin mailbox.
//! - [`worker`]: runs one plugin over its mailbox and forwards each action.
//! - [`executor`]: performs the side effect each action describes.
//! - [`lifecycle`]: starts the tasks, turns SIGINT/SIGTERM into the shutdown
//!   token and waits for the drain to finish.
//!
//! Shutdown cascades through channel closure. Once the token fires the
//! listener stops popping and drops its mailbox senders; each worker
//! finishes the lines already delivered to it and drops its action sender;
//! the executor stops when the last sender is gone and the channel is
//! empty. Nothing already popped is lost along the way.

pub mod executor;
pub mod lifecycle;
pub mod listener;
pub mod worker;

pub use executor::{Executor, ExecutorReport};
pub use lifecycle::{DrainReport, Lifecycle, LifecycleState};
pub use listener::{Listener, ListenerReport, Mailbox};
pub use worker::PluginWorker;
