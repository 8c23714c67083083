//! Actions produced by plugins
//!
//! An [`Action`] is plain data. Performing the side effect it describes is
//! the executor's job; plugins never touch the outside world themselves.

use bytes::Bytes;

/// Effect requested by a plugin for one line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Action {
    /// Nothing to do
    #[default]
    NoOp,
    /// Submit the payload to the index store
    Store(Bytes),
    /// Push the payload onto the outbound response queue
    Respond(Bytes),
    /// Reserved for state-persisting plugins; executed as a no-op
    Remember(Bytes),
}

impl Action {
    /// Short tag used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Action::NoOp => "noop",
            Action::Store(_) => "store",
            Action::Respond(_) => "respond",
            Action::Remember(_) => "remember",
        }
    }

    /// True for actions the executor has nothing to do for
    pub fn is_noop(&self) -> bool {
        matches!(self, Action::NoOp | Action::Remember(_))
    }

    /// The payload carried by the action, if any
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Action::NoOp => None,
            Action::Store(p) | Action::Respond(p) | Action::Remember(p) => Some(p),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.payload() {
            Some(payload) => write!(
                f,
                "{}({})",
                self.kind(),
                String::from_utf8_lossy(payload)
            ),
            None => f.write_str(self.kind()),
        }
    }
}

/// An action tagged with the plugin that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginAction {
    /// Name of the producing plugin
    pub plugin: String,
    /// The requested effect
    pub action: Action,
}
