//! Command-line interface definition for botbot-plugins
//!
//! The engine is configured through its config file and environment; the
//! command line only adjusts logging. The file itself is chosen with
//! `BOTBOT_CONFIG`.

use clap::Parser;

/// botbot-plugins - route chat-line events through plugins
///
/// Pops chat lines from the ingest queue, offers each one to every enabled
/// plugin and executes the actions they return.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "botbot-plugins")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level implied by the verbosity flag, if any
    pub fn verbosity_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
