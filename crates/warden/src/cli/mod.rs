//! Command-line interface.
//!
//! Argument structure and the handlers behind the `warden` binary.

mod replay;
mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use replay::{ReplayReport, handle_replay_command, replay_events, read_events};
pub use validate::{ValidationReport, handle_validate_command, validate_setup};

/// Warden moderation engine.
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Moderation, starboard and support-thread engine for chat communities")]
#[command(version)]
pub struct Cli {
    /// Configuration file; `WARDEN__SECTION__KEY` variables override it
    #[arg(short, long, global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the configuration and the blocklist rule file
    Validate {
        /// Rule file to check instead of `blocklist.path`
        #[arg(long)]
        blocklist: Option<PathBuf>,
    },

    /// Run recorded events against the dry-run platform and print the calls
    Replay {
        /// Newline-delimited JSON events
        events: PathBuf,

        /// Classifier score for messages without a scripted keyword
        #[arg(long, default_value_t = 0.0)]
        default_score: f32,

        /// Seconds to wait for queued enforcement after the last event
        #[arg(long, default_value_t = 10)]
        grace_secs: u64,
    },
}
