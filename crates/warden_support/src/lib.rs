//! Support thread resolver of the Warden engine.
//!
//! Tracks help threads through Open, AiSuggested, MarkedSolved,
//! MarkedUnsolved and Closed. The opening message asks the oracle for a
//! suggestion; solve and unsolve markers are honoured from the thread owner
//! and moderators only.

#![warn(missing_docs)]

mod config;
mod machine;
mod resolver;

pub use config::SupportConfig;
pub use machine::{ThreadInput, transition};
pub use resolver::{ThreadOutcome, ThreadResolver};
