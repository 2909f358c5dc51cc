//! Narrow outbound interfaces of the Warden engine.
//!
//! The engine talks to three kinds of collaborators: the chat platform
//! ([`PlatformAdapter`]), the AI oracle ([`ModerationOracle`]) and persistence
//! (the store traits). Recording implementations for dry runs and tests live in
//! [`dry_run`].

#![warn(missing_docs)]

pub mod dry_run;
mod oracle;
mod platform;
mod store;

pub use oracle::ModerationOracle;
pub use platform::PlatformAdapter;
pub use store::{BlocklistSource, StarboardStore, ThreadStore, VerdictStore};
