//! Storage backends for the Warden moderation engine.
//!
//! The engine treats persistence as a key-value contract. This crate ships an
//! in-memory implementation (optionally snapshotted to JSON) and blocklist
//! sources backed by memory or a TOML rule file.

#![warn(missing_docs)]

mod memory;
mod rule_file;

pub use memory::{InMemoryBlocklistSource, InMemoryStore, StoreSnapshot};
pub use rule_file::{RuleEntry, RuleFile, TomlBlocklistSource};
