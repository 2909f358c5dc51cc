//! Enforcement actions.

use serde::{Deserialize, Serialize};

/// Enforcement action, declared in increasing severity.
///
/// The derived ordering is the escalation order: a verdict only supersedes an
/// earlier one for the same message when its action compares greater.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    /// Nothing to do
    #[default]
    None,
    /// Post a warning to the author
    Warn,
    /// Delete the message
    Delete,
    /// Delete the message and time the member out
    Timeout,
    /// Delete the message and ban the member
    Ban,
}

impl Action {
    /// Whether the action results in platform calls.
    pub fn is_enforcement(&self) -> bool {
        !matches!(self, Action::None)
    }
}
