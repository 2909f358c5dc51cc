//! Support thread configuration.

use serde::{Deserialize, Serialize};
use warden_core::{ChannelId, RoleId};
use warden_error::ConfigError;

/// Which threads are help threads and who may resolve them.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct SupportConfig {
    /// Parent channels whose threads are help threads; empty means all
    #[serde(default)]
    help_channel_ids: Vec<ChannelId>,
    /// Roles that may mark any thread solved or unsolved
    #[serde(default)]
    moderator_role_ids: Vec<RoleId>,
    /// Role pinged when a thread is marked unsolved
    #[serde(default)]
    support_role_id: Option<RoleId>,
    /// Ask the oracle for a suggestion on the opening message
    #[serde(default = "default_true")]
    suggestions_enabled: bool,
    /// Line posted above a suggestion
    #[serde(default = "default_suggestion_header")]
    suggestion_header: String,
}

fn default_true() -> bool {
    true
}

fn default_suggestion_header() -> String {
    "Here is a suggestion that might help. Mark the thread solved if it did.".to_string()
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            help_channel_ids: Vec::new(),
            moderator_role_ids: Vec::new(),
            support_role_id: None,
            suggestions_enabled: true,
            suggestion_header: default_suggestion_header(),
        }
    }
}

impl SupportConfig {
    /// Whether threads under `parent` are help threads.
    pub fn is_help_channel(&self, parent: ChannelId) -> bool {
        self.help_channel_ids.is_empty() || self.help_channel_ids.contains(&parent)
    }

    /// Reject a suggestion header that would post an empty line.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suggestions_enabled && self.suggestion_header.trim().is_empty() {
            return Err(ConfigError::invalid_setting(
                "support.suggestion_header",
                "must not be empty while suggestions are enabled",
            ));
        }
        Ok(())
    }
}
