//! Configuration error types.

/// Kinds of configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A blocklist rule failed validation
    #[display("Invalid blocklist rule {rule_id}: {reason}")]
    InvalidRule {
        /// Identifier of the offending rule
        rule_id: String,
        /// Why the rule was rejected
        reason: String,
    },
    /// Two rules in one rule set share an identifier
    #[display("Duplicate blocklist rule id: {}", _0)]
    DuplicateRule(String),
    /// A rule set older than the active snapshot was offered
    #[display("Stale blocklist version {offered}, active version is {active}")]
    StaleVersion {
        /// Version of the active snapshot
        active: u64,
        /// Version of the rejected rule set
        offered: u64,
    },
    /// Moderation thresholds are out of range or out of order
    #[display("Invalid threshold: {}", _0)]
    InvalidThreshold(String),
    /// A numeric setting is out of its permitted range
    #[display("Invalid setting {key}: {reason}")]
    InvalidSetting {
        /// Dotted configuration key
        key: String,
        /// Why the value was rejected
        reason: String,
    },
    /// Configuration source could not be read or parsed
    #[display("Failed to load configuration: {}", _0)]
    Load(String),
}

/// Configuration error with location tracking.
///
/// # Examples
///
/// ```
/// use warden_error::{ConfigError, ConfigErrorKind};
///
/// let err = ConfigError::new(ConfigErrorKind::InvalidThreshold("warn > ban".to_string()));
/// assert!(format!("{}", err).contains("warn > ban"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    /// The kind of error that occurred
    pub kind: ConfigErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new configuration error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for an invalid setting.
    #[track_caller]
    pub fn invalid_setting(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        })
    }
}
