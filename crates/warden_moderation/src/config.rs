//! Detection-stage configuration.

use serde::{Deserialize, Serialize};
use warden_core::{Action, RoleId};
use warden_error::{ConfigError, ConfigErrorKind};

/// Tracking-parameter deny-list and link reply behavior.
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
pub struct LinkConfig {
    /// Query keys to strip; a trailing `*` matches any key with that prefix
    #[serde(default = "default_tracking_params")]
    tracking_params: Vec<String>,
    /// Reply with cleaned links when a message carried tracking parameters
    #[serde(default = "default_true")]
    reply_with_cleaned_links: bool,
}

fn default_tracking_params() -> Vec<String> {
    [
        "utm_*", "fbclid", "gclid", "dclid", "gbraid", "wbraid", "msclkid", "mc_cid", "mc_eid",
        "igshid", "yclid", "_hsenc", "_hsmi", "mkt_tok",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_true() -> bool {
    true
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            tracking_params: default_tracking_params(),
            reply_with_cleaned_links: true,
        }
    }
}

/// Score cut-offs for each action. Must satisfy warn ≤ delete ≤ timeout ≤ ban,
/// all within [0, 1].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct Thresholds {
    /// Warn at or above
    #[serde(default = "default_warn")]
    warn: f32,
    /// Delete at or above
    #[serde(default = "default_delete")]
    delete: f32,
    /// Time out at or above
    #[serde(default = "default_timeout")]
    timeout: f32,
    /// Ban at or above
    #[serde(default = "default_ban")]
    ban: f32,
}

fn default_warn() -> f32 {
    0.5
}

fn default_delete() -> f32 {
    0.7
}

fn default_timeout() -> f32 {
    0.85
}

fn default_ban() -> f32 {
    0.97
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warn: default_warn(),
            delete: default_delete(),
            timeout: default_timeout(),
            ban: default_ban(),
        }
    }
}

impl Thresholds {
    /// Most severe action whose threshold `score` reaches.
    pub fn action_for(&self, score: f32) -> Action {
        if score >= self.ban {
            Action::Ban
        } else if score >= self.timeout {
            Action::Timeout
        } else if score >= self.delete {
            Action::Delete
        } else if score >= self.warn {
            Action::Warn
        } else {
            Action::None
        }
    }

    /// Check range and ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("warn", self.warn),
            ("delete", self.delete),
            ("timeout", self.timeout),
            ("ban", self.ban),
        ];
        for (name, value) in named {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::new(ConfigErrorKind::InvalidThreshold(format!(
                    "{name} = {value} is outside [0, 1]"
                ))));
            }
        }
        for pair in named.windows(2) {
            let (lower_name, lower) = pair[0];
            let (upper_name, upper) = pair[1];
            if lower > upper {
                return Err(ConfigError::new(ConfigErrorKind::InvalidThreshold(format!(
                    "{lower_name} ({lower}) exceeds {upper_name} ({upper})"
                ))));
            }
        }
        Ok(())
    }
}

/// Signal fusion policy.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct ModerationConfig {
    /// Action cut-offs
    #[serde(default)]
    thresholds: Thresholds,
    /// Weight of the classifier score
    #[serde(default = "default_classifier_weight")]
    classifier_weight: f32,
    /// Weight added per soft blocklist hit
    #[serde(default = "default_soft_hit_weight")]
    soft_hit_weight: f32,
    /// Members holding any of these roles are never evaluated
    #[serde(default)]
    exempt_role_ids: Vec<RoleId>,
    /// Skip messages from bot accounts
    #[serde(default = "default_true")]
    ignore_bots: bool,
}

fn default_classifier_weight() -> f32 {
    1.0
}

fn default_soft_hit_weight() -> f32 {
    0.25
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            classifier_weight: default_classifier_weight(),
            soft_hit_weight: default_soft_hit_weight(),
            exempt_role_ids: Vec::new(),
            ignore_bots: true,
        }
    }
}

impl ModerationConfig {
    /// Validate thresholds and weights.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        for (key, weight) in [
            ("moderation.classifier_weight", self.classifier_weight),
            ("moderation.soft_hit_weight", self.soft_hit_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::invalid_setting(key, "must be a non-negative number"));
            }
        }
        Ok(())
    }
}

/// Oracle call policy.
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
pub struct ClassifierConfig {
    /// Per-attempt deadline in milliseconds
    #[serde(default = "default_classify_timeout_ms")]
    timeout_ms: u64,
    /// Retries after a transient failure (0 or 1)
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    /// Pause before the retry in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    retry_backoff_ms: u64,
    /// Categories whose maximum is the message score; empty uses the overall score
    #[serde(default = "default_categories")]
    categories: Vec<String>,
    /// Classifier calls allowed per user per window; 0 disables the cooldown
    #[serde(default = "default_user_calls")]
    user_calls_per_window: u32,
    /// Cooldown window in seconds
    #[serde(default = "default_user_window_secs")]
    user_window_secs: u64,
    /// Deadline for help-thread suggestions in milliseconds
    #[serde(default = "default_suggestion_timeout_ms")]
    suggestion_timeout_ms: u64,
}

fn default_classify_timeout_ms() -> u64 {
    3_000
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_categories() -> Vec<String> {
    vec!["fraud".to_string(), "financial".to_string()]
}

fn default_user_calls() -> u32 {
    3
}

fn default_user_window_secs() -> u64 {
    60
}

fn default_suggestion_timeout_ms() -> u64 {
    15_000
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_classify_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            categories: default_categories(),
            user_calls_per_window: default_user_calls(),
            user_window_secs: default_user_window_secs(),
            suggestion_timeout_ms: default_suggestion_timeout_ms(),
        }
    }
}

impl ClassifierConfig {
    /// Validate deadlines and the retry cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid_setting(
                "classifier.timeout_ms",
                "must be at least 1",
            ));
        }
        if self.suggestion_timeout_ms == 0 {
            return Err(ConfigError::invalid_setting(
                "classifier.suggestion_timeout_ms",
                "must be at least 1",
            ));
        }
        if self.max_retries > 1 {
            return Err(ConfigError::invalid_setting(
                "classifier.max_retries",
                "at most one retry is allowed",
            ));
        }
        if self.user_calls_per_window > 0 && self.user_window_secs == 0 {
            return Err(ConfigError::invalid_setting(
                "classifier.user_window_secs",
                "must be at least 1 when a cooldown is configured",
            ));
        }
        Ok(())
    }
}

/// Cross-channel repeated-content detection.
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
pub struct RepeatConfig {
    /// Turn detection on or off
    #[serde(default = "default_true")]
    enabled: bool,
    /// Look-back window in seconds
    #[serde(default = "default_repeat_window_secs")]
    window_secs: u64,
    /// Identical messages (including the current one) that trigger
    #[serde(default = "default_repeat_threshold")]
    threshold: usize,
    /// Messages remembered per user
    #[serde(default = "default_history_per_user")]
    history_per_user: usize,
    /// Minimum action once triggered
    #[serde(default = "default_repeat_action")]
    action: Action,
}

fn default_repeat_window_secs() -> u64 {
    10
}

fn default_repeat_threshold() -> usize {
    3
}

fn default_history_per_user() -> usize {
    30
}

fn default_repeat_action() -> Action {
    Action::Timeout
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: default_repeat_window_secs(),
            threshold: default_repeat_threshold(),
            history_per_user: default_history_per_user(),
            action: default_repeat_action(),
        }
    }
}

impl RepeatConfig {
    /// Validate window and threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold < 2 {
            return Err(ConfigError::invalid_setting(
                "repeat.threshold",
                "must be at least 2",
            ));
        }
        if self.history_per_user < self.threshold {
            return Err(ConfigError::invalid_setting(
                "repeat.history_per_user",
                "must be at least the threshold",
            ));
        }
        if self.window_secs == 0 {
            return Err(ConfigError::invalid_setting(
                "repeat.window_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
