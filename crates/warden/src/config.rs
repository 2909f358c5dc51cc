//! Top-level configuration.
//!
//! Every section is optional; missing keys take their defaults. A TOML file is
//! layered under environment overrides of the form `WARDEN__SECTION__KEY`,
//! e.g. `WARDEN__STARBOARD__THRESHOLD=3`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use warden_core::LoggingConfig;
use warden_enforcement::EnforcementConfig;
use warden_error::{ConfigError, ConfigErrorKind};
use warden_moderation::{ClassifierConfig, LinkConfig, ModerationConfig, RepeatConfig};
use warden_starboard::StarboardConfig;
use warden_support::SupportConfig;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "WARDEN";

/// Ingest lane sizing.
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
pub struct IngestConfig {
    /// Events buffered per (guild, channel) lane before ingest refuses more
    #[serde(default = "default_lane_capacity")]
    lane_capacity: usize,
    /// Seconds a lane may sit empty before its worker exits
    #[serde(default = "default_idle_lane_secs")]
    idle_lane_secs: u64,
}

fn default_lane_capacity() -> usize {
    256
}

fn default_idle_lane_secs() -> u64 {
    300
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            lane_capacity: default_lane_capacity(),
            idle_lane_secs: default_idle_lane_secs(),
        }
    }
}

impl IngestConfig {
    /// Idle timeout of a lane worker.
    pub fn idle_lane_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_lane_secs)
    }

    /// Reject zero-sized lanes and timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_capacity == 0 {
            return Err(ConfigError::invalid_setting(
                "ingest.lane_capacity",
                "must be at least 1",
            ));
        }
        if self.idle_lane_secs == 0 {
            return Err(ConfigError::invalid_setting(
                "ingest.idle_lane_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Where the blocklist rules live.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct BlocklistConfig {
    /// TOML rule file; without one the blocklist starts empty
    #[serde(default)]
    path: Option<PathBuf>,
}

/// Complete engine configuration.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct WardenConfig {
    /// Tracing output
    #[serde(default)]
    logging: LoggingConfig,
    /// Ingest lanes
    #[serde(default)]
    ingest: IngestConfig,
    /// Link cleaning
    #[serde(default)]
    links: LinkConfig,
    /// Verdict thresholds and exemptions
    #[serde(default)]
    moderation: ModerationConfig,
    /// Oracle calls
    #[serde(default)]
    classifier: ClassifierConfig,
    /// Cross-channel repeat detection
    #[serde(default)]
    repeat: RepeatConfig,
    /// Action executor
    #[serde(default)]
    enforcement: EnforcementConfig,
    /// Starboard
    #[serde(default)]
    starboard: StarboardConfig,
    /// Help threads
    #[serde(default)]
    support: SupportConfig,
    /// Blocklist rule source
    #[serde(default)]
    blocklist: BlocklistConfig,
}

impl WardenConfig {
    /// Load from an optional TOML file plus `WARDEN__*` environment overrides,
    /// then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Reading configuration file");
            builder = builder.add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| ConfigError::new(ConfigErrorKind::Load(e.to_string())))?;
        loaded.validate()?;
        info!(
            file = path.map(|p| p.display().to_string()),
            "Configuration loaded"
        );
        Ok(loaded)
    }

    /// Parse TOML text without consulting the environment, then validate.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let loaded: Self = toml::from_str(text)
            .map_err(|e| ConfigError::new(ConfigErrorKind::Load(e.to_string())))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ingest.validate()?;
        self.moderation.validate()?;
        self.classifier.validate()?;
        self.repeat.validate()?;
        self.enforcement.validate()?;
        self.starboard.validate()?;
        self.support.validate()?;
        Ok(())
    }
}
