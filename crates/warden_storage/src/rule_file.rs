//! TOML blocklist rule files.
//!
//! ```toml
//! version = 3
//!
//! [[rules]]
//! id = "scam-domain"
//! pattern = "free-nitro.gift"
//! kind = "domain_suffix"
//! severity = "hard"
//! ```
//!
//! A rule without its own `version` inherits the file's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use warden_core::{BlocklistRule, PatternKind, RuleId, Severity};
use warden_error::{StorageError, StorageErrorKind, StorageResult};
use warden_interface::BlocklistSource;

/// On-disk shape of a rule file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleFile {
    /// Rule-set version
    pub version: u64,
    /// Rules
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// One rule as written in a rule file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Rule id
    pub id: String,
    /// Pattern text
    pub pattern: String,
    /// Pattern interpretation
    pub kind: PatternKind,
    /// Severity
    pub severity: Severity,
    /// Per-rule version override
    #[serde(default)]
    pub version: Option<u64>,
}

impl RuleFile {
    /// Parse rule file text.
    pub fn parse(text: &str) -> StorageResult<Self> {
        toml::from_str(text)
            .map_err(|e| StorageError::new(StorageErrorKind::Malformed(e.to_string())))
    }

    /// Rules with versions resolved.
    pub fn into_rules(self) -> Vec<BlocklistRule> {
        let file_version = self.version;
        self.rules
            .into_iter()
            .map(|entry| BlocklistRule {
                id: RuleId(entry.id),
                pattern: entry.pattern,
                pattern_kind: entry.kind,
                severity: entry.severity,
                version: entry.version.unwrap_or(file_version),
            })
            .collect()
    }
}

/// Blocklist source reading a TOML rule file on every load.
#[derive(Debug, Clone)]
pub struct TomlBlocklistSource {
    path: PathBuf,
}

impl TomlBlocklistSource {
    /// Source reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Rule file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BlocklistSource for TomlBlocklistSource {
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load_blocklist_snapshot(&self) -> StorageResult<Vec<BlocklistRule>> {
        debug!("Reading blocklist rule file");
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    StorageError::new(StorageErrorKind::NotFound(self.path.display().to_string()))
                }
                _ => StorageError::new(StorageErrorKind::Io(e.to_string())),
            })?;
        let file = RuleFile::parse(&text)?;
        let version = file.version;
        let rules = file.into_rules();
        info!(version, rules = rules.len(), "Blocklist rule file loaded");
        Ok(rules)
    }
}
