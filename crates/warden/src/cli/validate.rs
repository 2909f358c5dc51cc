//! Validate command handler.

use crate::WardenConfig;
use std::path::{Path, PathBuf};
use warden_interface::BlocklistSource;
use warden_moderation::BlocklistSnapshot;
use warden_storage::TomlBlocklistSource;

/// What `validate` found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that make the setup unusable
    pub errors: Vec<String>,
    /// Notes that do not block startup
    pub warnings: Vec<String>,
    /// Rules in the checked blocklist
    pub rule_count: usize,
    /// Version of the checked blocklist
    pub blocklist_version: Option<u64>,
}

impl ValidationReport {
    /// Whether no error was found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Load the configuration and compile the blocklist it points at.
///
/// `blocklist` overrides the rule file named in the configuration.
pub async fn validate_setup(config: Option<&Path>, blocklist: Option<PathBuf>) -> ValidationReport {
    let mut report = ValidationReport::default();

    let config = match WardenConfig::load(config) {
        Ok(config) => Some(config),
        Err(e) => {
            report.errors.push(format!("configuration: {}", e.kind));
            None
        }
    };

    if config
        .as_ref()
        .is_some_and(|config| config.starboard().channel_id().is_none())
    {
        report.warnings.push(
            "starboard has no channel_id; stars are counted but never posted".to_string(),
        );
    }

    let rule_path = blocklist.or_else(|| {
        config
            .as_ref()
            .and_then(|config| config.blocklist().path().clone())
    });
    let Some(rule_path) = rule_path else {
        if config.is_some() {
            report
                .warnings
                .push("no blocklist rule file configured; the blocklist starts empty".to_string());
        }
        return report;
    };

    let source = TomlBlocklistSource::new(&rule_path);
    match source.load_blocklist_snapshot().await {
        Ok(rules) => match BlocklistSnapshot::build(rules) {
            Ok(snapshot) => {
                if snapshot.is_empty() {
                    report
                        .warnings
                        .push(format!("{} contains no rules", rule_path.display()));
                }
                report.rule_count = snapshot.len();
                report.blocklist_version = Some(snapshot.version());
            }
            Err(e) => report
                .errors
                .push(format!("blocklist {}: {}", rule_path.display(), e.kind)),
        },
        Err(e) => report
            .errors
            .push(format!("blocklist {}: {}", rule_path.display(), e.kind)),
    }
    report
}

/// Handles the validate command. Returns whether the setup is valid.
#[tracing::instrument(skip_all)]
pub async fn handle_validate_command(
    config: Option<PathBuf>,
    blocklist: Option<PathBuf>,
) -> anyhow::Result<bool> {
    tracing::info!("Starting validation");
    let report = validate_setup(config.as_deref(), blocklist).await;

    let status_icon = if report.is_valid() { "✅" } else { "❌" };
    let target = config
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "defaults + environment".to_string());
    println!("\n{} {}", status_icon, target);
    println!("{}", "─".repeat(80));

    if !report.errors.is_empty() {
        println!("\nErrors:");
        for (i, error) in report.errors.iter().enumerate() {
            println!("  {}. {}", i + 1, error);
        }
    }
    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for (i, warning) in report.warnings.iter().enumerate() {
            println!("  {}. {}", i + 1, warning);
        }
    }
    if let Some(version) = report.blocklist_version {
        println!(
            "\n  Blocklist: {} rules, version {}",
            report.rule_count, version
        );
    }
    if report.is_valid() && report.warnings.is_empty() {
        println!("\n  No issues found");
    }

    Ok(report.is_valid())
}
