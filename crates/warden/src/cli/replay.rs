//! Replay command handler.
//!
//! Feeds recorded events through a full pipeline wired to the dry-run
//! platform, so a configuration can be tried against real traffic without
//! touching a guild.

use crate::{Components, Warden, WardenConfig};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use warden_core::Event;
use warden_error::{PipelineErrorKind, WardenResult};
use warden_interface::dry_run::{DryRunPlatform, PlatformCall, StaticOracle};

/// Outcome of a replay.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    /// Events the pipeline accepted
    pub accepted: usize,
    /// Rejected events by position, with the reason
    pub rejected: Vec<(usize, String)>,
    /// Platform calls in the order they succeeded
    pub calls: Vec<PlatformCall>,
    /// Whether every lane and queued action finished before the grace period
    pub clean: bool,
}

/// Parse newline-delimited JSON events. Blank lines are skipped.
pub fn read_events(path: &Path) -> anyhow::Result<Vec<Event>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid event", path.display(), i + 1))
        })
        .collect()
}

/// Run `events` through a fresh pipeline against the dry-run platform.
///
/// A full lane is waited out rather than counted as a rejection.
pub async fn replay_events(
    config: WardenConfig,
    events: Vec<Event>,
    default_score: f32,
    grace: Duration,
) -> WardenResult<ReplayReport> {
    let platform = Arc::new(DryRunPlatform::new());
    let oracle = Arc::new(StaticOracle::new().with_default_score(default_score));
    let components = Components::in_memory(platform.clone(), oracle, &config);
    let warden = Warden::start(config, components).await?;

    let mut report = ReplayReport::default();
    for (position, event) in events.into_iter().enumerate() {
        loop {
            match warden.ingest(event.clone()) {
                Ok(()) => {
                    report.accepted += 1;
                    break;
                }
                Err(e) if matches!(e.kind, PipelineErrorKind::QueueFull { .. }) => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Err(e) => {
                    report.rejected.push((position, e.kind.to_string()));
                    break;
                }
            }
        }
    }

    report.clean = warden.shutdown(grace).await;
    report.calls = platform.calls();
    Ok(report)
}

/// Handles the replay command.
#[tracing::instrument(skip_all, fields(events = %events.display()))]
pub async fn handle_replay_command(
    config: WardenConfig,
    events: PathBuf,
    default_score: f32,
    grace: Duration,
) -> anyhow::Result<()> {
    let recorded = read_events(&events)?;
    tracing::info!(count = recorded.len(), "Replaying events");
    let report = replay_events(config, recorded, default_score, grace).await?;

    println!("\n{} {}", if report.clean { "✅" } else { "⚠️" }, events.display());
    println!("{}", "─".repeat(80));
    println!("  Accepted events: {}", report.accepted);
    if !report.rejected.is_empty() {
        println!("\nRejected:");
        for (position, reason) in &report.rejected {
            println!("  #{}: {}", position + 1, reason);
        }
    }
    println!("\nPlatform calls ({}):", report.calls.len());
    for (i, call) in report.calls.iter().enumerate() {
        println!("  {}. {}", i + 1, describe(call));
    }
    if !report.clean {
        println!("\n⚠️  Some work was still pending when the grace period ended");
    }
    Ok(())
}

fn describe(call: &PlatformCall) -> String {
    match call {
        PlatformCall::DeleteMessage {
            channel_id,
            message_id,
        } => format!("delete message {message_id} in <#{channel_id}>"),
        PlatformCall::TimeoutMember {
            guild_id,
            user_id,
            duration_secs,
            reason,
        } => format!("timeout <@{user_id}> in guild {guild_id} for {duration_secs}s: {reason}"),
        PlatformCall::BanMember {
            guild_id,
            user_id,
            reason,
        } => format!("ban <@{user_id}> from guild {guild_id}: {reason}"),
        PlatformCall::CreatePost { post_id, content } => {
            format!("post {post_id}:\n{}", indent(content))
        }
        PlatformCall::EditPost { post_id, content } => {
            format!("edit {post_id}:\n{}", indent(content))
        }
        PlatformCall::DeletePost { post_id } => format!("delete post {post_id}"),
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("       {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
