//! Moderation log lines.

use warden_core::{ModerationVerdict, jump_url};

/// Render the warning posted to the author's channel.
pub fn render_warning(template: &str, verdict: &ModerationVerdict) -> String {
    template
        .replace("{user}", &format!("<@{}>", verdict.author_id))
        .replace("{reason}", &verdict.reason)
}

/// Render a moderation log entry for `verdict` with an outcome summary.
pub fn render_log_line(verdict: &ModerationVerdict, outcome: &str) -> String {
    let mut line = format!(
        "**{}** {} for <@{}> in <#{}>\nReason: {}\nMessage: {}",
        verdict.action,
        outcome,
        verdict.author_id,
        verdict.channel_id,
        verdict.reason,
        jump_url(verdict.guild_id, verdict.channel_id, verdict.message_id),
    );
    if let Some(score) = verdict.classifier_score {
        line.push_str(&format!("\nClassifier: {:.0}%", score * 100.0));
    }
    if !verdict.rule_hits.is_empty() {
        let rules: Vec<&str> = verdict
            .rule_hits
            .iter()
            .map(|hit| hit.rule_id.0.as_str())
            .collect();
        line.push_str(&format!("\nRules: {}", rules.join(", ")));
    }
    line
}
