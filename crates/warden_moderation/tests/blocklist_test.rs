//! Tests for the blocklist matcher.

use std::sync::Arc;
use warden_core::{BlocklistRule, PatternKind, RuleId, Severity};
use warden_error::ConfigErrorKind;
use warden_moderation::{BlocklistMatcher, BlocklistSnapshot};
use warden_storage::InMemoryBlocklistSource;

fn rule(id: &str, pattern: &str, kind: PatternKind, severity: Severity, version: u64) -> BlocklistRule {
    BlocklistRule {
        id: RuleId::from(id),
        pattern: pattern.to_string(),
        pattern_kind: kind,
        severity,
        version,
    }
}

fn base_rules() -> Vec<BlocklistRule> {
    vec![
        rule("scam-domain", "free-nitro.gift", PatternKind::DomainSuffix, Severity::Hard, 1),
        rule("slur", "badword", PatternKind::Exact, Severity::Hard, 1),
        rule("crypto", r"double your (btc|eth)", PatternKind::Regex, Severity::Soft, 1),
        rule("airdrop", r"claim.*airdrop", PatternKind::Regex, Severity::Soft, 1),
        rule("steam", "steamcommunlty.com", PatternKind::DomainSuffix, Severity::Soft, 1),
    ]
}

fn ids(hits: &std::collections::BTreeSet<warden_core::RuleHit>) -> Vec<String> {
    let mut ids: Vec<String> = hits.iter().map(|h| h.rule_id.to_string()).collect();
    ids.sort();
    ids
}

// ============================================================================
// Matching
// ============================================================================

#[test]
fn test_domain_suffix_matches_subdomains() {
    let matcher = BlocklistMatcher::from_rules(base_rules()).unwrap();
    let hits = matcher.matches_text("grab it https://claim.free-nitro.gift/now?x=1");
    assert_eq!(ids(&hits), vec!["scam-domain"]);
    assert_eq!(hits.iter().next().unwrap().matched, "claim.free-nitro.gift");
}

#[test]
fn test_domain_suffix_does_not_match_lookalike_parent() {
    let matcher = BlocklistMatcher::from_rules(base_rules()).unwrap();
    assert!(matcher.matches_text("https://notfree-nitro.gift/").is_empty());
}

#[test]
fn test_bare_domain_in_text_matches() {
    let matcher = BlocklistMatcher::from_rules(base_rules()).unwrap();
    let hits = matcher.matches_text("visit steamcommunlty.com, quick!");
    assert_eq!(ids(&hits), vec!["steam"]);
}

#[test]
fn test_exact_matches_words_case_insensitively() {
    let matcher = BlocklistMatcher::from_rules(base_rules()).unwrap();
    assert_eq!(ids(&matcher.matches_text("you BADWORD!")), vec!["slur"]);
    assert!(matcher.matches_text("badwords are fine").is_empty());
}

#[test]
fn test_regex_first_match_short_circuits_group() {
    let matcher = BlocklistMatcher::from_rules(base_rules()).unwrap();
    let hits = matcher.matches_text("Double your BTC and claim the airdrop");
    assert_eq!(ids(&hits), vec!["crypto"]);
}

#[test]
fn test_hard_and_soft_regex_groups_both_report() {
    let mut rules = base_rules();
    rules.push(rule("hard-re", r"send \d+ btc", PatternKind::Regex, Severity::Hard, 1));
    let matcher = BlocklistMatcher::from_rules(rules).unwrap();
    let hits = matcher.matches_text("send 5 btc to double your btc");
    assert_eq!(ids(&hits), vec!["crypto", "hard-re"]);
}

// ============================================================================
// Validation and reload
// ============================================================================

#[test]
fn test_invalid_regex_rejects_whole_set() {
    let mut rules = base_rules();
    rules.push(rule("broken", "(unclosed", PatternKind::Regex, Severity::Soft, 2));
    let err = BlocklistSnapshot::build(rules).unwrap_err();
    assert!(matches!(err.kind, ConfigErrorKind::InvalidRule { ref rule_id, .. } if rule_id == "broken"));
}

#[test]
fn test_duplicate_ids_rejected() {
    let mut rules = base_rules();
    rules.push(rule("slur", "other", PatternKind::Exact, Severity::Soft, 1));
    let err = BlocklistSnapshot::build(rules).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::DuplicateRule("slur".to_string()));
}

#[test]
fn test_failed_reload_keeps_previous_snapshot() {
    let matcher = BlocklistMatcher::from_rules(base_rules()).unwrap();
    let before = matcher.snapshot();

    let mut rules = vec![rule("new", "newword", PatternKind::Exact, Severity::Hard, 5)];
    rules.push(rule("bad-domain", "https://x.com/path", PatternKind::DomainSuffix, Severity::Hard, 5));
    assert!(matcher.reload(rules).is_err());

    assert_eq!(matcher.version(), 1);
    assert!(Arc::ptr_eq(&before, &matcher.snapshot()));
    assert!(matcher.matches_text("newword").is_empty());
    assert_eq!(ids(&matcher.matches_text("badword")), vec!["slur"]);
}

#[test]
fn test_stale_version_rejected() {
    let matcher = BlocklistMatcher::from_rules(vec![rule(
        "a",
        "x",
        PatternKind::Exact,
        Severity::Soft,
        7,
    )])
    .unwrap();
    let err = matcher
        .reload(vec![rule("b", "y", PatternKind::Exact, Severity::Soft, 3)])
        .unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::StaleVersion { active: 7, offered: 3 });
    assert_eq!(matcher.version(), 7);
}

#[test]
fn test_reader_keeps_pinned_snapshot_across_swap() {
    let matcher = BlocklistMatcher::from_rules(base_rules()).unwrap();
    let pinned = matcher.snapshot();
    matcher
        .reload(vec![rule("other", "zzz", PatternKind::Exact, Severity::Hard, 2)])
        .unwrap();

    assert_eq!(pinned.version(), 1);
    assert!(!pinned.matches("badword", &[]).is_empty());
    assert!(matcher.matches_text("badword").is_empty());
    assert_eq!(matcher.version(), 2);
}

#[tokio::test]
async fn test_reload_from_source() {
    let matcher = BlocklistMatcher::default();
    let source = InMemoryBlocklistSource::new(base_rules());
    let version = matcher.reload_from(&source).await.unwrap();
    assert_eq!(version, 1);
    assert_eq!(matcher.snapshot().len(), 5);
}
