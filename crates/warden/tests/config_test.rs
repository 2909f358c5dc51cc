//! Tests for configuration loading and the CLI handlers.

use std::io::Write;
use std::path::Path;
use std::time::Duration;
use warden::{BlocklistConfig, WardenConfig};
use warden::cli::{read_events, replay_events, validate_setup};
use warden_core::{Action, ChannelId, Event, GuildId, MessageId, MessagePayload, RoleId, UserId};
use warden_interface::dry_run::PlatformCall;

fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    path
}

const RULES: &str = r#"
version = 4

[[rules]]
id = "scam-domain"
pattern = "free-nitro.gift"
kind = "domain_suffix"
severity = "hard"

[[rules]]
id = "giveaway"
pattern = "giveaway"
kind = "exact"
severity = "soft"
"#;

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_defaults_are_valid() {
    let config = WardenConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(*config.starboard().threshold(), 5);
    assert!(!*config.starboard().retract_on_drop());
    assert_eq!(*config.ingest().lane_capacity(), 256);
}

#[test]
fn test_load_reads_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "warden.toml",
        r#"
[ingest]
lane_capacity = 32

[moderation]
exempt_role_ids = [5]

[moderation.thresholds]
warn = 0.4
delete = 0.6
timeout = 0.8
ban = 0.95

[repeat]
action = "delete"

[starboard]
emoji = "🔥"
threshold = 4
channel_id = 99

[support]
help_channel_ids = [50]
support_role_id = 88

[blocklist]
path = "rules.toml"
"#,
    );

    let config = WardenConfig::load(Some(&path)).unwrap();
    assert_eq!(*config.ingest().lane_capacity(), 32);
    assert_eq!(config.moderation().exempt_role_ids(), &vec![RoleId(5)]);
    assert_eq!(*config.moderation().thresholds().delete(), 0.6);
    assert_eq!(*config.repeat().action(), Action::Delete);
    assert_eq!(config.starboard().emoji(), "🔥");
    assert_eq!(*config.starboard().threshold(), 4);
    assert_eq!(*config.starboard().channel_id(), Some(ChannelId(99)));
    assert_eq!(config.support().help_channel_ids(), &vec![ChannelId(50)]);
    assert_eq!(*config.support().support_role_id(), Some(RoleId(88)));
    assert_eq!(
        config.blocklist().path().as_deref(),
        Some(Path::new("rules.toml"))
    );
}

#[test]
fn test_environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "warden.toml",
        "[enforcement]\ntimeout_secs = 120\n",
    );

    // SAFETY: no other test in this binary reads or writes this variable.
    unsafe { std::env::set_var("WARDEN__ENFORCEMENT__TIMEOUT_SECS", "900") };
    let config = WardenConfig::load(Some(&path));
    unsafe { std::env::remove_var("WARDEN__ENFORCEMENT__TIMEOUT_SECS") };

    assert_eq!(*config.unwrap().enforcement().timeout_secs(), 900);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(WardenConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_unordered_thresholds_are_rejected() {
    let result = WardenConfig::from_toml_str(
        "[moderation.thresholds]\nwarn = 0.9\ndelete = 0.5\ntimeout = 0.95\nban = 0.99\n",
    );
    assert!(result.is_err());
}

#[test]
fn test_zero_lane_capacity_is_rejected() {
    assert!(WardenConfig::from_toml_str("[ingest]\nlane_capacity = 0\n").is_err());
}

#[test]
fn test_zero_starboard_threshold_is_rejected() {
    assert!(WardenConfig::from_toml_str("[starboard]\nthreshold = 0\n").is_err());
}

// ============================================================================
// validate command
// ============================================================================

#[tokio::test]
async fn test_validate_reports_rule_file() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "rules.toml", RULES);
    let config = write(
        dir.path(),
        "warden.toml",
        &format!("[blocklist]\npath = {:?}\n", rules.display().to_string()),
    );

    let report = validate_setup(Some(&config), None).await;
    assert!(report.is_valid(), "{:?}", report.errors);
    assert_eq!(report.rule_count, 2);
    assert_eq!(report.blocklist_version, Some(4));
}

#[tokio::test]
async fn test_validate_rejects_bad_regex() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(
        dir.path(),
        "rules.toml",
        "version = 1\n\n[[rules]]\nid = \"broken\"\npattern = \"(unclosed\"\nkind = \"regex\"\nseverity = \"hard\"\n",
    );
    let config = write(dir.path(), "warden.toml", "");

    let report = validate_setup(Some(&config), Some(rules)).await;
    assert!(!report.is_valid());
    assert!(report.errors[0].contains("rules.toml"));
}

#[tokio::test]
async fn test_validate_warns_without_blocklist() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "warden.toml", "");

    let report = validate_setup(Some(&config), None).await;
    assert!(report.is_valid());
    assert!(
        report.warnings.iter().any(|w| w.contains("no blocklist rule file")),
        "{:?}",
        report.warnings
    );
}

#[tokio::test]
async fn test_validate_warns_without_showcase_channel() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "rules.toml", RULES);
    let unset = write(dir.path(), "unset.toml", "");
    let set = write(dir.path(), "set.toml", "[starboard]\nchannel_id = 99\n");

    let report = validate_setup(Some(&unset), Some(rules.clone())).await;
    assert!(report.is_valid());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("starboard"));

    let report = validate_setup(Some(&set), Some(rules)).await;
    assert!(report.is_valid());
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[tokio::test]
async fn test_validate_reports_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "warden.toml", "[starboard]\nthreshold = 0\n");

    let report = validate_setup(Some(&config), None).await;
    assert!(!report.is_valid());
    assert!(report.errors[0].starts_with("configuration"));
}

// ============================================================================
// replay command
// ============================================================================

fn message(id: u64, content: &str) -> Event {
    Event::message_created(
        GuildId(1),
        ChannelId(10),
        UserId(42),
        MessagePayload {
            message_id: MessageId(id),
            content: content.to_string(),
            attachments: Vec::new(),
            author_is_bot: false,
            author_roles: Vec::new(),
        },
    )
}

#[test]
fn test_read_events_skips_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = [message(1, "one"), message(2, "two")]
        .iter()
        .map(|event| serde_json::to_string(event).unwrap())
        .collect();
    let path = write(dir.path(), "events.jsonl", &lines.join("\n\n"));

    let events = read_events(&path).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].message().unwrap().content, "two");
}

#[test]
fn test_read_events_names_the_bad_line() {
    let dir = tempfile::tempdir().unwrap();
    let good = serde_json::to_string(&message(1, "one")).unwrap();
    let path = write(dir.path(), "events.jsonl", &format!("{good}\n{{not json\n"));

    let err = read_events(&path).unwrap_err();
    assert!(err.to_string().contains("events.jsonl:2"));
}

#[tokio::test]
async fn test_replay_collects_platform_calls() {
    let events = vec![
        message(1, "hello"),
        message(2, "very suspicious"),
        message(3, "bye"),
    ];

    let report = replay_events(
        WardenConfig::default(),
        events,
        0.0,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert_eq!(report.accepted, 3);
    assert!(report.rejected.is_empty());
    assert!(report.clean);
    assert!(report.calls.is_empty());
}

#[tokio::test]
async fn test_replay_enforces_with_high_default_score() {
    let report = replay_events(
        WardenConfig::default(),
        vec![message(1, "anything at all")],
        0.75,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert!(report.clean);
    assert!(report.calls.iter().any(|call| matches!(
        call,
        PlatformCall::DeleteMessage { message_id, .. } if *message_id == MessageId(1)
    )));
}

// ============================================================================
// Shipped examples
// ============================================================================

fn repo_file(relative: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..").join(relative)
}

#[test]
fn test_example_config_parses() {
    let text = std::fs::read_to_string(repo_file("config/warden.example.toml")).unwrap();
    let config = WardenConfig::from_toml_str(&text).unwrap();
    let expected = WardenConfig::default().with_blocklist(
        BlocklistConfig::default().with_path(Some("config/blocklist.example.toml".into())),
    );
    assert_eq!(config, expected);
}

#[tokio::test]
async fn test_example_rules_compile() {
    let report = validate_setup(None, Some(repo_file("config/blocklist.example.toml"))).await;
    assert!(report.is_valid(), "{:?}", report.errors);
    assert_eq!(report.rule_count, 4);
}

#[test]
fn test_example_events_parse() {
    let events = read_events(&repo_file("demos/events.jsonl")).unwrap();
    assert_eq!(events.len(), 10);
    assert!(events.iter().all(Event::is_consistent));
}
