//! Tests for the in-memory store and rule file source.

use std::io::Write;
use warden_core::{
    ChannelId, GuildId, MessageId, PatternKind, Severity, StarboardEntry, ThreadId, ThreadState,
    UserId,
};
use warden_error::StorageErrorKind;
use warden_interface::{BlocklistSource, StarboardStore, ThreadStore};
use warden_storage::{InMemoryStore, TomlBlocklistSource};

// ============================================================================
// InMemoryStore
// ============================================================================

#[tokio::test]
async fn test_store_put_then_get() {
    let store = InMemoryStore::new();
    let mut entry = StarboardEntry::new(MessageId(1), GuildId(2), ChannelId(3));
    entry.add_reactor(UserId(4));

    assert!(store.get_starboard_entry(MessageId(1)).await.unwrap().is_none());
    store.put_starboard_entry(&entry).await.unwrap();
    let loaded = store.get_starboard_entry(MessageId(1)).await.unwrap();
    assert_eq!(loaded, Some(entry));
}

#[tokio::test]
async fn test_store_clones_share_state() {
    let store = InMemoryStore::new();
    let other = store.clone();
    let state = ThreadState::open(ThreadId(1), GuildId(1), ChannelId(1), UserId(1));
    store.put_thread_state(&state).await.unwrap();
    assert!(other.get_thread_state(ThreadId(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_store_json_snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let store = InMemoryStore::new();
    let state = ThreadState::open(ThreadId(8), GuildId(1), ChannelId(2), UserId(3));
    store.put_thread_state(&state).await.unwrap();
    store.save_json(&path).await.unwrap();

    let restored = InMemoryStore::load_json(&path).await.unwrap();
    assert_eq!(restored.get_thread_state(ThreadId(8)).await.unwrap(), Some(state));
}

#[tokio::test]
async fn test_store_missing_snapshot_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryStore::load_json(&dir.path().join("absent.json"))
        .await
        .unwrap();
    assert!(store.snapshot().await.threads.is_empty());
}

// ============================================================================
// TomlBlocklistSource
// ============================================================================

#[tokio::test]
async fn test_rule_file_versions_inherit_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
version = 4

[[rules]]
id = "scam"
pattern = "free-nitro.gift"
kind = "domain_suffix"
severity = "hard"

[[rules]]
id = "crypto"
pattern = "(?i)double your (btc|eth)"
kind = "regex"
severity = "soft"
version = 2
"#
    )
    .unwrap();

    let rules = TomlBlocklistSource::new(file.path())
        .load_blocklist_snapshot()
        .await
        .unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].pattern_kind, PatternKind::DomainSuffix);
    assert_eq!(rules[0].severity, Severity::Hard);
    assert_eq!(rules[0].version, 4);
    assert_eq!(rules[1].version, 2);
}

#[tokio::test]
async fn test_rule_file_missing_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = TomlBlocklistSource::new(dir.path().join("nope.toml"))
        .load_blocklist_snapshot()
        .await
        .unwrap_err();
    assert!(matches!(err.kind, StorageErrorKind::NotFound(_)));
}

#[tokio::test]
async fn test_rule_file_bad_kind_is_malformed() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "version = 1\n[[rules]]\nid = \"x\"\npattern = \"y\"\nkind = \"glob\"\nseverity = \"hard\"\n"
    )
    .unwrap();
    let err = TomlBlocklistSource::new(file.path())
        .load_blocklist_snapshot()
        .await
        .unwrap_err();
    assert!(matches!(err.kind, StorageErrorKind::Malformed(_)));
}
