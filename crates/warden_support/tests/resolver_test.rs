//! Tests for the support thread resolver.

use std::sync::Arc;
use warden_core::{
    ChannelId, Event, GuildId, MessageId, MessagePayload, RoleId, ThreadId, ThreadMarker,
    ThreadMessagePayload, ThreadStatus, UserId,
};
use warden_error::OracleErrorKind;
use warden_interface::dry_run::{DryRunPlatform, PlatformCall, PlatformOp, ScriptedReply, StaticOracle};
use warden_moderation::{ClassifierAdapter, ClassifierConfig};
use warden_storage::InMemoryStore;
use warden_support::{SupportConfig, ThreadOutcome, ThreadResolver};

const GUILD: GuildId = GuildId(1);
const HELP: ChannelId = ChannelId(50);
const THREAD: ThreadId = ThreadId(500);
const OWNER: UserId = UserId(7);
const MODERATOR: RoleId = RoleId(77);
const SUPPORT: RoleId = RoleId(88);

fn message(id: u64, content: &str, roles: Vec<RoleId>) -> ThreadMessagePayload {
    ThreadMessagePayload {
        thread_id: THREAD,
        parent_channel_id: HELP,
        message: MessagePayload {
            message_id: MessageId(id),
            content: content.to_string(),
            attachments: Vec::new(),
            author_is_bot: false,
            author_roles: roles,
        },
        title: (id == 1).then(|| "Build fails on nightly".to_string()),
        marker: None,
    }
}

fn marker(id: u64, marker: ThreadMarker, roles: Vec<RoleId>) -> ThreadMessagePayload {
    let mut payload = message(id, "", roles);
    payload.marker = Some(marker);
    payload
}

fn config() -> SupportConfig {
    SupportConfig::default()
        .with_help_channel_ids(vec![HELP])
        .with_moderator_role_ids(vec![MODERATOR])
        .with_support_role_id(Some(SUPPORT))
}

struct Harness {
    resolver: ThreadResolver,
    platform: Arc<DryRunPlatform>,
    oracle: Arc<StaticOracle>,
}

fn harness(oracle: StaticOracle, config: SupportConfig) -> Harness {
    let oracle = Arc::new(oracle);
    let platform = Arc::new(DryRunPlatform::new());
    let classifier = ClassifierAdapter::new(
        oracle.clone(),
        ClassifierConfig::default()
            .with_suggestion_timeout_ms(50)
            .with_retry_backoff_ms(1),
    )
    .unwrap();
    let resolver = ThreadResolver::new(
        config,
        classifier,
        platform.clone(),
        Arc::new(InMemoryStore::new()),
    )
    .unwrap();
    Harness {
        resolver,
        platform,
        oracle,
    }
}

fn helpful() -> StaticOracle {
    StaticOracle::new().with_suggestion("Try `cargo clean` first.")
}

impl Harness {
    async fn send(&self, author: UserId, payload: ThreadMessagePayload) -> ThreadOutcome {
        self.resolver
            .on_thread_message(GUILD, author, &payload)
            .await
            .unwrap()
    }

    async fn status(&self) -> Option<ThreadStatus> {
        self.resolver.status(THREAD).await.unwrap()
    }

    fn thread_posts(&self) -> Vec<String> {
        self.platform
            .calls_of(PlatformOp::CreatePost)
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::CreatePost { post_id, content }
                    if post_id.channel_id == ChannelId::from(THREAD) =>
                {
                    Some(content)
                }
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// Suggestions
// ============================================================================

#[tokio::test]
async fn test_first_message_gets_suggestion() {
    let h = harness(helpful(), config());
    let outcome = h.send(OWNER, message(1, "it fails", vec![])).await;
    assert_eq!(
        outcome,
        ThreadOutcome::Updated {
            from: None,
            to: ThreadStatus::AiSuggested,
        }
    );

    let posts = h.thread_posts();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].contains("cargo clean"));

    let state = h.resolver.state(THREAD).await.unwrap().unwrap();
    assert_eq!(state.owner_id, OWNER);
    assert!(state.last_ai_suggestion_at.is_some());
}

#[tokio::test]
async fn test_only_first_message_asks_oracle() {
    let h = harness(helpful(), config());
    h.send(OWNER, message(1, "it fails", vec![])).await;
    h.send(UserId(9), message(2, "same here", vec![])).await;
    assert_eq!(h.oracle.suggest_calls(), 1);
}

#[tokio::test]
async fn test_unavailable_oracle_leaves_thread_open() {
    let oracle = helpful();
    oracle.push_suggestion(ScriptedReply::Fail(OracleErrorKind::Permanent("quota".to_string())));
    let h = harness(oracle, config());

    let outcome = h.send(OWNER, message(1, "it fails", vec![])).await;
    assert_eq!(
        outcome,
        ThreadOutcome::Updated {
            from: None,
            to: ThreadStatus::Open,
        }
    );
    assert!(h.thread_posts().is_empty());
}

#[tokio::test]
async fn test_hanging_oracle_times_out() {
    let oracle = helpful();
    oracle.push_suggestion(ScriptedReply::Hang);
    oracle.push_suggestion(ScriptedReply::Hang);
    let h = harness(oracle, config());
    let outcome = h.send(OWNER, message(1, "it fails", vec![])).await;
    assert!(matches!(
        outcome,
        ThreadOutcome::Updated {
            to: ThreadStatus::Open,
            ..
        }
    ));
}

#[tokio::test]
async fn test_suggestions_can_be_disabled() {
    let h = harness(helpful(), config().with_suggestions_enabled(false));
    h.send(OWNER, message(1, "it fails", vec![])).await;
    assert_eq!(h.oracle.suggest_calls(), 0);
    assert_eq!(h.status().await, Some(ThreadStatus::Open));
}

// ============================================================================
// Markers
// ============================================================================

#[tokio::test]
async fn test_owner_marks_solved() {
    let h = harness(helpful(), config());
    h.send(OWNER, message(1, "it fails", vec![])).await;
    let outcome = h.send(OWNER, marker(2, ThreadMarker::Solved, vec![])).await;
    assert_eq!(
        outcome,
        ThreadOutcome::Updated {
            from: Some(ThreadStatus::AiSuggested),
            to: ThreadStatus::MarkedSolved,
        }
    );
    let state = h.resolver.state(THREAD).await.unwrap().unwrap();
    assert_eq!(state.solved_by, Some(OWNER));
}

#[tokio::test]
async fn test_solved_thread_stays_solved_on_thanks() {
    let h = harness(helpful(), config());
    h.send(OWNER, message(1, "it fails", vec![])).await;
    h.send(OWNER, marker(2, ThreadMarker::Solved, vec![])).await;
    h.send(UserId(9), message(3, "thank you!", vec![])).await;
    assert_eq!(h.status().await, Some(ThreadStatus::MarkedSolved));

    h.send(OWNER, marker(4, ThreadMarker::Unsolved, vec![])).await;
    assert_eq!(h.status().await, Some(ThreadStatus::MarkedUnsolved));
}

#[tokio::test]
async fn test_unsolved_pings_support_and_reopens_on_message() {
    let h = harness(helpful(), config());
    h.send(OWNER, message(1, "it fails", vec![])).await;
    h.send(OWNER, marker(2, ThreadMarker::Unsolved, vec![])).await;

    let posts = h.thread_posts();
    assert_eq!(posts.len(), 2);
    assert!(posts[1].starts_with("<@&88>"));
    assert!(posts[1].contains("<@7>"));

    h.send(OWNER, message(3, "more details", vec![])).await;
    assert_eq!(h.status().await, Some(ThreadStatus::Open));
}

#[tokio::test]
async fn test_stranger_marker_rejected() {
    let h = harness(helpful(), config());
    h.send(OWNER, message(1, "it fails", vec![])).await;
    let outcome = h.send(UserId(9), marker(2, ThreadMarker::Solved, vec![])).await;
    assert_eq!(
        outcome,
        ThreadOutcome::MarkerRejected {
            status: ThreadStatus::AiSuggested,
        }
    );
    assert_eq!(h.status().await, Some(ThreadStatus::AiSuggested));
}

#[tokio::test]
async fn test_moderator_marker_accepted() {
    let h = harness(helpful(), config());
    h.send(OWNER, message(1, "it fails", vec![])).await;
    h.send(UserId(9), marker(2, ThreadMarker::Solved, vec![MODERATOR])).await;

    let state = h.resolver.state(THREAD).await.unwrap().unwrap();
    assert_eq!(state.status, ThreadStatus::MarkedSolved);
    assert_eq!(state.solved_by, Some(UserId(9)));
}

// ============================================================================
// Scope and closing
// ============================================================================

#[tokio::test]
async fn test_non_help_channel_ignored() {
    let h = harness(helpful(), config());
    let mut payload = message(1, "hi", vec![]);
    payload.parent_channel_id = ChannelId(51);
    assert_eq!(h.send(OWNER, payload).await, ThreadOutcome::Ignored);
    assert_eq!(h.status().await, None);
}

#[tokio::test]
async fn test_bot_messages_ignored() {
    let h = harness(helpful(), config());
    let mut payload = message(1, "beep", vec![]);
    payload.message.author_is_bot = true;
    assert_eq!(h.send(OWNER, payload).await, ThreadOutcome::Ignored);
}

#[tokio::test]
async fn test_closed_thread_is_terminal() {
    let h = harness(helpful(), config());
    h.send(OWNER, message(1, "it fails", vec![])).await;
    assert!(h.resolver.close(THREAD).await.unwrap());
    assert!(!h.resolver.close(THREAD).await.unwrap());

    let outcome = h.send(OWNER, marker(2, ThreadMarker::Unsolved, vec![])).await;
    assert_eq!(outcome, ThreadOutcome::Ignored);
    assert_eq!(h.status().await, Some(ThreadStatus::Closed));
}

#[tokio::test]
async fn test_close_unknown_thread_is_noop() {
    let h = harness(helpful(), config());
    assert!(!h.resolver.close(ThreadId(1)).await.unwrap());
}

#[tokio::test]
async fn test_event_routing() {
    let h = harness(helpful(), config());
    let event = Event::thread_message(GUILD, OWNER, message(1, "it fails", vec![]));
    let outcome = h.resolver.handle(&event).await.unwrap();
    assert!(matches!(outcome, ThreadOutcome::Updated { from: None, .. }));
}
