//! Tests for the starboard aggregator.

use std::sync::Arc;
use warden_core::{
    ChannelId, Event, GuildId, MessageId, PostId, ReactionPayload, StarboardState, UserId,
};
use warden_error::PlatformErrorKind;
use warden_interface::dry_run::{DryRunPlatform, PlatformOp};
use warden_rate_limit::RetryConfig;
use warden_starboard::{PostChange, StarboardAggregator, StarboardConfig, StarboardOutcome};
use warden_storage::InMemoryStore;

const GUILD: GuildId = GuildId(1);
const SOURCE: ChannelId = ChannelId(10);
const SHOWCASE: ChannelId = ChannelId(99);

fn star(message: u64, reactor: u64) -> ReactionPayload {
    ReactionPayload {
        message_id: MessageId(message),
        emoji: "⭐".to_string(),
        reactor_id: UserId(reactor),
        message_author_id: Some(UserId(42)),
        excerpt: Some("a very good message".to_string()),
    }
}

fn config() -> StarboardConfig {
    StarboardConfig::default()
        .with_channel_id(Some(SHOWCASE))
        .with_retry(
            RetryConfig::default()
                .with_max_attempts(2)
                .with_initial_backoff_ms(1)
                .with_max_backoff_ms(2),
        )
}

fn aggregator(config: StarboardConfig) -> (Arc<StarboardAggregator>, Arc<DryRunPlatform>) {
    let platform = Arc::new(DryRunPlatform::new());
    let store = Arc::new(InMemoryStore::new());
    let aggregator = StarboardAggregator::new(config, platform.clone(), store).unwrap();
    (Arc::new(aggregator), platform)
}

async fn add(aggregator: &StarboardAggregator, message: u64, reactor: u64) -> StarboardOutcome {
    aggregator
        .reaction_added(GUILD, SOURCE, &star(message, reactor))
        .await
        .unwrap()
}

async fn remove(aggregator: &StarboardAggregator, message: u64, reactor: u64) -> StarboardOutcome {
    aggregator
        .reaction_removed(GUILD, SOURCE, &star(message, reactor))
        .await
        .unwrap()
}

fn posted_id(outcome: &StarboardOutcome) -> PostId {
    match outcome {
        StarboardOutcome::Updated {
            post: PostChange::Created(post) | PostChange::Recreated(post),
            ..
        } => *post,
        other => panic!("expected a new post, got {other:?}"),
    }
}

// ============================================================================
// Threshold crossings
// ============================================================================

#[tokio::test]
async fn test_fifth_star_posts_exactly_once() {
    let (aggregator, platform) = aggregator(config());

    for reactor in 1..=4 {
        let outcome = add(&aggregator, 7, reactor).await;
        assert!(matches!(
            outcome,
            StarboardOutcome::Updated {
                state: StarboardState::BelowThreshold,
                post: PostChange::None,
                ..
            }
        ));
    }
    assert!(platform.calls().is_empty());

    let outcome = add(&aggregator, 7, 5).await;
    let post = posted_id(&outcome);
    assert_eq!(post.channel_id, SHOWCASE);
    assert_eq!(platform.calls_of(PlatformOp::CreatePost).len(), 1);

    let content = platform.post(post).unwrap();
    assert!(content.starts_with("⭐ **5** <#10>"));
    assert!(content.contains("a very good message"));
    assert!(content.ends_with("https://discord.com/channels/1/10/7"));

    let entry = aggregator.entry(MessageId(7)).await.unwrap().unwrap();
    assert_eq!(entry.state, StarboardState::Posted);
    assert_eq!(entry.starboard_post_id, Some(post));
}

#[tokio::test]
async fn test_more_stars_edit_the_post() {
    let (aggregator, platform) = aggregator(config().with_threshold(2));
    add(&aggregator, 7, 1).await;
    let post = posted_id(&add(&aggregator, 7, 2).await);

    let outcome = add(&aggregator, 7, 3).await;
    assert_eq!(
        outcome,
        StarboardOutcome::Updated {
            star_count: 3,
            state: StarboardState::Posted,
            post: PostChange::Edited(post),
        }
    );
    assert_eq!(platform.calls_of(PlatformOp::CreatePost).len(), 1);
    assert!(platform.post(post).unwrap().starts_with("⭐ **3**"));
}

#[tokio::test]
async fn test_drop_below_threshold_without_retraction_keeps_post() {
    let (aggregator, platform) = aggregator(config().with_threshold(2));
    add(&aggregator, 7, 1).await;
    let post = posted_id(&add(&aggregator, 7, 2).await);

    let outcome = remove(&aggregator, 7, 2).await;
    assert_eq!(
        outcome,
        StarboardOutcome::Updated {
            star_count: 1,
            state: StarboardState::Posted,
            post: PostChange::Edited(post),
        }
    );
    assert_eq!(platform.live_posts(), 1);
}

#[tokio::test]
async fn test_drop_below_threshold_with_retraction_deletes_post() {
    let (aggregator, platform) =
        aggregator(config().with_threshold(2).with_retract_on_drop(true));
    add(&aggregator, 7, 1).await;
    add(&aggregator, 7, 2).await;

    let outcome = remove(&aggregator, 7, 1).await;
    assert_eq!(
        outcome,
        StarboardOutcome::Updated {
            star_count: 1,
            state: StarboardState::Retracted,
            post: PostChange::Retracted,
        }
    );
    assert_eq!(platform.live_posts(), 0);

    let back = add(&aggregator, 7, 3).await;
    posted_id(&back);
    assert_eq!(platform.calls_of(PlatformOp::CreatePost).len(), 2);
    assert_eq!(platform.live_posts(), 1);
}

// ============================================================================
// Counting
// ============================================================================

#[tokio::test]
async fn test_redelivered_add_is_a_noop() {
    let (aggregator, _platform) = aggregator(config());
    add(&aggregator, 7, 1).await;
    assert_eq!(add(&aggregator, 7, 1).await, StarboardOutcome::Duplicate);

    let entry = aggregator.entry(MessageId(7)).await.unwrap().unwrap();
    assert_eq!(entry.star_count, 1);
}

#[tokio::test]
async fn test_remove_before_add_creates_nothing() {
    let (aggregator, _platform) = aggregator(config());
    assert_eq!(remove(&aggregator, 7, 1).await, StarboardOutcome::Duplicate);
    assert!(aggregator.entry(MessageId(7)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_count_tracks_distinct_reactors_under_duplicates() {
    let (aggregator, _platform) = aggregator(config().with_threshold(100));
    let script: [(bool, u64); 9] = [
        (true, 1),
        (true, 2),
        (true, 1),
        (false, 3),
        (true, 3),
        (false, 2),
        (false, 2),
        (true, 4),
        (true, 2),
    ];
    for (is_add, reactor) in script {
        if is_add {
            add(&aggregator, 7, reactor).await;
        } else {
            remove(&aggregator, 7, reactor).await;
        }
    }

    let entry = aggregator.entry(MessageId(7)).await.unwrap().unwrap();
    let reactors: Vec<u64> = entry.distinct_reactor_ids.iter().map(|u| u.0).collect();
    assert_eq!(reactors, vec![1, 2, 3, 4]);
    assert_eq!(entry.star_count, 4);
}

#[tokio::test]
async fn test_concurrent_stars_post_once() {
    let (aggregator, platform) = aggregator(config().with_threshold(5));

    let tasks = (1..=20).map(|reactor| {
        let aggregator = aggregator.clone();
        tokio::spawn(async move { add(&aggregator, 7, reactor).await })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    let entry = aggregator.entry(MessageId(7)).await.unwrap().unwrap();
    assert_eq!(entry.star_count, 20);
    assert_eq!(entry.state, StarboardState::Posted);
    assert_eq!(platform.calls_of(PlatformOp::CreatePost).len(), 1);
    assert_eq!(platform.live_posts(), 1);
}

// ============================================================================
// Filtering
// ============================================================================

#[tokio::test]
async fn test_other_emoji_is_ignored() {
    let (aggregator, _platform) = aggregator(config());
    let mut reaction = star(7, 1);
    reaction.emoji = "💚".to_string();
    let outcome = aggregator
        .reaction_added(GUILD, SOURCE, &reaction)
        .await
        .unwrap();
    assert_eq!(outcome, StarboardOutcome::Ignored);
}

#[tokio::test]
async fn test_self_stars_ignored_when_configured() {
    let (aggregator, _platform) = aggregator(config().with_ignore_self_stars(true));
    assert_eq!(add(&aggregator, 7, 42).await, StarboardOutcome::Ignored);
    assert!(matches!(
        add(&aggregator, 7, 1).await,
        StarboardOutcome::Updated { star_count: 1, .. }
    ));
}

#[tokio::test]
async fn test_stars_in_showcase_channel_are_ignored() {
    let (aggregator, _platform) = aggregator(config());
    let outcome = aggregator
        .reaction_added(GUILD, SHOWCASE, &star(7, 1))
        .await
        .unwrap();
    assert_eq!(outcome, StarboardOutcome::Ignored);
}

#[tokio::test]
async fn test_events_are_routed_by_kind() {
    let (aggregator, _platform) = aggregator(config());
    let added = Event::reaction_added(GUILD, SOURCE, star(7, 1));
    let removed = Event::reaction_removed(GUILD, SOURCE, star(7, 1));

    assert!(matches!(
        aggregator.handle(&added).await.unwrap(),
        StarboardOutcome::Updated { star_count: 1, .. }
    ));
    assert!(matches!(
        aggregator.handle(&removed).await.unwrap(),
        StarboardOutcome::Updated { star_count: 0, .. }
    ));
}

#[tokio::test]
async fn test_without_showcase_channel_only_counts() {
    let (aggregator, platform) = aggregator(config().with_channel_id(None).with_threshold(1));
    let outcome = add(&aggregator, 7, 1).await;
    assert!(matches!(
        outcome,
        StarboardOutcome::Updated {
            state: StarboardState::BelowThreshold,
            post: PostChange::None,
            ..
        }
    ));
    assert!(platform.calls().is_empty());
}

// ============================================================================
// Platform failures
// ============================================================================

#[tokio::test]
async fn test_failed_post_retries_on_next_star() {
    let (aggregator, platform) = aggregator(config().with_threshold(1));
    platform.fail_next(
        PlatformOp::CreatePost,
        PlatformErrorKind::PermissionDenied("send messages".to_string()),
    );

    let outcome = add(&aggregator, 7, 1).await;
    assert!(matches!(
        outcome,
        StarboardOutcome::Updated {
            state: StarboardState::BelowThreshold,
            post: PostChange::Failed(PlatformErrorKind::PermissionDenied(_)),
            ..
        }
    ));

    posted_id(&add(&aggregator, 7, 2).await);
    assert_eq!(platform.live_posts(), 1);
}

#[tokio::test]
async fn test_transient_post_failure_is_retried() {
    let (aggregator, platform) = aggregator(config().with_threshold(1));
    platform.fail_next(
        PlatformOp::CreatePost,
        PlatformErrorKind::Transient("502".to_string()),
    );
    posted_id(&add(&aggregator, 7, 1).await);
    assert_eq!(platform.attempts(PlatformOp::CreatePost), 2);
}

#[tokio::test]
async fn test_vanished_post_is_recreated() {
    let (aggregator, platform) = aggregator(config().with_threshold(1));
    let first = posted_id(&add(&aggregator, 7, 1).await);
    assert!(platform.remove_post_out_of_band(first));

    let second = posted_id(&add(&aggregator, 7, 2).await);
    assert_ne!(first, second);

    let entry = aggregator.entry(MessageId(7)).await.unwrap().unwrap();
    assert_eq!(entry.starboard_post_id, Some(second));
    assert_eq!(entry.state, StarboardState::Posted);
}

#[test]
fn test_zero_threshold_rejected() {
    assert!(StarboardConfig::default().with_threshold(0).validate().is_err());
}
