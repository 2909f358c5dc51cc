//! Tests for the core data model.

use warden_core::{
    Action, ChannelId, Event, EventKind, GuildId, MessageId, MessagePayload, PostId,
    ReactionPayload, Score, StarboardEntry, StarboardState, ThreadStatus, UserId, jump_url,
};

fn message(id: u64, content: &str) -> MessagePayload {
    MessagePayload {
        message_id: MessageId(id),
        content: content.to_string(),
        attachments: Vec::new(),
        author_is_bot: false,
        author_roles: Vec::new(),
    }
}

// ============================================================================
// Actions
// ============================================================================

#[test]
fn test_action_ordering_is_escalation_order() {
    assert!(Action::None < Action::Warn);
    assert!(Action::Warn < Action::Delete);
    assert!(Action::Delete < Action::Timeout);
    assert!(Action::Timeout < Action::Ban);
    assert!(!Action::None.is_enforcement());
    assert!(Action::Warn.is_enforcement());
}

#[test]
fn test_action_parses_snake_case() {
    let action: Action = "timeout".parse().expect("Valid action");
    assert_eq!(action, Action::Timeout);
    assert_eq!(Action::Ban.to_string(), "ban");
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn test_event_lane_is_guild_and_channel() {
    let event = Event::message_created(GuildId(1), ChannelId(2), UserId(3), message(4, "hi"));
    let lane = event.lane();
    assert_eq!(lane.guild_id, GuildId(1));
    assert_eq!(lane.channel_id, ChannelId(2));
    assert!(event.is_consistent());
    assert_eq!(event.message().map(|m| m.content.as_str()), Some("hi"));
    assert!(event.reaction().is_none());
}

#[test]
fn test_reaction_event_author_is_reactor() {
    let event = Event::reaction_added(
        GuildId(1),
        ChannelId(2),
        ReactionPayload {
            message_id: MessageId(10),
            emoji: "⭐".to_string(),
            reactor_id: UserId(99),
            message_author_id: None,
            excerpt: None,
        },
    );
    assert_eq!(*event.kind(), EventKind::ReactionAdded);
    assert_eq!(*event.author_id(), UserId(99));
    assert!(event.message().is_none());
}

#[test]
fn test_event_deserializes_without_id_or_timestamp() {
    let json = r#"{
        "guild_id": 1,
        "channel_id": 2,
        "author_id": 3,
        "kind": "message_created",
        "payload": { "type": "message", "message_id": 4, "content": "hello" }
    }"#;
    let event: Event = serde_json::from_str(json).expect("Valid event");
    assert!(event.is_consistent());
    assert_eq!(event.message().map(|m| m.message_id), Some(MessageId(4)));
}

#[test]
fn test_mismatched_kind_and_payload_is_inconsistent() {
    let json = r#"{
        "guild_id": 1,
        "channel_id": 2,
        "author_id": 3,
        "kind": "reaction_added",
        "payload": { "type": "message", "message_id": 4, "content": "hello" }
    }"#;
    let event: Event = serde_json::from_str(json).expect("Valid JSON");
    assert!(!event.is_consistent());
}

// ============================================================================
// Starboard entries
// ============================================================================

#[test]
fn test_starboard_count_tracks_distinct_reactors() {
    let mut entry = StarboardEntry::new(MessageId(1), GuildId(1), ChannelId(1));
    assert!(entry.add_reactor(UserId(1)));
    assert!(!entry.add_reactor(UserId(1)));
    assert!(entry.add_reactor(UserId(2)));
    assert_eq!(entry.star_count, 2);

    assert!(entry.remove_reactor(UserId(1)));
    assert!(!entry.remove_reactor(UserId(1)));
    assert_eq!(entry.star_count, 1);
    assert_eq!(entry.state, StarboardState::BelowThreshold);
}

#[test]
fn test_starboard_reconcile_repairs_drift() {
    let mut entry = StarboardEntry::new(MessageId(1), GuildId(1), ChannelId(1));
    entry.add_reactor(UserId(7));
    entry.star_count = 12;
    entry.reconcile();
    assert_eq!(entry.star_count, 1);
}

// ============================================================================
// Misc
// ============================================================================

#[test]
fn test_score_focuses_on_highest_named_category() {
    let score = Score::new(0.2)
        .with_category("fraud", 0.9)
        .with_category("financial", 0.4)
        .with_category("toxicity", 1.0);
    let focus = vec!["fraud".to_string(), "financial".to_string()];
    assert!((score.focused(&focus) - 0.9).abs() < f32::EPSILON);
    assert!((score.focused(&["missing".to_string()]) - 0.2).abs() < f32::EPSILON);
}

#[test]
fn test_score_clamps_out_of_range_values() {
    let score = Score::new(1.7).with_category("fraud", -0.5);
    assert_eq!(score.value, 1.0);
    assert_eq!(score.categories["fraud"], 0.0);
}

#[test]
fn test_jump_url_and_post_id_display() {
    assert_eq!(
        jump_url(GuildId(1), ChannelId(2), MessageId(3)),
        "https://discord.com/channels/1/2/3"
    );
    assert_eq!(PostId::new(ChannelId(5), MessageId(6)).to_string(), "5/6");
    assert!(ThreadStatus::Closed.is_terminal());
    assert!(!ThreadStatus::MarkedSolved.is_terminal());
}
