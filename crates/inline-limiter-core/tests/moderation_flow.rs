use chrono::{TimeDelta, Utc};
use inline_limiter_core::decay::DecayTask;
use inline_limiter_core::group::InlineDecision;
use inline_limiter_core::moderation::InboundMessage;
use inline_limiter_core::registry::GroupRegistry;
use inline_limiter_core::setup::BotLimit;
use inline_limiter_core::testing::Harness;
use inline_limiter_core::transport::MemberRole;

fn inline(message_id: i32, sender_id: i64, bot: &str) -> InboundMessage {
    InboundMessage {
        chat_id: -100,
        message_id,
        sender_id,
        sender_name: format!("user{sender_id}"),
        is_group: true,
        text: None,
        via_bot: Some(bot.to_string()),
        reply_to_via_bot: None,
        sent_at: Utc::now(),
    }
}

fn text(message_id: i32, sender_id: i64, body: &str) -> InboundMessage {
    InboundMessage {
        text: Some(body.to_string()),
        via_bot: None,
        ..inline(message_id, sender_id, "")
    }
}

#[tokio::test]
async fn burned_user_recovers_after_cooldown() {
    let h = Harness::new();
    h.transport.set_role(-100, 1, MemberRole::Owner);
    let moderator = h.moderator();

    moderator.handle_message(&text(1, 1, "/setup 2,5"), Utc::now()).await;
    for id in 10..12 {
        let verdict = moderator.handle_message(&inline(id, 7, "gif"), Utc::now()).await;
        assert_eq!(verdict, Some(InlineDecision::Allowed));
    }
    let verdict = moderator.handle_message(&inline(12, 7, "gif"), Utc::now()).await;
    assert_eq!(verdict, Some(InlineDecision::UserBurned { cooldown: 5 }));

    let decay = DecayTask::new(h.registry.clone());
    for _ in 0..5 {
        decay.sweep().await;
    }
    let verdict = moderator.handle_message(&inline(13, 7, "gif"), Utc::now()).await;
    assert_eq!(verdict, Some(InlineDecision::Allowed));
}

#[tokio::test]
async fn bot_limit_applies_across_users() {
    let h = Harness::new();
    h.transport.set_role(-100, 1, MemberRole::Administrator);
    let moderator = h.moderator();

    let mut cmd = text(1, 1, "/botlimit 2,10");
    cmd.reply_to_via_bot = Some("gif".into());
    moderator.handle_message(&cmd, Utc::now()).await;

    for (id, user) in [(10, 2), (11, 3)] {
        let verdict = moderator.handle_message(&inline(id, user, "gif"), Utc::now()).await;
        assert_eq!(verdict, Some(InlineDecision::Allowed));
    }
    let verdict = moderator.handle_message(&inline(12, 4, "gif"), Utc::now()).await;
    assert!(matches!(verdict, Some(InlineDecision::BotBurned { first_warning: true, .. })));

    let other = moderator.handle_message(&inline(13, 4, "vid"), Utc::now()).await;
    assert_eq!(other, Some(InlineDecision::Allowed), "other bots are unaffected");
}

#[tokio::test]
async fn state_round_trips_through_store() {
    let h = Harness::new();
    let moderator = h.moderator();
    moderator.handle_message(&inline(1, 7, "gif"), Utc::now()).await;
    h.registry.checkpoint().await;

    let reloaded = GroupRegistry::load(h.settings.default_setup(), h.store.clone()).await;
    let table = reloaded.lock().await;
    let group = table.get("-100").expect("group persisted");
    assert_eq!(group.inline_count, 1);
    assert_eq!(group.describe("7", None), "Chat -100 User @7:1/4");
}

#[tokio::test]
async fn old_messages_are_not_counted() {
    let h = Harness::new();
    let moderator = h.moderator();
    let mut msg = inline(1, 7, "gif");
    msg.sent_at = Utc::now() - TimeDelta::minutes(5);

    assert_eq!(moderator.handle_message(&msg, Utc::now()).await, None);
    assert!(h.registry.lock().await.is_empty());
}
