// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline scenarios against in-memory storage and a scripted
//! backend.

use std::sync::Arc;

use goblin_agent::{MessagePipeline, Outcome, ReferralBonusApplier};
use goblin_context::ContextAssembler;
use goblin_core::{InboundMessage, Role};
use goblin_guard::{AbuseGuard, GuardLimits};
use goblin_quota::QuotaLedger;
use goblin_storage::queries::{conversations, grants, referrals, turns, users};
use goblin_test_utils::TestHarness;

const PROMPT: &str = "You are a helpful AI assistant.";

fn pipeline(harness: &TestHarness) -> MessagePipeline {
    let ledger = QuotaLedger::new(harness.db.clone(), "Free".to_string());
    MessagePipeline::new(
        harness.db.clone(),
        Arc::new(AbuseGuard::new(GuardLimits::default())),
        ledger.clone(),
        ContextAssembler::new(harness.db.clone(), PROMPT.to_string()),
        harness.backend.clone(),
        ReferralBonusApplier::new(harness.db.clone(), ledger, 5),
    )
}

#[tokio::test]
async fn first_message_completes_one_exchange() {
    let harness = TestHarness::with_replies(vec!["Hello Alice!".to_string()])
        .await
        .unwrap();
    let pipeline = pipeline(&harness);

    let inbound = InboundMessage::text("tg-1", "Hi, I'm Alice");
    let outcome = pipeline.handle_message(&inbound).await;
    assert_eq!(outcome, Outcome::Reply("Hello Alice!".to_string()));

    let user = users::get_by_telegram_id(&harness.db, "tg-1")
        .await
        .unwrap()
        .unwrap();

    // Free allotment of 10 is down to 9.
    let grant = grants::get_active(&harness.db, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.messages_left, 9);

    // Exactly one user turn and one assistant turn, in order.
    let conversation = conversations::get_or_create_default(&harness.db, user.id)
        .await
        .unwrap();
    let history = turns::latest(&harness.db, conversation.id, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "Hi, I'm Alice");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "Hello Alice!");

    // No referral side effects for an unreferred user.
    assert!(referrals::pending_for_referee(&harness.db, user.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn context_sent_to_backend_includes_inbound_turn() {
    let harness = TestHarness::new().await.unwrap();
    let pipeline = pipeline(&harness);

    pipeline
        .handle_message(&InboundMessage::text("tg-1", "What's the capital of Peru?"))
        .await;

    let contexts = harness.backend.contexts().await;
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0][0].content, PROMPT);
    assert_eq!(
        contexts[0].last().unwrap().content,
        "What's the capital of Peru?"
    );
}

#[tokio::test]
async fn referred_user_first_exchange_credits_referrer() {
    let harness = TestHarness::new().await.unwrap();
    let pipeline = pipeline(&harness);

    let referrer = harness.user("tg-ref").await.unwrap();
    let referee = harness.user("tg-new").await.unwrap();
    referrals::create_if_absent(&harness.db, referrer.id, referee.id)
        .await
        .unwrap();
    let ledger = QuotaLedger::new(harness.db.clone(), "Free".to_string());
    ledger.ensure_grant(referrer.id).await.unwrap();

    let outcome = pipeline
        .handle_message(&InboundMessage::text("tg-new", "first message"))
        .await;
    assert!(matches!(outcome, Outcome::Reply(_)));

    // Record resolved, referrer credited by exactly 5.
    assert!(referrals::pending_for_referee(&harness.db, referee.id)
        .await
        .unwrap()
        .is_empty());
    let grant = grants::get_active(&harness.db, referrer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.messages_left, 15);

    // A second exchange does not credit again.
    pipeline
        .handle_message(&InboundMessage::text("tg-new", "second message"))
        .await;
    let grant = grants::get_active(&harness.db, referrer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.messages_left, 15);
}

#[tokio::test]
async fn exhausted_quota_declines_with_plan_notice() {
    let harness = TestHarness::new().await.unwrap();
    let pipeline = pipeline(&harness);

    let user = harness.user("tg-1").await.unwrap();
    let ledger = QuotaLedger::new(harness.db.clone(), "Free".to_string());
    ledger.ensure_grant(user.id).await.unwrap();
    for _ in 0..10 {
        ledger.debit(user.id).await.unwrap();
    }

    let outcome = pipeline
        .handle_message(&InboundMessage::text("tg-1", "one more?"))
        .await;
    match outcome {
        Outcome::Notice(text) => {
            assert!(text.contains("Free"), "notice names the plan: {text}");
            assert!(text.contains('0'), "notice names the balance: {text}");
        }
        other => panic!("expected quota notice, got {other:?}"),
    }

    // Declined messages leave no turns behind.
    let conversation = conversations::get_or_create_default(&harness.db, user.id)
        .await
        .unwrap();
    assert_eq!(turns::count(&harness.db, conversation.id).await.unwrap(), 0);
}

#[tokio::test]
async fn guard_warning_suppresses_without_touching_storage() {
    let harness = TestHarness::new().await.unwrap();
    let pipeline = pipeline(&harness);

    // The 6th message within the window draws the first warning.
    for _ in 0..5 {
        let outcome = pipeline
            .handle_message(&InboundMessage::text("tg-1", "hi"))
            .await;
        assert!(matches!(outcome, Outcome::Reply(_)));
    }
    let outcome = pipeline
        .handle_message(&InboundMessage::text("tg-1", "hi again"))
        .await;
    match outcome {
        Outcome::Notice(text) => assert!(text.contains("Warning 1"), "got: {text}"),
        other => panic!("expected warning notice, got {other:?}"),
    }

    // The suppressed message produced no turns and no debit.
    let user = users::get_by_telegram_id(&harness.db, "tg-1")
        .await
        .unwrap()
        .unwrap();
    let conversation = conversations::get_or_create_default(&harness.db, user.id)
        .await
        .unwrap();
    assert_eq!(turns::count(&harness.db, conversation.id).await.unwrap(), 10);
    let grant = grants::get_active(&harness.db, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.messages_left, 5);
}

#[tokio::test]
async fn apology_reply_is_persisted_and_debited() {
    // The backend contract converts failures into apology text, so the
    // pipeline treats it like any reply: persisted and charged.
    let apology = "Sorry, I couldn't come up with a reply just now.";
    let harness = TestHarness::with_replies(vec![apology.to_string()])
        .await
        .unwrap();
    let pipeline = pipeline(&harness);

    let outcome = pipeline
        .handle_message(&InboundMessage::text("tg-1", "hello?"))
        .await;
    assert_eq!(outcome, Outcome::Reply(apology.to_string()));

    let user = users::get_by_telegram_id(&harness.db, "tg-1")
        .await
        .unwrap()
        .unwrap();
    let grant = grants::get_active(&harness.db, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.messages_left, 9);
}

#[tokio::test]
async fn image_exchange_debits_without_persisting_turns() {
    let harness = TestHarness::with_replies(vec!["a red bicycle".to_string()])
        .await
        .unwrap();
    let pipeline = pipeline(&harness);

    let inbound = InboundMessage::text("tg-1", "");
    let outcome = pipeline
        .handle_image(&inbound, "https://img.example/a.png", Some("What is it?"), false)
        .await;
    assert_eq!(outcome, Outcome::Reply("a red bicycle".to_string()));

    let user = users::get_by_telegram_id(&harness.db, "tg-1")
        .await
        .unwrap()
        .unwrap();
    let grant = grants::get_active(&harness.db, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.messages_left, 9);

    let conversation = conversations::get_or_create_default(&harness.db, user.id)
        .await
        .unwrap();
    assert_eq!(turns::count(&harness.db, conversation.id).await.unwrap(), 0);

    let calls = harness.backend.image_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt.as_deref(), Some("What is it?"));
}

#[tokio::test]
async fn concurrent_first_messages_keep_invariants() {
    let harness = TestHarness::new().await.unwrap();
    let pipeline = pipeline(&harness);

    let one = InboundMessage::text("tg-1", "one");
    let two = InboundMessage::text("tg-1", "two");
    let three = InboundMessage::text("tg-1", "three");
    let (a, b, c) = tokio::join!(
        pipeline.handle_message(&one),
        pipeline.handle_message(&two),
        pipeline.handle_message(&three),
    );
    for outcome in [a, b, c] {
        assert!(matches!(outcome, Outcome::Reply(_)));
    }

    let user = users::get_by_telegram_id(&harness.db, "tg-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grants::active_count(&harness.db, user.id).await.unwrap(), 1);
    let grant = grants::get_active(&harness.db, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.messages_left, 7);

    let conversation = conversations::get_or_create_default(&harness.db, user.id)
        .await
        .unwrap();
    assert_eq!(turns::count(&harness.db, conversation.id).await.unwrap(), 6);
}
