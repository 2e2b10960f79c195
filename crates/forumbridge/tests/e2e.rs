// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete sync pipeline.
//!
//! Each test creates an isolated TestHarness with a temp SQLite store and
//! mock platforms. Tests are independent and order-insensitive.

use forumbridge_core::{ContentEvent, EventOutcome, IgnoreReason, MappingKind};
use forumbridge_test_utils::{
    DestinationOp, Failure, MockDestination, MockSource, TestHarness, human, message_at,
};
use proptest::prelude::*;

const SPACE: &str = "spaces/AAA";
const THREAD: &str = "spaces/AAA/threads/t1";
const DM: &str = "spaces/DM1";

fn group_source() -> MockSource {
    MockSource::new().with_space(SPACE, "Engineering", "SPACE")
}

fn thread_message(n: usize, secs: i64) -> forumbridge_core::Message {
    let ann = human("users/1", "Ann Lee");
    message_at(
        &format!("{SPACE}/messages/{n}"),
        SPACE,
        Some(THREAD),
        &ann,
        &format!("message {n}"),
        secs,
    )
}

async fn group_harness(source: MockSource) -> TestHarness {
    TestHarness::builder()
        .with_source(source)
        .with_binding(SPACE)
        .build()
        .await
        .unwrap()
}

// ---- Idempotency ----

#[tokio::test]
async fn second_pass_creates_nothing() {
    let source = group_source();
    for n in 1..=4 {
        source.push(thread_message(n, n as i64));
    }
    let harness = group_harness(source).await;

    let first = harness.run_pass().await.unwrap();
    assert_eq!(first.created(), 4);

    let second = harness.run_pass().await.unwrap();
    assert_eq!(second.created(), 0);
    assert_eq!(harness.destination.topics().await.len(), 1);
    assert_eq!(harness.destination.posts().await.len(), 4);
    assert_eq!(harness.destination.calls(DestinationOp::CreateTopic).await, 1);
    assert_eq!(harness.destination.calls(DestinationOp::CreatePost).await, 3);
}

#[tokio::test]
async fn idempotent_across_restart() {
    let source = group_source();
    source.push(thread_message(1, 1));
    source.push(thread_message(2, 2));
    let mut harness = group_harness(source).await;

    harness.run_pass().await.unwrap();
    harness.restart().await.unwrap();
    let report = harness.run_pass().await.unwrap();

    assert_eq!(report.created(), 0);
    assert_eq!(harness.destination.posts().await.len(), 2);
    assert_eq!(harness.mappings(MappingKind::MessagePost).await.unwrap().len(), 2);
}

// ---- Order preservation ----

#[tokio::test]
async fn posts_follow_origin_timestamps() {
    let source = group_source();
    // Pushed out of order; the origin lists by creation time.
    source.push(thread_message(3, 30));
    source.push(thread_message(1, 10));
    source.push(thread_message(2, 20));
    let harness = group_harness(source).await;

    harness.run_pass().await.unwrap();

    let topics = harness.destination.topics().await;
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].title, "message 1");
    let raws: Vec<String> = harness
        .destination
        .posts_in(&topics[0].id)
        .await
        .into_iter()
        .map(|p| p.raw)
        .collect();
    assert_eq!(raws, vec!["message 1\n\nmessage 1", "message 2", "message 3"]);
}

// ---- No cycles ----

#[tokio::test]
async fn relayed_post_is_not_synced_back() {
    let source = group_source();
    source.push(thread_message(1, 1));
    let harness = group_harness(source).await;
    harness.run_pass().await.unwrap();

    let topic_id = harness.destination.topics().await[0].id.clone();
    let event = ContentEvent::PostCreated {
        post_id: "9001".into(),
        topic_id: topic_id.clone(),
        username: "bob".into(),
        raw: "reply from the forum".into(),
    };
    let outcome = harness.deliver(&event).await;
    assert!(outcome.is_accepted(), "unexpected outcome: {outcome:?}");

    let relayed = harness.source.created_messages().await;
    assert_eq!(relayed.len(), 1);
    assert_eq!(relayed[0].thread_id.as_deref(), Some(THREAD));
    assert_eq!(relayed[0].text, "*bob*: reply from the forum");

    // The relayed origin message is already mapped to post 9001.
    let report = harness.run_pass().await.unwrap();
    assert_eq!(report.created(), 0);
    assert_eq!(harness.destination.posts_in(&topic_id).await.len(), 1);

    // A redelivery of the same post is recognized.
    assert_eq!(
        harness.deliver(&event).await,
        EventOutcome::ignored(IgnoreReason::AlreadySynced)
    );
}

#[tokio::test]
async fn service_authored_content_is_ignored() {
    let source = group_source();
    source.push(thread_message(1, 1));
    let harness = group_harness(source).await;
    harness.run_pass().await.unwrap();
    let topic_id = harness.destination.topics().await[0].id.clone();

    let outcome = harness
        .deliver(&ContentEvent::PostCreated {
            post_id: "9002".into(),
            topic_id,
            username: "System".into(),
            raw: "posted by the bridge".into(),
        })
        .await;

    assert_eq!(outcome, EventOutcome::ignored(IgnoreReason::SelfOrigin));
    assert!(harness.source.created_messages().await.is_empty());
}

#[tokio::test]
async fn synced_posts_are_recognized_on_delivery() {
    let source = group_source();
    source.push(thread_message(1, 1));
    source.push(thread_message(2, 2));
    let harness = group_harness(source).await;
    harness.run_pass().await.unwrap();

    // Discourse notifies about the post the pass itself created.
    let post = harness.destination.posts().await[1].clone();
    let outcome = harness
        .deliver(&ContentEvent::PostCreated {
            post_id: post.id,
            topic_id: post.topic_id,
            username: post.username,
            raw: post.raw,
        })
        .await;

    assert!(matches!(outcome, EventOutcome::Ignored { .. }));
    assert!(harness.source.created_messages().await.is_empty());
}

#[tokio::test]
async fn unmapped_topic_is_ignored() {
    let harness = group_harness(group_source()).await;
    let outcome = harness
        .deliver(&ContentEvent::PostCreated {
            post_id: "1".into(),
            topic_id: "404".into(),
            username: "bob".into(),
            raw: "hello".into(),
        })
        .await;
    assert_eq!(outcome, EventOutcome::ignored(IgnoreReason::UnmappedContainer));
}

// ---- Collision handling ----

#[tokio::test]
async fn taken_handle_gets_suffix() {
    let source = MockSource::new().with_space(DM, "", "DIRECT_MESSAGE");
    let sam = human("users/7", "User@123!");
    source.push(message_at(&format!("{DM}/messages/1"), DM, None, &sam, "hi", 1));
    let destination = MockDestination::new().with_user("user123", Some("someone@elsewhere.org"));

    let harness = TestHarness::builder()
        .with_source(source)
        .with_destination(destination)
        .with_binding(DM)
        .build()
        .await
        .unwrap();
    harness.run_pass().await.unwrap();

    let users = harness.mappings(MappingKind::User).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].destination_id, "user123_1");
    assert!(harness.destination.user("user123_1").await.is_some());
}

#[tokio::test]
async fn same_display_name_distinct_participants() {
    let source = MockSource::new().with_space(DM, "", "DIRECT_MESSAGE");
    let first = human("users/1", "Alex Kim");
    let second = human("users/2", "Alex Kim");
    source.push(message_at(&format!("{DM}/messages/1"), DM, None, &first, "one", 1));
    source.push(message_at(&format!("{DM}/messages/2"), DM, None, &second, "two", 2));

    let harness = TestHarness::builder()
        .with_source(source)
        .with_binding(DM)
        .build()
        .await
        .unwrap();
    harness.run_pass().await.unwrap();

    let mut handles: Vec<String> = harness
        .mappings(MappingKind::User)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.destination_id)
        .collect();
    handles.sort();
    assert_eq!(handles, vec!["alex_kim", "alex_kim_1"]);
}

// ---- Identity scenarios ----

#[tokio::test]
async fn display_names_become_handles() {
    let source = MockSource::new().with_space(DM, "", "DIRECT_MESSAGE");
    let odd = human("users/1", "User@123!");
    let short = human("users/2", "A");
    source.push(message_at(&format!("{DM}/messages/1"), DM, None, &odd, "hello", 1));
    source.push(message_at(&format!("{DM}/messages/2"), DM, None, &short, "hey", 2));

    let harness = TestHarness::builder()
        .with_source(source)
        .with_binding(DM)
        .build()
        .await
        .unwrap();
    harness.run_pass().await.unwrap();

    assert!(harness.destination.user("user123").await.is_some());
    let padded = harness
        .mappings(MappingKind::User)
        .await
        .unwrap()
        .into_iter()
        .find(|m| m.origin_id == "users/2")
        .unwrap();
    assert!(padded.destination_id.len() >= 3);
    assert!(padded.destination_id.starts_with('a'));
}

#[tokio::test]
async fn direct_space_with_two_authors() {
    let source = MockSource::new().with_space(DM, "", "DIRECT_MESSAGE");
    let p1 = human("users/1", "Priya Nair");
    let p2 = human("users/2", "Tom Otte");
    source.push(message_at(&format!("{DM}/messages/1"), DM, None, &p1, "hi Tom", 1));
    source.push(message_at(&format!("{DM}/messages/2"), DM, None, &p2, "hi Priya", 2));

    let harness = TestHarness::builder()
        .with_source(source)
        .with_binding(DM)
        .build()
        .await
        .unwrap();
    harness.run_pass().await.unwrap();

    assert_eq!(harness.mappings(MappingKind::SpaceChannel).await.unwrap().len(), 1);
    assert_eq!(harness.mappings(MappingKind::User).await.unwrap().len(), 2);
    assert!(harness.mappings(MappingKind::SpaceCategory).await.unwrap().is_empty());

    let channels = harness.destination.channels().await;
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].usernames, vec!["priya_nair", "tom_otte"]);
    let chat = harness.destination.chat_messages().await;
    assert_eq!(chat.len(), 2);
    assert_eq!(chat[0].username, "priya_nair");
    assert_eq!(chat[1].username, "tom_otte");
}

// ---- Crash safety ----

#[tokio::test]
async fn interrupted_pass_resumes_with_remaining_posts() {
    const M: usize = 5;
    let source = group_source();
    for n in 1..=M {
        source.push(thread_message(n, n as i64));
    }
    let destination = MockDestination::new();
    // Message 3 hits an outage that outlasts the retries; the space aborts there.
    destination.fail_content("message 3", Failure::Transient).await;

    let mut harness = TestHarness::builder()
        .with_source(source)
        .with_destination(destination)
        .with_binding(SPACE)
        .build()
        .await
        .unwrap();

    let report = harness.run_pass().await.unwrap();
    assert_eq!(report.failures.len(), 1);
    let mapped = harness.mappings(MappingKind::MessagePost).await.unwrap().len();
    assert_eq!(mapped, 2);

    harness.restart().await.unwrap();
    harness.destination.clear_failures().await;
    let resumed = harness.run_pass().await.unwrap();

    assert!(resumed.failures.is_empty());
    assert_eq!(resumed.created(), M - mapped);
    assert_eq!(harness.destination.posts().await.len(), M);
    assert_eq!(harness.mappings(MappingKind::MessagePost).await.unwrap().len(), M);
}

#[tokio::test]
async fn failed_post_is_retried_next_pass() {
    let source = group_source();
    for n in 1..=4 {
        source.push(thread_message(n, n as i64));
    }
    let destination = MockDestination::new();
    destination.fail_content("message 2", Failure::Permanent).await;
    let harness = TestHarness::builder()
        .with_source(source)
        .with_destination(destination)
        .with_binding(SPACE)
        .build()
        .await
        .unwrap();

    let first = harness.run_pass().await.unwrap();
    assert_eq!(first.created(), 3);
    assert_eq!(first.failed_entities(), 1);

    harness.destination.clear_failures().await;
    let second = harness.run_pass().await.unwrap();
    assert_eq!(second.created(), 1);
    assert_eq!(harness.destination.posts().await.len(), 4);
}

#[tokio::test]
async fn revoked_credentials_abort_the_pass() {
    let source = group_source();
    source.push(thread_message(1, 1));
    let destination = MockDestination::new();
    destination
        .fail_next(DestinationOp::FindCategory, Failure::Unauthorized)
        .await;
    let harness = TestHarness::builder()
        .with_source(source)
        .with_destination(destination)
        .with_binding(SPACE)
        .build()
        .await
        .unwrap();

    assert!(harness.run_pass().await.is_err());
    assert!(harness.mappings(MappingKind::SpaceCategory).await.unwrap().is_empty());

    // Credentials restored: the next pass picks everything up.
    let report = harness.run_pass().await.unwrap();
    assert_eq!(report.created(), 1);
}

// ---- Properties ----

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Whatever order messages arrive in, one pass lays them out by creation
    /// time and a second pass adds nothing.
    #[test]
    fn pass_is_ordered_and_idempotent(offsets in prop::collection::hash_set(1i64..10_000, 1..12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let source = group_source();
            let mut expected: Vec<(i64, usize)> = Vec::new();
            for (n, secs) in offsets.iter().copied().enumerate() {
                source.push(thread_message(n, secs));
                expected.push((secs, n));
            }
            expected.sort();
            let harness = group_harness(source).await;

            let first = harness.run_pass().await.unwrap();
            prop_assert_eq!(first.created(), expected.len());

            let topic = harness.destination.topics().await[0].clone();
            let posts = harness.destination.posts_in(&topic.id).await;
            prop_assert_eq!(posts.len(), expected.len());
            for (post, (_, n)) in posts.iter().zip(&expected).skip(1) {
                prop_assert_eq!(&post.raw, &format!("message {n}"));
            }

            let second = harness.run_pass().await.unwrap();
            prop_assert_eq!(second.created(), 0);
            prop_assert_eq!(harness.destination.posts().await.len(), expected.len());
            Ok(())
        })?;
    }
}
