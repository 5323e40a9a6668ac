// ABOUTME: Integration tests for conversation and message storage
// ABOUTME: Covers ownership resolution, transactional appends, bounded history
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::create_test_database;

#[tokio::test]
async fn test_get_conversation_enforces_ownership() {
    let db = create_test_database().await;

    let conversation = db.create_conversation("alice").await.unwrap();

    // Owner resolves it
    let resolved = db
        .get_conversation(&conversation.id, "alice")
        .await
        .unwrap();
    assert!(resolved.is_some());
    assert_eq!(resolved.unwrap().user_id, "alice");

    // A different user gets None, not an error
    let foreign = db.get_conversation(&conversation.id, "bob").await.unwrap();
    assert!(foreign.is_none());

    // An unknown id gets None as well
    let missing = db.get_conversation("no-such-id", "alice").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_append_bumps_conversation_recency() {
    let db = create_test_database().await;

    let conversation = db.create_conversation("alice").await.unwrap();
    let created_at = conversation.updated_at.clone();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let message = db
        .append_message(&conversation.id, "alice", "user", "hello")
        .await
        .unwrap();
    assert_eq!(message.role, "user");
    assert_eq!(message.content, "hello");

    let after = db
        .get_conversation(&conversation.id, "alice")
        .await
        .unwrap()
        .unwrap();
    assert!(
        after.updated_at > created_at,
        "recency did not advance: {} vs {created_at}",
        after.updated_at
    );
}

#[tokio::test]
async fn test_append_fails_for_missing_pairing_and_inserts_nothing() {
    let db = create_test_database().await;

    let conversation = db.create_conversation("alice").await.unwrap();

    // Unknown conversation
    assert!(db
        .append_message("no-such-id", "alice", "user", "hello")
        .await
        .is_err());

    // Conversation owned by someone else
    assert!(db
        .append_message(&conversation.id, "bob", "user", "hello")
        .await
        .is_err());

    // Neither attempt recorded a message
    let messages = db.get_messages(&conversation.id, "alice").await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_history_returns_most_recent_in_chronological_order() {
    let db = create_test_database().await;

    let conversation = db.create_conversation("alice").await.unwrap();
    for i in 1..=7 {
        db.append_message(&conversation.id, "alice", "user", &format!("message {i}"))
            .await
            .unwrap();
    }

    let history = db
        .conversation_history(&conversation.id, "alice", 5)
        .await
        .unwrap();

    // Exactly the five most recent, oldest first
    assert_eq!(history.len(), 5);
    let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["message 3", "message 4", "message 5", "message 6", "message 7"]
    );

    // Fewer messages than the limit returns all of them
    let all = db
        .conversation_history(&conversation.id, "alice", 50)
        .await
        .unwrap();
    assert_eq!(all.len(), 7);
    assert_eq!(all[0].content, "message 1");
}

#[tokio::test]
async fn test_history_is_scoped_to_the_owner() {
    let db = create_test_database().await;

    let conversation = db.create_conversation("alice").await.unwrap();
    db.append_message(&conversation.id, "alice", "user", "private")
        .await
        .unwrap();

    let foreign = db
        .conversation_history(&conversation.id, "bob", 50)
        .await
        .unwrap();
    assert!(foreign.is_empty());
}

#[tokio::test]
async fn test_list_conversations_most_recent_first() {
    let db = create_test_database().await;

    let first = db.create_conversation("alice").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = db.create_conversation("alice").await.unwrap();
    db.create_conversation("bob").await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    db.append_message(&first.id, "alice", "user", "reviving the old thread")
        .await
        .unwrap();

    let summaries = db.list_conversations("alice").await.unwrap();
    assert_eq!(summaries.len(), 2);
    // The append moved the first conversation back to the top
    assert_eq!(summaries[0].id, first.id);
    assert_eq!(summaries[1].id, second.id);
}
