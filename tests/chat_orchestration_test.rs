// ABOUTME: Integration tests for the chat orchestration pipeline
// ABOUTME: Exercises turn persistence semantics with a scripted LLM provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

//! Integration tests for `process_chat_message`.
//!
//! These tests verify:
//! - A successful turn persists exactly one user and one assistant message
//! - A failed agent turn persists nothing
//! - Conversation resolution denies foreign and unknown ids
//! - Tool calls run against the caller's data and are reported back

mod common;

use common::{create_test_database, ScriptStep, ScriptedProvider};
use serde_json::json;
use taskchat::database::TaskFilter;
use taskchat::errors::ErrorCode;
use taskchat::llm::FunctionCall;
use taskchat::services::chat_orchestration::process_chat_message;

const HISTORY_LIMIT: i64 = 50;

#[tokio::test]
async fn test_successful_turn_persists_user_then_assistant() {
    let db = create_test_database().await;
    let provider = ScriptedProvider::with_text("Hello! How can I help with your tasks?");

    let outcome = process_chat_message(&db, &provider, "alice", "hi there", None, HISTORY_LIMIT)
        .await
        .unwrap();

    assert_eq!(outcome.response, "Hello! How can I help with your tasks?");
    assert!(outcome.tool_calls.is_empty());

    let messages = db
        .get_messages(&outcome.conversation_id, "alice")
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "user");
    assert_eq!(messages[0].content, "hi there");
    assert_eq!(messages[1].role, "assistant");
    assert_eq!(messages[1].content, "Hello! How can I help with your tasks?");
}

#[tokio::test]
async fn test_turn_bumps_conversation_recency() {
    let db = create_test_database().await;
    let conversation = db.create_conversation("alice").await.unwrap();
    let before = conversation.updated_at.clone();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let provider = ScriptedProvider::with_text("Sure.");
    process_chat_message(
        &db,
        &provider,
        "alice",
        "hello again",
        Some(&conversation.id),
        HISTORY_LIMIT,
    )
    .await
    .unwrap();

    let after = db
        .get_conversation(&conversation.id, "alice")
        .await
        .unwrap()
        .unwrap();
    assert!(after.updated_at > before);
}

#[tokio::test]
async fn test_failed_agent_turn_persists_nothing() {
    let db = create_test_database().await;
    let conversation = db.create_conversation("alice").await.unwrap();
    let provider = ScriptedProvider::failing();

    let error = process_chat_message(
        &db,
        &provider,
        "alice",
        "add a task",
        Some(&conversation.id),
        HISTORY_LIMIT,
    )
    .await
    .unwrap_err();

    assert_eq!(error.code, ErrorCode::ExternalServiceUnavailable);

    // No orphaned user message
    let messages = db.get_messages(&conversation.id, "alice").await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let db = create_test_database().await;
    let provider = ScriptedProvider::with_text("unused");

    let error = process_chat_message(&db, &provider, "alice", "   ", None, HISTORY_LIMIT)
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn test_foreign_and_unknown_conversations_are_denied_identically() {
    let db = create_test_database().await;
    let provider = ScriptedProvider::with_text("unused");

    let alices = db.create_conversation("alice").await.unwrap();

    let foreign = process_chat_message(
        &db,
        &provider,
        "bob",
        "hi",
        Some(&alices.id),
        HISTORY_LIMIT,
    )
    .await
    .unwrap_err();
    let unknown = process_chat_message(
        &db,
        &provider,
        "bob",
        "hi",
        Some("no-such-conversation"),
        HISTORY_LIMIT,
    )
    .await
    .unwrap_err();

    assert_eq!(foreign.code, ErrorCode::PermissionDenied);
    assert_eq!(unknown.code, ErrorCode::PermissionDenied);
    assert_eq!(foreign.message, unknown.message);
}

#[tokio::test]
async fn test_tool_calling_turn_mutates_tasks_and_reports_invocations() {
    let db = create_test_database().await;
    let provider = ScriptedProvider::new(vec![
        ScriptStep::ToolCalls(vec![FunctionCall {
            name: "add_task".to_owned(),
            args: json!({"title": "Buy milk", "description": "2 liters"}),
        }]),
        ScriptStep::Text("I've created a task called 'Buy milk'.".to_owned()),
    ]);

    let outcome = process_chat_message(
        &db,
        &provider,
        "alice",
        "add a task to buy milk",
        None,
        HISTORY_LIMIT,
    )
    .await
    .unwrap();

    assert_eq!(outcome.response, "I've created a task called 'Buy milk'.");
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(outcome.tool_calls[0].name, "add_task");
    let result = outcome.tool_calls[0].result.as_deref().unwrap();
    assert!(result.contains("\"success\":true"));

    // The tool actually ran against alice's data
    let tasks = db.list_tasks("alice", TaskFilter::All).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy milk");

    // And only alice's
    let bobs = db.list_tasks("bob", TaskFilter::All).await.unwrap();
    assert!(bobs.is_empty());
}

#[tokio::test]
async fn test_multi_step_turn_reports_each_invocation_independently() {
    let db = create_test_database().await;
    let provider = ScriptedProvider::new(vec![
        ScriptStep::ToolCalls(vec![
            FunctionCall {
                name: "add_task".to_owned(),
                args: json!({"title": "One"}),
            },
            FunctionCall {
                name: "add_task".to_owned(),
                args: json!({"title": ""}),
            },
            FunctionCall {
                name: "add_task".to_owned(),
                args: json!({"title": "Three"}),
            },
        ]),
        ScriptStep::Text("Added 'One' and 'Three'; the second had no title.".to_owned()),
    ]);

    let outcome = process_chat_message(
        &db,
        &provider,
        "alice",
        "add three tasks",
        None,
        HISTORY_LIMIT,
    )
    .await
    .unwrap();

    // One invocation record per call, success or not
    assert_eq!(outcome.tool_calls.len(), 3);
    assert!(outcome.tool_calls[0]
        .result
        .as_deref()
        .unwrap()
        .contains("\"success\":true"));
    assert!(outcome.tool_calls[1]
        .result
        .as_deref()
        .unwrap()
        .contains("\"success\":false"));

    // The failed middle step did not stop the rest
    let tasks = db.list_tasks("alice", TaskFilter::All).await.unwrap();
    assert_eq!(tasks.len(), 2);
}

#[tokio::test]
async fn test_tool_surface_is_withheld_from_text_only_providers() {
    let db = create_test_database().await;
    let provider = ScriptedProvider::text_only("I can chat, but I can't touch your tasks.");

    let outcome = process_chat_message(&db, &provider, "alice", "hello", None, HISTORY_LIMIT)
        .await
        .unwrap();

    assert_eq!(
        outcome.response,
        "I can chat, but I can't touch your tasks."
    );
    assert!(outcome.tool_calls.is_empty());

    // No declarations were attached to the request
    let attachments = provider.seen_tool_attachment.lock().unwrap();
    assert_eq!(attachments.as_slice(), &[false]);
}

#[tokio::test]
async fn test_tool_surface_is_attached_for_capable_providers() {
    let db = create_test_database().await;
    let provider = ScriptedProvider::with_text("Happy to help.");

    process_chat_message(&db, &provider, "alice", "hello", None, HISTORY_LIMIT)
        .await
        .unwrap();

    let attachments = provider.seen_tool_attachment.lock().unwrap();
    assert_eq!(attachments.as_slice(), &[true]);
}

#[tokio::test]
async fn test_empty_agent_reply_substitutes_fallback() {
    let db = create_test_database().await;
    let provider = ScriptedProvider::new(vec![ScriptStep::Empty]);

    let outcome = process_chat_message(&db, &provider, "alice", "hello", None, HISTORY_LIMIT)
        .await
        .unwrap();

    assert_eq!(
        outcome.response,
        "I'm sorry, I wasn't able to generate a response."
    );

    // The fallback is persisted like any assistant reply
    let messages = db
        .get_messages(&outcome.conversation_id, "alice")
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, outcome.response);
}

#[tokio::test]
async fn test_history_is_bounded_before_reaching_the_provider() {
    let db = create_test_database().await;
    let conversation = db.create_conversation("alice").await.unwrap();
    for i in 0..8 {
        db.append_message(&conversation.id, "alice", "user", &format!("old {i}"))
            .await
            .unwrap();
    }

    let provider = ScriptedProvider::with_text("ok");
    process_chat_message(
        &db,
        &provider,
        "alice",
        "latest",
        Some(&conversation.id),
        3,
    )
    .await
    .unwrap();

    // system prompt + 3 history messages + the new message
    let counts = provider.seen_message_counts.lock().unwrap();
    assert_eq!(counts.as_slice(), &[5]);
}

#[tokio::test]
async fn test_concurrent_new_conversations_stay_distinct() {
    let db = create_test_database().await;
    let provider_a = ScriptedProvider::with_text("a");
    let provider_b = ScriptedProvider::with_text("b");

    let (a, b) = tokio::join!(
        process_chat_message(&db, &provider_a, "alice", "first", None, HISTORY_LIMIT),
        process_chat_message(&db, &provider_b, "alice", "second", None, HISTORY_LIMIT),
    );

    let a = a.unwrap();
    let b = b.unwrap();
    assert_ne!(a.conversation_id, b.conversation_id);

    // Each conversation holds exactly its own turn
    let messages_a = db.get_messages(&a.conversation_id, "alice").await.unwrap();
    let messages_b = db.get_messages(&b.conversation_id, "alice").await.unwrap();
    assert_eq!(messages_a.len(), 2);
    assert_eq!(messages_b.len(), 2);
}

#[tokio::test]
async fn test_continued_conversation_receives_prior_history() {
    let db = create_test_database().await;

    let first = ScriptedProvider::with_text("Noted.");
    let outcome = process_chat_message(&db, &first, "alice", "remember the milk", None, 50)
        .await
        .unwrap();

    let second = ScriptedProvider::with_text("You asked about milk.");
    process_chat_message(
        &db,
        &second,
        "alice",
        "what did I say?",
        Some(&outcome.conversation_id),
        50,
    )
    .await
    .unwrap();

    // system + 2 persisted turn messages + the new message
    let counts = second.seen_message_counts.lock().unwrap();
    assert_eq!(counts.as_slice(), &[4]);
}
