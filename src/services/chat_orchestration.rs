// ABOUTME: Chat orchestration service for a complete request/response turn
// ABOUTME: Resolves the conversation, runs the agent, persists both messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Chat Orchestration
//!
//! The single entry point for a chat turn. A turn moves strictly through
//! resolve -> load history -> agent turn -> persist; there is no retry loop
//! within a turn, and a failed agent turn persists nothing so a user message
//! can never sit in storage without its reply.

use tracing::{info, warn};

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::llm::LlmProvider;
use crate::services::agent::{run_agent_turn, ToolInvocation};

/// Reply sent to callers when the agent runtime cannot complete a turn
const UPSTREAM_UNAVAILABLE_MESSAGE: &str =
    "The AI service is temporarily unavailable. Please try again in a moment.";

/// Result of a completed chat turn
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// The conversation id (newly created or resolved)
    pub conversation_id: String,
    /// The assistant's final text answer
    pub response: String,
    /// Tool calls that occurred during the turn
    pub tool_calls: Vec<ToolInvocation>,
}

/// Process one user chat message and return the assistant's reply
///
/// Resolves or creates the conversation, loads bounded history, drives the
/// agent turn, and persists the user and assistant messages in that order.
///
/// # Errors
///
/// - `InvalidInput` if the message is blank after trimming
/// - `PermissionDenied` if the supplied conversation id does not resolve for
///   this user (absent and foreign-owned are indistinguishable by design)
/// - `ExternalServiceUnavailable` if the agent runtime fails; nothing is
///   persisted on this path
/// - `DatabaseError` if either message write fails after a successful turn
pub async fn process_chat_message(
    database: &Database,
    provider: &dyn LlmProvider,
    user_id: &str,
    message: &str,
    conversation_id: Option<&str>,
    history_limit: i64,
) -> AppResult<ChatOutcome> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::invalid_input(
            "Message cannot be empty or whitespace only",
        ));
    }

    // Resolve or create the conversation. A missing or foreign-owned
    // conversation is one indistinguishable denial so conversation ids of
    // other users cannot be probed.
    let conversation = match conversation_id {
        Some(id) => database.get_conversation(id, user_id).await?.ok_or_else(|| {
            AppError::permission_denied("Conversation not found or access denied")
        })?,
        None => database.create_conversation(user_id).await?,
    };

    let history = database
        .conversation_history(&conversation.id, user_id, history_limit)
        .await?;

    let turn = run_agent_turn(provider, database, user_id, &history, message)
        .await
        .map_err(|e| {
            warn!("Agent turn failed for conversation {}: {e}", conversation.id);
            AppError::upstream_unavailable(UPSTREAM_UNAVAILABLE_MESSAGE).with_source(e)
        })?;

    // Persist the turn: user message first, then the assistant reply. Either
    // write failing fails the whole turn as a storage error distinct from an
    // upstream failure.
    database
        .append_message(&conversation.id, user_id, "user", message)
        .await?;
    database
        .append_message(&conversation.id, user_id, "assistant", &turn.final_text)
        .await?;

    info!(
        "Chat turn complete: conversation={}, tool_calls={}",
        conversation.id,
        turn.tool_invocations.len()
    );

    Ok(ChatOutcome {
        conversation_id: conversation.id,
        response: turn.final_text,
        tool_calls: turn.tool_invocations,
    })
}
