// ABOUTME: Executes exactly one agent turn against the LLM provider
// ABOUTME: Runs the tool loop with the user id fixed into every execution
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Agent Turn
//!
//! Drives the external agent to completion for a single user message. The
//! model may request zero or more tool calls before producing a final text
//! answer; each call is executed with the turn's fixed user id so the model
//! can only ever touch that user's data. The loop is bounded by
//! `MAX_TOOL_ITERATIONS` and never retries the provider: transport failures
//! surface as one upstream condition, and retry policy belongs to callers.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::limits;
use crate::database::{Database, MessageRecord};
use crate::errors::AppResult;
use crate::llm::{get_assistant_system_prompt, ChatMessage, ChatRequest, LlmProvider};
use crate::tools::{execute_tool, TaskTool};

/// Fixed reply used when the agent finishes without any text
const FALLBACK_RESPONSE: &str = "I'm sorry, I wasn't able to generate a response.";

/// Sampling temperature for task-management turns
const TURN_TEMPERATURE: f32 = 0.3;

/// Record of one tool call that occurred during a turn
///
/// Ephemeral: returned in the chat response payload, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name that was invoked
    pub name: String,
    /// Truncated textual summary of the tool result
    pub result: Option<String>,
}

/// Result of a completed agent turn
#[derive(Debug, Clone)]
pub struct AgentTurnResult {
    /// Final text answer (never empty; a fallback is substituted)
    pub final_text: String,
    /// Tool calls that occurred, in execution order
    pub tool_invocations: Vec<ToolInvocation>,
}

/// Build the LLM message list: system prompt, prior history, new message
fn build_turn_messages(history: &[MessageRecord], new_message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(get_assistant_system_prompt()));

    for msg in history {
        let chat_msg = match msg.role.as_str() {
            "user" => ChatMessage::user(&msg.content),
            "assistant" => ChatMessage::assistant(&msg.content),
            _ => continue,
        };
        messages.push(chat_msg);
    }

    messages.push(ChatMessage::user(new_message));
    messages
}

/// Truncate a tool result for the response payload
fn truncate_result(wire: &str) -> String {
    if wire.chars().count() > limits::TOOL_RESULT_PREVIEW_CHARS {
        wire.chars()
            .take(limits::TOOL_RESULT_PREVIEW_CHARS)
            .collect()
    } else {
        wire.to_owned()
    }
}

/// Run one agent turn for the given user
///
/// The provider may interleave tool calls with reasoning; every tool
/// execution receives the explicit database handle and this turn's `user_id`.
/// If the model produces no final text (including iteration-cap exhaustion),
/// the fixed fallback reply is substituted and the turn still succeeds.
///
/// # Errors
///
/// Returns the provider's error if the agent runtime cannot be reached or
/// errors mid-turn. Individual tool failures do not error: they are reported
/// back to the model as structured results.
pub async fn run_agent_turn(
    provider: &dyn LlmProvider,
    database: &Database,
    user_id: &str,
    history: &[MessageRecord],
    new_message: &str,
) -> AppResult<AgentTurnResult> {
    let mut messages = build_turn_messages(history, new_message);
    // Attach the tool surface only when the provider can actually call tools;
    // a text-only provider still completes the turn conversationally
    let tools = provider
        .capabilities()
        .supports_function_calling()
        .then(|| vec![TaskTool::declarations()]);
    let mut tool_invocations = Vec::new();

    for iteration in 0..limits::MAX_TOOL_ITERATIONS {
        let request = ChatRequest::new(messages.clone()).with_temperature(TURN_TEMPERATURE);
        let response = provider.complete_with_tools(&request, tools.clone()).await?;

        if let Some(function_calls) = response.function_calls {
            if !function_calls.is_empty() {
                info!(
                    "Iteration {}: executing {} tool calls",
                    iteration,
                    function_calls.len()
                );

                // Keep any interleaved assistant text in the transcript
                if let Some(ref text) = response.content {
                    if !text.is_empty() {
                        messages.push(ChatMessage::assistant(text));
                    }
                }

                for call in &function_calls {
                    debug!("Executing tool: {}", call.name);
                    let outcome = execute_tool(database, user_id, &call.name, &call.args).await;
                    let wire = outcome.to_wire();

                    tool_invocations.push(ToolInvocation {
                        name: call.name.clone(),
                        result: Some(truncate_result(&wire)),
                    });

                    messages.push(ChatMessage::user(format!(
                        "[Tool Result for {}]: {wire}",
                        call.name
                    )));
                }
                continue;
            }
        }

        // No function calls - the turn is complete
        let text = response.content.unwrap_or_default();
        let final_text = if text.trim().is_empty() {
            FALLBACK_RESPONSE.to_owned()
        } else {
            text
        };
        return Ok(AgentTurnResult {
            final_text,
            tool_invocations,
        });
    }

    info!(
        "Tool iteration cap reached after {} calls; substituting fallback reply",
        tool_invocations.len()
    );
    Ok(AgentTurnResult {
        final_text: FALLBACK_RESPONSE.to_owned(),
        tool_invocations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_turn_messages_order_and_roles() {
        let history = vec![
            MessageRecord {
                id: "m1".into(),
                conversation_id: "c1".into(),
                user_id: "u1".into(),
                role: "user".into(),
                content: "add a task".into(),
                created_at: "2025-01-01T00:00:00+00:00".into(),
            },
            MessageRecord {
                id: "m2".into(),
                conversation_id: "c1".into(),
                user_id: "u1".into(),
                role: "assistant".into(),
                content: "Done.".into(),
                created_at: "2025-01-01T00:00:01+00:00".into(),
            },
        ];

        let messages = build_turn_messages(&history, "list my tasks");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role.as_str(), "system");
        assert_eq!(messages[1].content, "add a task");
        assert_eq!(messages[2].role.as_str(), "assistant");
        assert_eq!(messages[3].content, "list my tasks");
    }

    #[test]
    fn test_truncate_result_bounds_length() {
        let long = "x".repeat(500);
        let truncated = truncate_result(&long);
        assert_eq!(
            truncated.chars().count(),
            limits::TOOL_RESULT_PREVIEW_CHARS
        );

        let short = "short";
        assert_eq!(truncate_result(short), "short");
    }
}
