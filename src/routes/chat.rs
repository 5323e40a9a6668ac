// ABOUTME: Chat route handlers for conversation management and message turns
// ABOUTME: Thin HTTP layer over the chat orchestration service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Chat routes
//!
//! `POST /api/chat` runs one complete turn; the conversation endpoints expose
//! the user's chat history. All handlers require an authenticated user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::chat_orchestration::process_chat_message;
use crate::services::ToolInvocation;

use super::{AppState, AuthenticatedUser};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    /// The user's message text
    pub message: String,
    /// Existing conversation ID to continue, or null to start new
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Response for a completed chat turn
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    /// The conversation ID (new or existing)
    pub conversation_id: String,
    /// The assistant's response text
    pub response: String,
    /// Tool calls invoked during this exchange
    pub tool_calls: Vec<ToolInvocation>,
}

/// Summary of a conversation for listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationSummaryResponse {
    /// Conversation ID
    pub id: String,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

/// Response for listing conversations
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationListResponse {
    /// List of conversations, most recently updated first
    pub conversations: Vec<ConversationSummaryResponse>,
    /// Total count
    pub total: usize,
}

/// A single message in a conversation detail
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message ID
    pub id: String,
    /// Role (user/assistant)
    pub role: String,
    /// Message content
    pub content: String,
    /// Creation timestamp
    pub created_at: String,
}

/// Full conversation with chronological messages
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationDetailResponse {
    /// Conversation ID
    pub id: String,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
    /// Messages in chronological order
    pub messages: Vec<MessageResponse>,
}

// ============================================================================
// Chat Routes
// ============================================================================

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    #[must_use]
    pub fn routes(state: AppState) -> Router {
        Router::new()
            .route("/api/chat", post(Self::send_message))
            .route("/api/chat/conversations", get(Self::list_conversations))
            .route(
                "/api/chat/conversations/:conversation_id",
                get(Self::get_conversation),
            )
            .with_state(state)
    }

    /// Send a message and run one complete agent turn
    async fn send_message(
        State(state): State<AppState>,
        user: AuthenticatedUser,
        Json(request): Json<ChatTurnRequest>,
    ) -> Result<Response, AppError> {
        let outcome = process_chat_message(
            &state.database,
            state.llm.as_ref(),
            &user.user_id,
            &request.message,
            request.conversation_id.as_deref(),
            state.config.max_conversation_history,
        )
        .await?;

        let response = ChatTurnResponse {
            conversation_id: outcome.conversation_id,
            response: outcome.response,
            tool_calls: outcome.tool_calls,
        };

        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// List the user's conversations
    async fn list_conversations(
        State(state): State<AppState>,
        user: AuthenticatedUser,
    ) -> Result<Response, AppError> {
        let conversations = state.database.list_conversations(&user.user_id).await?;

        let total = conversations.len();
        let response = ConversationListResponse {
            conversations: conversations
                .into_iter()
                .map(|c| ConversationSummaryResponse {
                    id: c.id,
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                })
                .collect(),
            total,
        };

        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Get a conversation with its full message history
    async fn get_conversation(
        State(state): State<AppState>,
        user: AuthenticatedUser,
        Path(conversation_id): Path<String>,
    ) -> Result<Response, AppError> {
        let conversation = state
            .database
            .get_conversation(&conversation_id, &user.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;

        let messages = state
            .database
            .get_messages(&conversation_id, &user.user_id)
            .await?;

        let response = ConversationDetailResponse {
            id: conversation.id,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            messages: messages
                .into_iter()
                .map(|m| MessageResponse {
                    id: m.id,
                    role: m.role,
                    content: m.content,
                    created_at: m.created_at,
                })
                .collect(),
        };

        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
