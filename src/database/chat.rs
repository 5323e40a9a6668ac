// ABOUTME: Database operations for chat conversations and messages
// ABOUTME: Handles ownership-checked reads and transactional message appends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Conversation storage. Appending a message and bumping the conversation's
//! recency timestamp happen in one transaction: a message is never recorded
//! without updating conversation recency, and vice versa.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::Database;

/// Database representation of a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Unique conversation ID
    pub id: String,
    /// User ID who owns the conversation
    pub user_id: String,
    /// When the conversation was created (ISO 8601)
    pub created_at: String,
    /// When the conversation was last updated (ISO 8601)
    pub updated_at: String,
}

/// Database representation of a chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique message ID
    pub id: String,
    /// Conversation ID this message belongs to
    pub conversation_id: String,
    /// User ID who owns the conversation
    pub user_id: String,
    /// Role of the message sender ("user" or "assistant")
    pub role: String,
    /// Message content
    pub content: String,
    /// When the message was created (ISO 8601)
    pub created_at: String,
}

/// Summary of a conversation for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation ID
    pub id: String,
    /// When the conversation was created
    pub created_at: String,
    /// When the conversation was last updated
    pub updated_at: String,
}

fn message_from_row(row: &SqliteRow) -> MessageRecord {
    MessageRecord {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        user_id: row.get("user_id"),
        role: row.get("role"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

impl Database {
    /// Create a new conversation for the user
    ///
    /// # Errors
    ///
    /// Returns a database error if the insert fails.
    pub async fn create_conversation(&self, user_id: &str) -> AppResult<ConversationRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO conversations (id, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        Ok(ConversationRecord {
            id,
            user_id: user_id.to_owned(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a conversation by ID with ownership check
    ///
    /// Returns `None` both when the conversation does not exist and when it
    /// belongs to a different user; callers decide whether that is fatal.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, created_at, updated_at
            FROM conversations
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?;

        Ok(row.map(|r| ConversationRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }

    /// List the user's conversations, most recently updated first
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn list_conversations(&self, user_id: &str) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r"
            SELECT id, created_at, updated_at
            FROM conversations
            WHERE user_id = $1
            ORDER BY updated_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list conversations: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| ConversationSummary {
                id: r.get("id"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            })
            .collect())
    }

    /// Append a message to a conversation and bump its recency timestamp
    ///
    /// Both writes happen in one transaction. The recency bump is scoped by
    /// conversation id AND user id; zero affected rows means the pairing does
    /// not exist and the append fails without inserting anything.
    ///
    /// # Errors
    ///
    /// Returns a database error if the conversation/user pairing is absent or
    /// either write fails.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        user_id: &str,
        role: &str,
        content: &str,
    ) -> AppResult<MessageRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let bumped = sqlx::query(
            r"
            UPDATE conversations
            SET updated_at = $1
            WHERE id = $2 AND user_id = $3
            ",
        )
        .bind(&now)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to update conversation: {e}")))?;

        if bumped.rows_affected() == 0 {
            return Err(AppError::database(format!(
                "Conversation {conversation_id} does not exist for this user"
            )));
        }

        sqlx::query(
            r"
            INSERT INTO messages (id, conversation_id, user_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(user_id)
        .bind(role)
        .bind(content)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to append message: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit message append: {e}")))?;

        Ok(MessageRecord {
            id,
            conversation_id: conversation_id.to_owned(),
            user_id: user_id.to_owned(),
            role: role.to_owned(),
            content: content.to_owned(),
            created_at: now,
        })
    }

    /// Get the last `limit` messages of a conversation in chronological order
    ///
    /// Fetches the most recent rows descending by creation time (insertion
    /// order breaking ties) and reverses, bounding the scan to `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn conversation_history(
        &self,
        conversation_id: &str,
        user_id: &str,
        limit: i64,
    ) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, user_id, role, content, created_at
            FROM messages
            WHERE conversation_id = $1 AND user_id = $2
            ORDER BY created_at DESC, rowid DESC
            LIMIT $3
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to load history: {e}")))?;

        let mut messages: Vec<MessageRecord> = rows.iter().map(message_from_row).collect();
        messages.reverse();

        Ok(messages)
    }

    /// Get all messages for a conversation in chronological order
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn get_messages(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, user_id, role, content, created_at
            FROM messages
            WHERE conversation_id = $1 AND user_id = $2
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get messages: {e}")))?;

        Ok(rows.iter().map(message_from_row).collect())
    }
}
