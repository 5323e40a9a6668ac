// ABOUTME: Database operations for user-scoped task records
// ABOUTME: Every query and mutation filters by owning user id first
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Task storage. The owning user id is the sole isolation mechanism between
//! tenants, so it is a mandatory predicate on every statement here.

use crate::constants::limits;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::Database;

/// Database representation of a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique task ID
    pub id: String,
    /// User ID who owns the task
    pub user_id: String,
    /// Task title
    pub title: String,
    /// Optional task description
    pub description: Option<String>,
    /// Whether the task is completed
    pub completed: bool,
    /// When the task was created (ISO 8601)
    pub created_at: String,
    /// When the task was last updated (ISO 8601)
    pub updated_at: String,
}

/// Completion filter for task listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    /// All tasks regardless of completion state
    All,
    /// Only completed tasks
    Completed,
    /// Only incomplete tasks
    Incomplete,
}

impl TaskFilter {
    /// Parse a filter value; unknown values fall back to `All` so a tool
    /// call with an invented filter stays usable
    #[must_use]
    pub fn from_value(value: &str) -> Self {
        match value {
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            _ => Self::All,
        }
    }

    /// String representation echoed back in tool results
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
        }
    }
}

fn task_from_row(row: &SqliteRow) -> TaskRecord {
    TaskRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        completed: row.get("completed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl Database {
    /// Create a new task for the user
    ///
    /// The title must be non-empty after trimming and at most 200 characters;
    /// title and description are trimmed before storage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty or oversized title, or a database
    /// error if the insert fails.
    pub async fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> AppResult<TaskRecord> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::invalid_input("Task title cannot be empty"));
        }
        if title.chars().count() > limits::MAX_TITLE_LENGTH {
            return Err(AppError::invalid_input(format!(
                "Task title must be {} characters or fewer",
                limits::MAX_TITLE_LENGTH
            )));
        }

        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToOwned::to_owned);

        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO tasks (id, user_id, title, description, completed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, $5)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(&description)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to create task: {e}")))?;

        Ok(TaskRecord {
            id,
            user_id: user_id.to_owned(),
            title: title.to_owned(),
            description,
            completed: false,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// List the user's tasks, most recent first
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn list_tasks(
        &self,
        user_id: &str,
        filter: TaskFilter,
    ) -> AppResult<Vec<TaskRecord>> {
        let base = r"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM tasks
            WHERE user_id = $1
            ";
        let query = match filter {
            TaskFilter::All => format!("{base} ORDER BY created_at DESC, rowid DESC"),
            TaskFilter::Completed => {
                format!("{base} AND completed = 1 ORDER BY created_at DESC, rowid DESC")
            }
            TaskFilter::Incomplete => {
                format!("{base} AND completed = 0 ORDER BY created_at DESC, rowid DESC")
            }
        };

        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to list tasks: {e}")))?;

        Ok(rows.iter().map(task_from_row).collect())
    }

    /// Get a task by ID with ownership check
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn get_task(&self, task_id: &str, user_id: &str) -> AppResult<Option<TaskRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get task: {e}")))?;

        Ok(row.as_ref().map(task_from_row))
    }

    /// Find a task by case-insensitive exact title match, scoped to the user
    ///
    /// When duplicate titles exist, the oldest task wins. Callers that need
    /// precision should operate by task id instead.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn find_task_by_title(
        &self,
        user_id: &str,
        title: &str,
    ) -> AppResult<Option<TaskRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM tasks
            WHERE user_id = $1 AND LOWER(title) = LOWER($2)
            ORDER BY created_at, rowid
            LIMIT 1
            ",
        )
        .bind(user_id)
        .bind(title.trim())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to find task: {e}")))?;

        Ok(row.as_ref().map(task_from_row))
    }

    /// Update a task's fields, applying only those supplied
    ///
    /// Returns the updated record, or `None` if the task does not exist for
    /// this user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty or oversized replacement title, or
    /// a database error if the update fails.
    pub async fn update_task(
        &self,
        task_id: &str,
        user_id: &str,
        new_title: Option<&str>,
        new_description: Option<&str>,
        completed: Option<bool>,
    ) -> AppResult<Option<TaskRecord>> {
        let new_title = match new_title.map(str::trim) {
            Some("") => return Err(AppError::invalid_input("Task title cannot be empty")),
            Some(t) if t.chars().count() > limits::MAX_TITLE_LENGTH => {
                return Err(AppError::invalid_input(format!(
                    "Task title must be {} characters or fewer",
                    limits::MAX_TITLE_LENGTH
                )))
            }
            other => other,
        };
        // An explicitly empty description clears the field
        let new_description = new_description.map(|d| {
            let trimmed = d.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        });

        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r"
            UPDATE tasks
            SET title = COALESCE($1, title),
                description = CASE WHEN $2 THEN $3 ELSE description END,
                completed = COALESCE($4, completed),
                updated_at = $5
            WHERE id = $6 AND user_id = $7
            ",
        )
        .bind(new_title)
        .bind(new_description.is_some())
        .bind(new_description.flatten())
        .bind(completed)
        .bind(&now)
        .bind(task_id)
        .bind(user_id)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to update task: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_task(task_id, user_id).await
    }

    /// Delete a task with ownership check
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns a database error if the delete fails.
    pub async fn delete_task(&self, task_id: &str, user_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to delete task: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
