// ABOUTME: Direct task CRUD route handlers with ownership checks
// ABOUTME: The non-chat path for clients that manage tasks themselves
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Task CRUD routes
//!
//! Tasks can be managed directly over REST as well as through chat; both
//! paths go through the same user-scoped storage layer.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::database::{TaskFilter, TaskRecord};
use crate::errors::AppError;

use super::{AppState, AuthenticatedUser};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a task
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Task title
    pub title: String,
    /// Optional task description
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to update a task
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    /// New title (omit to keep current)
    #[serde(default)]
    pub title: Option<String>,
    /// New description (omit to keep current)
    #[serde(default)]
    pub description: Option<String>,
    /// New completion state (omit to keep current)
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Query parameters for listing tasks
#[derive(Debug, Deserialize, Default)]
pub struct ListTasksQuery {
    /// Completion filter: all, completed, or incomplete
    #[serde(default)]
    pub filter: Option<String>,
}

/// Task representation returned by the API
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Task ID
    pub id: String,
    /// Task title
    pub title: String,
    /// Task description
    pub description: Option<String>,
    /// Completion state
    pub completed: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl From<TaskRecord> for TaskResponse {
    fn from(task: TaskRecord) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            completed: task.completed,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

// ============================================================================
// Task Routes
// ============================================================================

/// Task routes handler
pub struct TaskRoutes;

impl TaskRoutes {
    /// Create all task routes
    #[must_use]
    pub fn routes(state: AppState) -> Router {
        Router::new()
            .route("/api/tasks", get(Self::list_tasks))
            .route("/api/tasks", post(Self::create_task))
            .route("/api/tasks/:task_id", get(Self::get_task))
            .route("/api/tasks/:task_id", put(Self::update_task))
            .route("/api/tasks/:task_id", delete(Self::delete_task))
            .with_state(state)
    }

    /// List the user's tasks, most recent first
    async fn list_tasks(
        State(state): State<AppState>,
        user: AuthenticatedUser,
        Query(query): Query<ListTasksQuery>,
    ) -> Result<Response, AppError> {
        let filter = TaskFilter::from_value(query.filter.as_deref().unwrap_or("all"));
        let tasks = state.database.list_tasks(&user.user_id, filter).await?;

        let response: Vec<TaskResponse> = tasks.into_iter().map(TaskResponse::from).collect();
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Create a new task
    async fn create_task(
        State(state): State<AppState>,
        user: AuthenticatedUser,
        Json(request): Json<CreateTaskRequest>,
    ) -> Result<Response, AppError> {
        let task = state
            .database
            .create_task(&user.user_id, &request.title, request.description.as_deref())
            .await?;

        Ok((StatusCode::CREATED, Json(TaskResponse::from(task))).into_response())
    }

    /// Get a specific task with ownership check
    async fn get_task(
        State(state): State<AppState>,
        user: AuthenticatedUser,
        Path(task_id): Path<String>,
    ) -> Result<Response, AppError> {
        let task = state
            .database
            .get_task(&task_id, &user.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task"))?;

        Ok((StatusCode::OK, Json(TaskResponse::from(task))).into_response())
    }

    /// Update a task's fields, applying only those supplied
    async fn update_task(
        State(state): State<AppState>,
        user: AuthenticatedUser,
        Path(task_id): Path<String>,
        Json(request): Json<UpdateTaskRequest>,
    ) -> Result<Response, AppError> {
        let task = state
            .database
            .update_task(
                &task_id,
                &user.user_id,
                request.title.as_deref(),
                request.description.as_deref(),
                request.completed,
            )
            .await?
            .ok_or_else(|| AppError::not_found("Task"))?;

        Ok((StatusCode::OK, Json(TaskResponse::from(task))).into_response())
    }

    /// Delete a task with ownership check
    async fn delete_task(
        State(state): State<AppState>,
        user: AuthenticatedUser,
        Path(task_id): Path<String>,
    ) -> Result<Response, AppError> {
        let deleted = state.database.delete_task(&task_id, &user.user_id).await?;

        if !deleted {
            return Err(AppError::not_found("Task"));
        }

        Ok((StatusCode::NO_CONTENT, ()).into_response())
    }
}
