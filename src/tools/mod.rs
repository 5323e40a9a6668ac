// ABOUTME: Closed dispatch table of task-management tools callable by the agent
// ABOUTME: Every execution takes an explicit database handle and owning user id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Task Tools
//!
//! The fixed set of five task operations the agent may invoke during a turn.
//! Dispatch is a closed, tagged enum with a schema-validated argument struct
//! per variant - no open-ended reflection. The owning user id never comes
//! from the model: the agent turn loop injects it on every execution, which
//! is the sole isolation mechanism between tenants on this path.
//!
//! Outcomes are a small discriminated type (`Success` / `NotFound` /
//! `Failure`) serialized to a JSON string only at the wire edge, because the
//! model protocol carries plain strings. A validation failure aborts a single
//! tool call; a not-found lookup is a structured result the agent can narrate
//! back to the user without aborting the turn.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::{Database, TaskFilter, TaskRecord};
use crate::llm::{FunctionDeclaration, Tool};

// ============================================================================
// Tool Identity
// ============================================================================

/// The closed set of task-management tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTool {
    /// Create a new task
    AddTask,
    /// List tasks with an optional completion filter
    ListTasks,
    /// Update a task's title or description, located by current title
    UpdateTask,
    /// Mark a task as completed, located by title
    CompleteTask,
    /// Delete a task, located by title
    DeleteTask,
}

impl TaskTool {
    /// All tools, in declaration order
    pub const ALL: [Self; 5] = [
        Self::AddTask,
        Self::ListTasks,
        Self::UpdateTask,
        Self::CompleteTask,
        Self::DeleteTask,
    ];

    /// Look up a tool by its wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "add_task" => Some(Self::AddTask),
            "list_tasks" => Some(Self::ListTasks),
            "update_task" => Some(Self::UpdateTask),
            "complete_task" => Some(Self::CompleteTask),
            "delete_task" => Some(Self::DeleteTask),
            _ => None,
        }
    }

    /// Wire name of this tool
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddTask => "add_task",
            Self::ListTasks => "list_tasks",
            Self::UpdateTask => "update_task",
            Self::CompleteTask => "complete_task",
            Self::DeleteTask => "delete_task",
        }
    }

    /// Description shown to the model
    const fn description(&self) -> &'static str {
        match self {
            Self::AddTask => "Add a new task with a title and optional description",
            Self::ListTasks => {
                "List the user's tasks, filtered by status: all, completed, or incomplete"
            }
            Self::UpdateTask => {
                "Update an existing task's title or description, located by its current title"
            }
            Self::CompleteTask => "Mark a task as completed, located by its title",
            Self::DeleteTask => "Delete a task permanently, located by its title",
        }
    }

    /// JSON Schema for this tool's arguments
    fn parameters(&self) -> Value {
        match self {
            Self::AddTask => json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Title of the task (required, max 200 characters)"
                    },
                    "description": {
                        "type": "string",
                        "description": "Optional description of the task"
                    }
                },
                "required": ["title"]
            }),
            Self::ListTasks => json!({
                "type": "object",
                "properties": {
                    "filter": {
                        "type": "string",
                        "enum": ["all", "completed", "incomplete"],
                        "description": "Which tasks to list"
                    }
                }
            }),
            Self::UpdateTask => json!({
                "type": "object",
                "properties": {
                    "task_title": {
                        "type": "string",
                        "description": "Current title of the task to find and update"
                    },
                    "new_title": {
                        "type": "string",
                        "description": "New title (omit to keep current)"
                    },
                    "new_description": {
                        "type": "string",
                        "description": "New description (omit to keep current)"
                    }
                },
                "required": ["task_title"]
            }),
            Self::CompleteTask => json!({
                "type": "object",
                "properties": {
                    "task_title": {
                        "type": "string",
                        "description": "Title of the task to mark as complete"
                    }
                },
                "required": ["task_title"]
            }),
            Self::DeleteTask => json!({
                "type": "object",
                "properties": {
                    "task_title": {
                        "type": "string",
                        "description": "Title of the task to delete"
                    }
                },
                "required": ["task_title"]
            }),
        }
    }

    /// Build the full tool surface declared to the model
    ///
    /// The declarations carry only operation arguments; the owning user id is
    /// injected by the executor and never surfaced to the model.
    #[must_use]
    pub fn declarations() -> Tool {
        Tool {
            function_declarations: Self::ALL
                .iter()
                .map(|tool| FunctionDeclaration {
                    name: tool.name().to_owned(),
                    description: tool.description().to_owned(),
                    parameters: Some(tool.parameters()),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a single tool execution
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// The operation succeeded; payload is the result object
    Success(Value),
    /// A title lookup missed; the agent should narrate this to the user
    NotFound(String),
    /// The tool call itself failed (bad arguments, validation, storage)
    Failure(String),
}

impl ToolOutcome {
    /// Whether this outcome is a success
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Serialize to the JSON string handed back to the model
    #[must_use]
    pub fn to_wire(&self) -> String {
        let payload = match self {
            Self::Success(value) => {
                let mut object = json!({"success": true});
                if let (Some(map), Some(extra)) = (object.as_object_mut(), value.as_object()) {
                    for (key, val) in extra {
                        map.insert(key.clone(), val.clone());
                    }
                }
                object
            }
            Self::NotFound(reason) | Self::Failure(reason) => {
                json!({"success": false, "error": reason})
            }
        };
        payload.to_string()
    }
}

// ============================================================================
// Argument Structs
// ============================================================================

#[derive(Debug, Deserialize)]
struct AddTaskArgs {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListTasksArgs {
    #[serde(default)]
    filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskArgs {
    task_title: String,
    #[serde(default)]
    new_title: Option<String>,
    #[serde(default)]
    new_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TitleOnlyArgs {
    task_title: String,
}

// ============================================================================
// Execution
// ============================================================================

fn task_payload(task: &TaskRecord) -> Value {
    json!({
        "task": {
            "id": task.id,
            "title": task.title,
            "description": task.description,
            "completed": task.completed,
        }
    })
}

fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T, ToolOutcome> {
    serde_json::from_value(args.clone())
        .map_err(|e| ToolOutcome::Failure(format!("Invalid tool arguments: {e}")))
}

fn not_found(title: &str) -> ToolOutcome {
    ToolOutcome::NotFound(format!("Task with title '{title}' not found"))
}

/// Execute a tool by wire name against the user's task data
///
/// The database handle and user id are explicit arguments by design: there is
/// no ambient context to reach into, and the user id predicate cannot be
/// skipped or overridden by the model's arguments.
pub async fn execute_tool(
    database: &Database,
    user_id: &str,
    name: &str,
    args: &Value,
) -> ToolOutcome {
    let Some(tool) = TaskTool::from_name(name) else {
        return ToolOutcome::Failure(format!("Unknown tool: {name}"));
    };

    match tool {
        TaskTool::AddTask => add_task(database, user_id, args).await,
        TaskTool::ListTasks => list_tasks(database, user_id, args).await,
        TaskTool::UpdateTask => update_task(database, user_id, args).await,
        TaskTool::CompleteTask => complete_task(database, user_id, args).await,
        TaskTool::DeleteTask => delete_task(database, user_id, args).await,
    }
}

async fn add_task(database: &Database, user_id: &str, args: &Value) -> ToolOutcome {
    let parsed: AddTaskArgs = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(outcome) => return outcome,
    };

    match database
        .create_task(user_id, &parsed.title, parsed.description.as_deref())
        .await
    {
        Ok(task) => ToolOutcome::Success(task_payload(&task)),
        Err(e) => ToolOutcome::Failure(e.message),
    }
}

async fn list_tasks(database: &Database, user_id: &str, args: &Value) -> ToolOutcome {
    let parsed: ListTasksArgs = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(outcome) => return outcome,
    };

    let filter = TaskFilter::from_value(parsed.filter.as_deref().unwrap_or("all"));

    match database.list_tasks(user_id, filter).await {
        Ok(tasks) => {
            let task_list: Vec<Value> = tasks
                .iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "title": t.title,
                        "description": t.description,
                        "completed": t.completed,
                    })
                })
                .collect();
            ToolOutcome::Success(json!({
                "count": task_list.len(),
                "filter": filter.as_str(),
                "tasks": task_list,
            }))
        }
        Err(e) => ToolOutcome::Failure(e.message),
    }
}

async fn update_task(database: &Database, user_id: &str, args: &Value) -> ToolOutcome {
    let parsed: UpdateTaskArgs = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(outcome) => return outcome,
    };

    let existing = match database
        .find_task_by_title(user_id, &parsed.task_title)
        .await
    {
        Ok(Some(task)) => task,
        Ok(None) => return not_found(&parsed.task_title),
        Err(e) => return ToolOutcome::Failure(e.message),
    };

    // Models often send empty strings for "no change"; treat them as omitted
    let new_title = parsed
        .new_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let new_description = parsed
        .new_description
        .as_deref()
        .filter(|d| !d.trim().is_empty());

    match database
        .update_task(&existing.id, user_id, new_title, new_description, None)
        .await
    {
        Ok(Some(task)) => ToolOutcome::Success(task_payload(&task)),
        Ok(None) => not_found(&parsed.task_title),
        Err(e) => ToolOutcome::Failure(e.message),
    }
}

async fn complete_task(database: &Database, user_id: &str, args: &Value) -> ToolOutcome {
    let parsed: TitleOnlyArgs = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(outcome) => return outcome,
    };

    let existing = match database
        .find_task_by_title(user_id, &parsed.task_title)
        .await
    {
        Ok(Some(task)) => task,
        Ok(None) => return not_found(&parsed.task_title),
        Err(e) => return ToolOutcome::Failure(e.message),
    };

    // Completion is unconditional, not a toggle
    match database
        .update_task(&existing.id, user_id, None, None, Some(true))
        .await
    {
        Ok(Some(task)) => ToolOutcome::Success(json!({
            "task": {
                "id": task.id,
                "title": task.title,
                "completed": task.completed,
            }
        })),
        Ok(None) => not_found(&parsed.task_title),
        Err(e) => ToolOutcome::Failure(e.message),
    }
}

async fn delete_task(database: &Database, user_id: &str, args: &Value) -> ToolOutcome {
    let parsed: TitleOnlyArgs = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(outcome) => return outcome,
    };

    let existing = match database
        .find_task_by_title(user_id, &parsed.task_title)
        .await
    {
        Ok(Some(task)) => task,
        Ok(None) => return not_found(&parsed.task_title),
        Err(e) => return ToolOutcome::Failure(e.message),
    };

    match database.delete_task(&existing.id, user_id).await {
        Ok(true) => ToolOutcome::Success(json!({"deleted_task": existing.title})),
        Ok(false) => not_found(&parsed.task_title),
        Err(e) => ToolOutcome::Failure(e.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trip() {
        for tool in TaskTool::ALL {
            assert_eq!(TaskTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(TaskTool::from_name("drop_tables"), None);
    }

    #[test]
    fn test_declarations_cover_all_tools() {
        let surface = TaskTool::declarations();
        assert_eq!(surface.function_declarations.len(), TaskTool::ALL.len());
        for declaration in &surface.function_declarations {
            assert!(declaration.parameters.is_some());
            // user_id is injected by the executor, never declared to the model
            let schema = declaration.parameters.as_ref().unwrap().to_string();
            assert!(!schema.contains("user_id"));
        }
    }

    #[test]
    fn test_outcome_wire_format() {
        let success = ToolOutcome::Success(json!({"count": 0, "tasks": []}));
        let wire: Value = serde_json::from_str(&success.to_wire()).unwrap();
        assert_eq!(wire["success"], true);
        assert_eq!(wire["count"], 0);

        let missing = ToolOutcome::NotFound("Task with title 'x' not found".to_owned());
        let wire: Value = serde_json::from_str(&missing.to_wire()).unwrap();
        assert_eq!(wire["success"], false);
        assert!(wire["error"].as_str().unwrap().contains("not found"));
    }
}
