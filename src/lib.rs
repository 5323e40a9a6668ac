// ABOUTME: Main library entry point for the Taskchat assistant backend
// ABOUTME: Wires chat orchestration, task tools, storage, and the HTTP surface
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![deny(unsafe_code)]

//! # Taskchat Server
//!
//! A conversational assistant backend that lets users manage a personal task
//! list through natural-language chat. Each chat turn is handed to an external
//! language-model agent which may invoke a fixed set of task-management tools
//! (add/list/update/complete/delete) scoped strictly to the calling user.
//!
//! ## Architecture
//!
//! - **Tools**: closed dispatch table of five user-scoped task operations
//! - **Database**: SQLite-backed stores for tasks, conversations, and messages
//! - **LLM**: provider abstraction over OpenAI-compatible chat completions
//! - **Services**: the agent turn loop and the chat orchestration pipeline
//! - **Routes**: axum HTTP surface for chat, conversations, and task CRUD
//!
//! ## Example
//!
//! ```rust,no_run
//! use taskchat::config::environment::ServerConfig;
//! use taskchat::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Taskchat server configured with port: {}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Environment-driven configuration management
pub mod config;

/// Shared limits and environment variable names
pub mod constants;

/// Database management: tasks, conversations, and messages
pub mod database;

/// Unified error handling: error codes, `AppError`, HTTP mapping
pub mod errors;

/// LLM provider abstraction and OpenAI-compatible client
pub mod llm;

/// Logging configuration and structured logging setup
pub mod logging;

/// HTTP routes for chat, conversations, tasks, and health
pub mod routes;

/// Chat orchestration and the agent turn loop
pub mod services;

/// Task-management tools callable by the agent
pub mod tools;
