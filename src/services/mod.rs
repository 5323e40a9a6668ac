// ABOUTME: Domain services: the agent turn loop and chat orchestration
// ABOUTME: Route handlers stay thin by delegating to these functions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Domain services for the chat pipeline

/// One agent turn: tool loop and invocation records
pub mod agent;

/// The chat orchestration pipeline
pub mod chat_orchestration;

pub use agent::{run_agent_turn, AgentTurnResult, ToolInvocation};
pub use chat_orchestration::{process_chat_message, ChatOutcome};
