// ABOUTME: Shared test fixtures: in-memory database and a scripted LLM provider
// ABOUTME: Used by the integration tests under tests/
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use taskchat::database::Database;
use taskchat::errors::AppError;
use taskchat::llm::{
    ChatRequest, ChatResponse, ChatResponseWithTools, FunctionCall, LlmCapabilities, LlmProvider,
    Tool,
};

/// Create an isolated in-memory test database
pub async fn create_test_database() -> Database {
    Database::new("sqlite::memory:")
        .await
        .expect("in-memory database")
}

/// One scripted provider step
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Respond with final text
    Text(String),
    /// Respond with tool calls (and no text)
    ToolCalls(Vec<FunctionCall>),
    /// Fail as if the upstream service were unreachable
    Unavailable(String),
    /// Respond with neither text nor tool calls
    Empty,
}

/// An LLM provider that replays a fixed script, recording every request
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<ScriptStep>>,
    capabilities: LlmCapabilities,
    /// Message counts of each request received, in order
    pub seen_message_counts: Mutex<Vec<usize>>,
    /// Whether a tool surface was attached to each request, in order
    pub seen_tool_attachment: Mutex<Vec<bool>>,
}

impl ScriptedProvider {
    /// Create a provider that replays the given steps in order
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            capabilities: LlmCapabilities::FUNCTION_CALLING | LlmCapabilities::SYSTEM_MESSAGES,
            seen_message_counts: Mutex::new(Vec::new()),
            seen_tool_attachment: Mutex::new(Vec::new()),
        }
    }

    /// Provider that immediately answers with the given text
    pub fn with_text(text: &str) -> Self {
        Self::new(vec![ScriptStep::Text(text.to_owned())])
    }

    /// Provider that answers with text but cannot call tools
    pub fn text_only(text: &str) -> Self {
        let mut provider = Self::with_text(text);
        provider.capabilities = LlmCapabilities::SYSTEM_MESSAGES;
        provider
    }

    /// Provider that fails every request
    pub fn failing() -> Self {
        Self::new(vec![ScriptStep::Unavailable("connection refused".into())])
    }

    fn next_step(&self) -> ScriptStep {
        self.steps
            .lock()
            .expect("script lock")
            .pop_front()
            // A drained script keeps answering so loops can terminate
            .unwrap_or_else(|| ScriptStep::Text("Done.".to_owned()))
    }

    fn record(&self, request: &ChatRequest) {
        self.seen_message_counts
            .lock()
            .expect("record lock")
            .push(request.messages.len());
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn display_name(&self) -> &'static str {
        "Scripted Test Provider"
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.capabilities
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.record(request);
        match self.next_step() {
            ScriptStep::Text(text) => Ok(ChatResponse {
                content: text,
                model: "scripted-1".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
            ScriptStep::Unavailable(reason) => Err(AppError::upstream_unavailable(reason)),
            ScriptStep::ToolCalls(_) | ScriptStep::Empty => Ok(ChatResponse {
                content: String::new(),
                model: "scripted-1".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
        }
    }

    async fn complete_with_tools(
        &self,
        request: &ChatRequest,
        tools: Option<Vec<Tool>>,
    ) -> Result<ChatResponseWithTools, AppError> {
        self.record(request);
        self.seen_tool_attachment
            .lock()
            .expect("attachment lock")
            .push(tools.is_some());
        match self.next_step() {
            ScriptStep::Text(text) => Ok(ChatResponseWithTools {
                content: Some(text),
                function_calls: None,
                model: "scripted-1".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
            ScriptStep::ToolCalls(calls) => Ok(ChatResponseWithTools {
                content: None,
                function_calls: Some(calls),
                model: "scripted-1".to_owned(),
                usage: None,
                finish_reason: Some("tool_calls".to_owned()),
            }),
            ScriptStep::Unavailable(reason) => Err(AppError::upstream_unavailable(reason)),
            ScriptStep::Empty => Ok(ChatResponseWithTools {
                content: None,
                function_calls: None,
                model: "scripted-1".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
        }
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}
