// ABOUTME: Centralized limits, defaults, and environment variable names
// ABOUTME: Single source of truth for tunables shared across modules and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Shared constants for the Taskchat server

/// Hard limits enforced by validation and the agent turn loop
pub mod limits {
    /// Maximum task title length in characters
    pub const MAX_TITLE_LENGTH: usize = 200;

    /// Maximum number of tool call iterations before forcing a text response
    pub const MAX_TOOL_ITERATIONS: usize = 10;

    /// Tool result summaries returned to chat callers are truncated to this
    /// many characters
    pub const TOOL_RESULT_PREVIEW_CHARS: usize = 200;
}

/// Defaults applied when the environment leaves a knob unset
pub mod defaults {
    /// Default HTTP port
    pub const HTTP_PORT: u16 = 8081;

    /// Default SQLite database URL
    pub const DATABASE_URL: &str = "sqlite:./data/taskchat.db";

    /// Default number of prior messages loaded as agent context
    pub const MAX_CONVERSATION_HISTORY: i64 = 50;
}

/// Environment variable names read by `ServerConfig::from_env`
pub mod env_config {
    /// HTTP port override
    pub const HTTP_PORT: &str = "HTTP_PORT";

    /// Database URL override
    pub const DATABASE_URL: &str = "DATABASE_URL";

    /// Bounded-history override (messages per agent turn)
    pub const MAX_CONVERSATION_HISTORY: &str = "MAX_CONVERSATION_HISTORY";
}

/// Service names used in logs and error messages
pub mod service_names {
    /// This server
    pub const TASKCHAT_SERVER: &str = "taskchat-server";
}
