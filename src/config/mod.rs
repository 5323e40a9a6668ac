// ABOUTME: Configuration module grouping environment-driven settings
// ABOUTME: Re-exports ServerConfig for binary and test consumers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Configuration management for the Taskchat server

/// Environment-based server configuration
pub mod environment;

pub use environment::ServerConfig;
