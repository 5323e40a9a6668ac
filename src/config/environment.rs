// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Environment-based configuration management

use crate::constants::{defaults, env_config};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP port the server listens on
    pub http_port: u16,
    /// Database connection URL (SQLite)
    pub database_url: String,
    /// Maximum number of prior messages loaded as context for an agent turn
    pub max_conversation_history: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: defaults::HTTP_PORT,
            database_url: defaults::DATABASE_URL.to_owned(),
            max_conversation_history: defaults::MAX_CONVERSATION_HISTORY,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a set variable cannot be parsed
    /// (non-numeric port, non-positive history limit).
    pub fn from_env() -> AppResult<Self> {
        let http_port = match env::var(env_config::HTTP_PORT) {
            Ok(value) => value.parse::<u16>().map_err(|e| {
                AppError::config(format!(
                    "{} must be a valid port number: {e}",
                    env_config::HTTP_PORT
                ))
            })?,
            Err(_) => defaults::HTTP_PORT,
        };

        let database_url = env::var(env_config::DATABASE_URL)
            .unwrap_or_else(|_| defaults::DATABASE_URL.to_owned());

        let max_conversation_history = match env::var(env_config::MAX_CONVERSATION_HISTORY) {
            Ok(value) => {
                let parsed = value.parse::<i64>().map_err(|e| {
                    AppError::config(format!(
                        "{} must be an integer: {e}",
                        env_config::MAX_CONVERSATION_HISTORY
                    ))
                })?;
                if parsed <= 0 {
                    return Err(AppError::config(format!(
                        "{} must be positive, got {parsed}",
                        env_config::MAX_CONVERSATION_HISTORY
                    )));
                }
                parsed
            }
            Err(_) => defaults::MAX_CONVERSATION_HISTORY,
        };

        if database_url.starts_with("sqlite:") && database_url.contains(":memory:") {
            warn!("Using an in-memory database; all data is lost on shutdown");
        }

        Ok(Self {
            http_port,
            database_url,
            max_conversation_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var(env_config::HTTP_PORT);
        env::remove_var(env_config::DATABASE_URL);
        env::remove_var(env_config::MAX_CONVERSATION_HISTORY);
    }

    #[test]
    #[serial]
    fn test_defaults_when_env_unset() {
        clear_env();
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http_port, defaults::HTTP_PORT);
        assert_eq!(config.database_url, defaults::DATABASE_URL);
        assert_eq!(
            config.max_conversation_history,
            defaults::MAX_CONVERSATION_HISTORY
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var(env_config::HTTP_PORT, "9090");
        env::set_var(env_config::DATABASE_URL, "sqlite::memory:");
        env::set_var(env_config::MAX_CONVERSATION_HISTORY, "10");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_conversation_history, 10);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_rejected() {
        clear_env();
        env::set_var(env_config::HTTP_PORT, "not-a-port");
        assert!(ServerConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_non_positive_history_rejected() {
        clear_env();
        env::set_var(env_config::MAX_CONVERSATION_HISTORY, "0");
        assert!(ServerConfig::from_env().is_err());
        clear_env();
    }
}
