// ABOUTME: HTTP route assembly, shared state, and the authenticated-user extractor
// ABOUTME: Auth verification itself lives in the fronting gateway, not here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # HTTP Routes
//!
//! Axum route assembly for the chat, conversation, task, and health
//! endpoints. Every protected handler extracts an [`AuthenticatedUser`] from
//! request extensions; the verified user id is supplied by the auth
//! collaborator in front of this service and trusted completely here.

/// Chat and conversation endpoints
pub mod chat;

/// Liveness endpoint
pub mod health;

/// Direct task CRUD endpoints
pub mod tasks;

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::AppError;
use crate::llm::LlmProvider;

/// Header carrying the verified user id, installed by the fronting gateway
pub const AUTH_USER_HEADER: &str = "x-auth-user-id";

/// Shared state handed to every route handler
#[derive(Clone)]
pub struct AppState {
    /// Task and conversation storage
    pub database: Database,
    /// The agent runtime provider
    pub llm: Arc<dyn LlmProvider>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

/// A verified user identity attached to the request by the auth collaborator
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Opaque stable user identifier; all ownership checks compare against it
    pub user_id: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(AppError::auth_required)
    }
}

/// Middleware that promotes the gateway's user header into an
/// [`AuthenticatedUser`] extension
///
/// This service sits behind a gateway that authenticates the caller and
/// forwards the verified id; requests without the header simply carry no
/// identity and fail at the extractor with 401.
pub async fn trusted_header_auth(mut request: Request, next: Next) -> Response {
    let user_id = request
        .headers()
        .get(AUTH_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    if let Some(user_id) = user_id {
        request
            .extensions_mut()
            .insert(AuthenticatedUser { user_id });
    }

    next.run(request).await
}

/// Assemble the full application router
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(chat::ChatRoutes::routes(state.clone()))
        .merge(tasks::TaskRoutes::routes(state))
        .merge(health::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
