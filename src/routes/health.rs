// ABOUTME: Liveness endpoint for deployment probes
// ABOUTME: Reports service name and version, no dependencies checked
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Health check route

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::constants::service_names;

/// Create the health route
#[must_use]
pub fn routes() -> Router {
    Router::new().route("/api/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": service_names::TASKCHAT_SERVER,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
