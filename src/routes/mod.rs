// ABOUTME: HTTP route composition for the credential core
// ABOUTME: Assembles health and authentication routers with tracing middleware
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! HTTP routes. The handlers are thin wrappers; all control flow lives in
//! [`auth::AuthService`].

pub mod auth;
pub mod health;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::resources::ServerResources;

/// Build the full application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(health::HealthRoutes::routes())
        .merge(auth::AuthRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
}
