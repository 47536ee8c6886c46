// SPDX-License-Identifier: MIT

//! HTTP surfaces for the web demos

pub mod birthdate;
pub mod idea_vault;
pub mod jobs;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::error::Result;

pub use jobs::{JobStatus, JobStore};

/// Liveness check
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /`, `GET /health` and static assets around the given API routes
pub(crate) fn with_common_routes(api: Router, static_dir: &Path) -> Router {
    api.route("/health", get(health_check))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(app: Router, addr: SocketAddr) -> Result<()> {
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
