// SPDX-License-Identifier: MIT

use axum::{extract::State, http::StatusCode, routing::post, Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::with_common_routes;
use crate::stepwise::apps::birthdate::age_of;
use crate::stepwise::workflow::graph::Workflow;

#[derive(Debug, Deserialize)]
struct NameForm {
    name: Option<String>,
}

pub fn router(workflow: Arc<Workflow>, static_dir: &std::path::Path) -> Router {
    let api = Router::new()
        .route("/do_something", post(do_something))
        .with_state(workflow);
    with_common_routes(api, static_dir)
}

async fn do_something(
    State(workflow): State<Arc<Workflow>>,
    Form(form): Form<NameForm>,
) -> (StatusCode, Json<Value>) {
    let name = match form.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "No name provided"})),
            )
        }
    };

    match age_of(&workflow, &name).await {
        Ok(age) => (StatusCode::OK, Json(json!({"result": age}))),
        Err(e) => {
            log::error!("Error invoking agent: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "message": e.to_string()})),
            )
        }
    }
}
