// SPDX-License-Identifier: MIT

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use futures::FutureExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::{with_common_routes, JobStore};
use crate::stepwise::apps::idea_vault::initial_state;
use crate::stepwise::workflow::graph::Workflow;

#[derive(Clone)]
struct IdeaVault {
    workflow: Arc<Workflow>,
    jobs: JobStore,
}

#[derive(Debug, Deserialize)]
struct IdeaForm {
    idea: Option<String>,
}

pub fn router(workflow: Arc<Workflow>, jobs: JobStore, static_dir: &std::path::Path) -> Router {
    let api = Router::new()
        .route("/submit-idea", post(submit_idea))
        .route("/jobs/{id}", get(job_status))
        .with_state(IdeaVault { workflow, jobs });
    with_common_routes(api, static_dir)
}

async fn submit_idea(
    State(app): State<IdeaVault>,
    Form(form): Form<IdeaForm>,
) -> (StatusCode, Json<Value>) {
    let idea = match form.idea {
        Some(idea) if !idea.trim().is_empty() => idea,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "No idea provided"})),
            )
        }
    };

    let workflow = app.workflow.clone();
    let job_id = app
        .jobs
        .submit(
            async move { workflow.execute(initial_state(&workflow, &idea)).await }.boxed(),
        )
        .await;

    log::info!("Idea submitted as job {}", job_id);
    (
        StatusCode::OK,
        Json(json!({"status": "Processing started", "job_id": job_id})),
    )
}

async fn job_status(
    State(app): State<IdeaVault>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let status = match Uuid::parse_str(&id) {
        Ok(uuid) => app.jobs.get(&uuid).await,
        Err(_) => None,
    };

    match status {
        Some(status) => {
            let mut body = serde_json::to_value(&status).unwrap_or_else(|_| json!({}));
            if let Value::Object(obj) = &mut body {
                obj.insert("job_id".to_string(), json!(id));
            }
            (StatusCode::OK, Json(body))
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "Job not found"}))),
    }
}
