//! Task endpoints: listing, chain creation and workflow transitions.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use super::auth::{acting_role, Claims};
use super::error::{bad_request, store_error, workflow_error, ApiError};
use super::routes::AppState;
use super::types::{
    ApproveQuery, CompleteRequest, MoveRequest, TaskListQuery, VersionQuery, WorkflowSummary,
};
use crate::directory::Role;
use crate::workflow::{
    active_steps, group_chains, in_hr_queue, visible_to, ChainRequest, Completion, NewTask, Task,
    TaskStatus,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/chain", post(create_chain))
        .route("/hr-queue", get(hr_queue))
        .route("/workflows", get(list_workflows))
        .route("/:id", get(get_task).delete(delete_task))
        .route("/:id/forward", post(forward))
        .route("/:id/start", post(start))
        .route("/:id/submit", post(submit))
        .route("/:id/submit-hr", post(submit_hr))
        .route("/:id/return-to-hr", post(return_to_hr))
        .route("/:id/complete", post(complete))
        .route("/:id/approve", post(approve))
        .route("/:id/overdue", post(mark_overdue))
        .route("/:id/move", post(move_task))
        .route("/:id/subtasks/:sub_id/toggle", post(toggle_subtask))
}

fn parse_role(role: Option<&str>) -> Result<Role, ApiError> {
    match role {
        None => Ok(Role::Employee),
        Some(name) => Role::parse(name).ok_or_else(|| bad_request(format!("Unknown role '{}'", name))),
    }
}

/// GET /api/tasks - All tasks, or the ones a viewer may see.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.store.list_tasks().await.map_err(store_error)?;
    let tasks = match query.viewer_id.as_deref() {
        Some(viewer) => {
            let role = parse_role(query.role.as_deref())?;
            tasks
                .into_iter()
                .filter(|t| visible_to(t, viewer, role))
                .collect()
        }
        None => tasks,
    };
    Ok(Json(tasks))
}

/// POST /api/tasks - Send a single task.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewTask>,
) -> Result<Json<Task>, ApiError> {
    state.engine.create_task(req).await.map(Json).map_err(workflow_error)
}

/// POST /api/tasks/chain - Build and persist a chain.
async fn create_chain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChainRequest>,
) -> Result<Json<Vec<Task>>, ApiError> {
    state
        .engine
        .create_chain(&req)
        .await
        .map(Json)
        .map_err(workflow_error)
}

/// GET /api/tasks/hr-queue - Tasks waiting on HR.
async fn hr_queue(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.store.list_tasks().await.map_err(store_error)?;
    Ok(Json(tasks.into_iter().filter(in_hr_queue).collect()))
}

/// GET /api/tasks/workflows - Chains with their progress.
async fn list_workflows(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WorkflowSummary>>, ApiError> {
    let tasks = state.store.list_tasks().await.map_err(store_error)?;
    let summaries = group_chains(&tasks)
        .into_iter()
        .map(|chain| WorkflowSummary {
            root_id: chain[0].id.clone(),
            total_steps: chain.len(),
            completed_steps: chain
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count(),
            active_steps: active_steps(&chain),
            tasks: chain,
        })
        .collect();
    Ok(Json(summaries))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state
        .store
        .get_task(&id)
        .await
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| super::error::not_found("Task", &id))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.engine.delete_task(&id).await.map_err(workflow_error)?;
    Ok(Json(serde_json::json!({ "deleted": true, "id": id })))
}

async fn forward(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(v): Query<VersionQuery>,
) -> Result<Json<Task>, ApiError> {
    state
        .engine
        .forward_to_worker(&id, v.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

async fn start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(v): Query<VersionQuery>,
) -> Result<Json<Task>, ApiError> {
    state
        .engine
        .start_progress(&id, v.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(v): Query<VersionQuery>,
) -> Result<Json<Task>, ApiError> {
    state
        .engine
        .submit_for_review(&id, v.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

async fn submit_hr(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(v): Query<VersionQuery>,
) -> Result<Json<Task>, ApiError> {
    state
        .engine
        .submit_to_hr(&id, v.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

async fn return_to_hr(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(v): Query<VersionQuery>,
) -> Result<Json<Task>, ApiError> {
    state
        .engine
        .return_to_hr(&id, v.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

async fn approve(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<Claims>>,
    Path(id): Path<String>,
    Query(q): Query<ApproveQuery>,
) -> Result<Json<Task>, ApiError> {
    let role = acting_role(&state.config, claims, q.role.as_deref())?;
    state
        .engine
        .approve(&id, role, q.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

async fn mark_overdue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(v): Query<VersionQuery>,
) -> Result<Json<Task>, ApiError> {
    state
        .engine
        .mark_overdue(&id, v.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

/// POST /api/tasks/:id/complete - Finish with an optional result file and report.
async fn complete(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<Claims>>,
    Path(id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<Task>, ApiError> {
    let role = acting_role(&state.config, claims, req.role.as_deref())?;
    let completion = Completion {
        result_attachment: req.result_attachment,
        report: req.report,
    };
    state
        .engine
        .complete(&id, completion, role, req.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

/// POST /api/tasks/:id/move - Board drag and drop.
async fn move_task(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<Claims>>,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<Task>, ApiError> {
    let role = acting_role(&state.config, claims, req.role.as_deref())?;
    state
        .engine
        .move_to(&id, req.status, role, req.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

async fn toggle_subtask(
    State(state): State<Arc<AppState>>,
    Path((id, sub_id)): Path<(String, String)>,
    Query(v): Query<VersionQuery>,
) -> Result<Json<Task>, ApiError> {
    state
        .engine
        .toggle_subtask(&id, &sub_id, v.expected_version)
        .await
        .map(Json)
        .map_err(workflow_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::tests::test_state;
    use crate::config::Config;
    use crate::directory::tests::{catalog, employee};
    use crate::store::InMemoryStore;
    use crate::workflow::ChainStep;
    use axum::http::StatusCode;

    async fn seed(state: Arc<AppState>) -> Arc<AppState> {
        state.store.insert_catalog(&catalog("ops", None)).await.unwrap();
        state
            .store
            .insert_employee(&employee("w1", "Ann", "Lee", "ops"))
            .await
            .unwrap();
        state
            .store
            .insert_employee(&employee("w2", "Bob", "Kim", "ops"))
            .await
            .unwrap();
        state
    }

    async fn seeded() -> Arc<AppState> {
        seed(test_state()).await
    }

    fn chain(workers: &[&str]) -> ChainRequest {
        ChainRequest {
            title: "Onboarding".into(),
            description: String::new(),
            from_id: "m1".into(),
            from_name: "Mia".into(),
            steps: workers
                .iter()
                .map(|w| ChainStep {
                    department_id: None,
                    worker_id: w.to_string(),
                })
                .collect(),
            attachment: None,
            sub_tasks: vec!["Sign contract".into()],
        }
    }

    fn session(sub: &str, role: Role) -> Option<Extension<Claims>> {
        Some(Extension(Claims {
            sub: sub.into(),
            role,
            iat: 0,
            exp: 0,
        }))
    }

    fn complete_as(role: Option<&str>) -> Json<CompleteRequest> {
        Json(CompleteRequest {
            result_attachment: None,
            report: Some("done".into()),
            role: role.map(str::to_string),
            expected_version: None,
        })
    }

    #[tokio::test]
    async fn chain_flow_over_http_handlers() {
        let state = seeded().await;
        let Json(tasks) = create_chain(State(state.clone()), Json(chain(&["w1", "w2"])))
            .await
            .unwrap();
        let first = tasks[0].id.clone();

        // Worker cannot see step 1 until HR forwards it
        let query = TaskListQuery {
            viewer_id: Some("w1".into()),
            role: Some("employee".into()),
        };
        let Json(visible) = list_tasks(State(state.clone()), Query(query)).await.unwrap();
        assert!(visible.is_empty());

        let Json(queue) = hr_queue(State(state.clone())).await.unwrap();
        assert_eq!(queue.len(), 1);

        let Json(forwarded) = forward(
            State(state.clone()),
            Path(first.clone()),
            Query(VersionQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(forwarded.status, TaskStatus::AssignedToWorker);

        // Gated: the checklist is still open
        let err = complete(State(state.clone()), None, Path(first.clone()), complete_as(None))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let sub = tasks[0].sub_tasks[0].id.clone();
        let Json(toggled) = toggle_subtask(
            State(state.clone()),
            Path((first.clone(), sub)),
            Query(VersionQuery::default()),
        )
        .await
        .unwrap();
        assert!(toggled.sub_tasks_done());

        let Json(done) = complete(
            State(state.clone()),
            None,
            Path(first),
            complete_as(Some("employee")),
        )
        .await
        .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);

        let Json(flows) = list_workflows(State(state)).await.unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].completed_steps, 1);
        assert_eq!(flows[0].active_steps, 1);
        assert_eq!(flows[0].tasks[1].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn session_role_overrides_requested_role() {
        let state = seeded().await;
        let Json(tasks) = create_chain(State(state.clone()), Json(chain(&["w1"])))
            .await
            .unwrap();
        let id = tasks[0].id.clone();
        let Json(_) = forward(State(state.clone()), Path(id.clone()), Query(VersionQuery::default()))
            .await
            .unwrap();

        // An employee token asking to act as director is still gated
        let err = complete(
            State(state.clone()),
            session("w1", Role::Employee),
            Path(id.clone()),
            complete_as(Some("director")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let Json(started) = move_task(
            State(state.clone()),
            session("w1", Role::Employee),
            Path(id.clone()),
            Json(MoveRequest {
                status: TaskStatus::InProgress,
                role: None,
                expected_version: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);
        let Json(_) = submit(State(state.clone()), Path(id.clone()), Query(VersionQuery::default()))
            .await
            .unwrap();

        let err = approve(
            State(state.clone()),
            session("w1", Role::Employee),
            Path(id.clone()),
            Query(ApproveQuery {
                expected_version: None,
                role: Some("director".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let Json(done) = approve(
            State(state.clone()),
            session("u-hr-1", Role::HrHead),
            Path(id.clone()),
            Query(ApproveQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn requested_role_needs_a_session_outside_dev_mode() {
        let config = Config {
            dev_mode: false,
            ..Config::for_tests()
        };
        let state = seed(AppState::new(config, Arc::new(InMemoryStore::new()))).await;
        let Json(tasks) = create_chain(State(state.clone()), Json(chain(&["w1"])))
            .await
            .unwrap();

        let err = complete(
            State(state),
            None,
            Path(tasks[0].id.clone()),
            complete_as(Some("director")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn validation_and_lookup_errors() {
        let state = seeded().await;
        let err = create_chain(State(state.clone()), Json(chain(&["w1", ""])))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = get_task(State(state.clone()), Path("nope".into()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let query = TaskListQuery {
            viewer_id: Some("w1".into()),
            role: Some("janitor".into()),
        };
        let err = list_tasks(State(state), Query(query)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stale_version_is_409() {
        let state = seeded().await;
        let Json(tasks) = create_chain(State(state.clone()), Json(chain(&["w1"])))
            .await
            .unwrap();
        let id = tasks[0].id.clone();
        let v1 = VersionQuery {
            expected_version: Some(1),
        };
        let Json(forwarded) = forward(State(state.clone()), Path(id.clone()), Query(v1))
            .await
            .unwrap();
        assert_eq!(forwarded.version, 2);
        let stale = VersionQuery {
            expected_version: Some(1),
        };
        let err = start(State(state), Path(id), Query(stale)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }
}
