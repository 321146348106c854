//! Dashboard statistics.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use super::error::{store_error, ApiError};
use super::routes::AppState;
use crate::stats::{self, Activity, Summary};
use crate::util;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/activity", get(activity))
        .route("/summary", get(summary))
}

/// GET /api/stats/activity - Completion timestamps and the last seven days.
async fn activity(State(state): State<Arc<AppState>>) -> Result<Json<Activity>, ApiError> {
    let tasks = state.store.list_tasks().await.map_err(store_error)?;
    Ok(Json(stats::activity(&tasks, util::now_millis())))
}

async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<Summary>, ApiError> {
    let tasks = state.store.list_tasks().await.map_err(store_error)?;
    let employees = state.store.list_employees().await.map_err(store_error)?;
    let attendance = state.store.list_attendance().await.map_err(store_error)?;
    Ok(Json(stats::summary(
        &tasks,
        &employees,
        &attendance,
        &util::today_string(),
    )))
}
