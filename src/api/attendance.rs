//! Attendance endpoints: clock-in, clock-out and the daily log.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, put},
    Json, Router,
};

use super::error::{attendance_error, not_found, store_error, ApiError};
use super::routes::AppState;
use super::types::{AttendanceQuery, ClockInRequest, ClockOutRequest};
use crate::attendance::{self, AttendanceError, AttendanceRecord};
use crate::events::ChangeEvent;
use crate::util;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_records).post(clock_in))
        .route("/finish", put(clock_out))
        .route("/:id", delete(delete_record))
}

/// GET /api/attendance - Optionally filtered by `date` and `employeeId`.
async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
    let records = state.store.list_attendance().await.map_err(store_error)?;
    let records = records
        .into_iter()
        .filter(|r| query.date.as_deref().map_or(true, |d| r.date == d))
        .filter(|r| {
            query
                .employee_id
                .as_deref()
                .map_or(true, |id| r.employee_id == id)
        })
        .collect();
    Ok(Json(records))
}

async fn clock_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClockInRequest>,
) -> Result<Json<AttendanceRecord>, ApiError> {
    let employee = state
        .store
        .get_employee(&req.employee_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| attendance_error(AttendanceError::UnknownEmployee(req.employee_id.clone())))?;

    let existing = state.store.list_attendance().await.map_err(store_error)?;
    let record = attendance::clock_in(
        &employee,
        req.method,
        util::now_millis(),
        state.config.workday_start,
        &existing,
    )
    .map_err(attendance_error)?;

    state
        .store
        .insert_attendance(&record)
        .await
        .map_err(store_error)?;
    tracing::info!(
        "{} clocked in via {}{}",
        record.employee_name,
        record.method.as_str(),
        if record.is_late { " (late)" } else { "" }
    );
    state.events.publish(ChangeEvent::AttendanceChanged {
        record: Some(record.clone()),
        employee_id: record.employee_id.clone(),
    });
    Ok(Json(record))
}

/// PUT /api/attendance/finish - Close the open shift for employee and date.
async fn clock_out(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClockOutRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let date = req.date.unwrap_or_else(util::today_string);
    let now = util::now_millis();
    let changed = state
        .store
        .finish_attendance(&req.employee_id, &date, now)
        .await
        .map_err(store_error)?;
    if changed == 0 {
        return Err(attendance_error(AttendanceError::NoOpenShift {
            employee_id: req.employee_id,
            date,
        }));
    }

    tracing::info!("{} clocked out", req.employee_id);
    state.events.publish(ChangeEvent::AttendanceChanged {
        record: None,
        employee_id: req.employee_id.clone(),
    });
    Ok(Json(serde_json::json!({
        "employeeId": req.employee_id,
        "date": date,
        "clockOut": now,
    })))
}

async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let records = state.store.list_attendance().await.map_err(store_error)?;
    let record = records
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| not_found("Attendance record", &id))?;
    state
        .store
        .delete_attendance(&id)
        .await
        .map_err(store_error)?;
    state.events.publish(ChangeEvent::AttendanceChanged {
        record: None,
        employee_id: record.employee_id,
    });
    Ok(Json(serde_json::json!({ "deleted": true, "id": id })))
}
