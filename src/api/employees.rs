//! Employee directory endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::error::{bad_request, directory_error, not_found, store_error, ApiError};
use super::routes::AppState;
use super::types::{AssignableQuery, EmployeeListQuery};
use crate::directory::{validate_employee, Employee, EmployeeStatus, EmployeeUpdate, Roster};
use crate::events::ChangeEvent;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/assignable", get(assignable))
        .route("/:id", get(get_employee).put(update_employee))
}

/// GET /api/employees - Optionally filtered by `status`.
async fn list_employees(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmployeeListQuery>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    let employees = state.store.list_employees().await.map_err(store_error)?;
    let employees = match query.status.as_deref() {
        Some(status) => {
            let status = EmployeeStatus::parse(status);
            employees.into_iter().filter(|e| e.status == status).collect()
        }
        None => employees,
    };
    Ok(Json(employees))
}

async fn create_employee(
    State(state): State<Arc<AppState>>,
    Json(mut employee): Json<Employee>,
) -> Result<Json<Employee>, ApiError> {
    let catalogs = state.store.list_catalogs().await.map_err(store_error)?;
    validate_employee(&employee, &catalogs).map_err(directory_error)?;
    if employee.id.trim().is_empty() {
        employee.id = format!("emp-{}", Uuid::new_v4().simple());
    }

    state
        .store
        .insert_employee(&employee)
        .await
        .map_err(store_error)?;
    tracing::info!("Added employee {} ({})", employee.id, employee.display_name());
    state.events.publish(ChangeEvent::EmployeeChanged {
        employee: employee.clone(),
    });
    Ok(Json(employee))
}

async fn get_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Employee>, ApiError> {
    state
        .store
        .get_employee(&id)
        .await
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found("Employee", &id))
}

/// PUT /api/employees/:id - Partial update; archiving is a status change.
async fn update_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<EmployeeUpdate>,
) -> Result<Json<Employee>, ApiError> {
    if update.is_empty() {
        return Err(bad_request("No fields to update"));
    }
    let mut employee = state
        .store
        .get_employee(&id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Employee", &id))?;

    update.apply(&mut employee);
    let catalogs = state.store.list_catalogs().await.map_err(store_error)?;
    validate_employee(&employee, &catalogs).map_err(directory_error)?;

    state
        .store
        .put_employee(&employee)
        .await
        .map_err(store_error)?;
    tracing::debug!("Updated employee {}", employee.id);
    state.events.publish(ChangeEvent::EmployeeChanged {
        employee: employee.clone(),
    });
    Ok(Json(employee))
}

/// GET /api/employees/assignable?departmentId= - Active workers in a department subtree.
async fn assignable(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AssignableQuery>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    let employees = state.store.list_employees().await.map_err(store_error)?;
    let catalogs = state.store.list_catalogs().await.map_err(store_error)?;
    let roster = Roster::new(employees, catalogs);
    if roster.catalog(&query.department_id).is_none() {
        return Err(not_found("Catalog", &query.department_id));
    }
    let workers = roster
        .assignable_workers(&query.department_id)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(workers))
}
