//! Mapping from domain errors to HTTP responses.

use axum::http::StatusCode;

use crate::attendance::AttendanceError;
use crate::directory::DirectoryError;
use crate::store::StoreError;
use crate::workflow::WorkflowError;

pub type ApiError = (StatusCode, String);

pub fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Duplicate { .. } | StoreError::Conflict { .. } => StatusCode::CONFLICT,
        StoreError::Backend(_) => {
            tracing::error!("Store failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

pub fn workflow_error(e: WorkflowError) -> ApiError {
    match e {
        WorkflowError::Store(e) => store_error(e),
        WorkflowError::NotFound(_) | WorkflowError::SubTaskNotFound { .. } => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        WorkflowError::Transition(_)
        | WorkflowError::TaskClosed(_)
        | WorkflowError::IncompleteSubTasks { .. } => (StatusCode::CONFLICT, e.to_string()),
        e => {
            debug_assert!(e.is_validation());
            (StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

pub fn directory_error(e: DirectoryError) -> ApiError {
    let status = match e {
        DirectoryError::DuplicateCatalog(_) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, e.to_string())
}

pub fn attendance_error(e: AttendanceError) -> ApiError {
    let status = match e {
        AttendanceError::AlreadyClockedIn { .. } => StatusCode::CONFLICT,
        AttendanceError::NoOpenShift { .. } | AttendanceError::UnknownEmployee(_) => {
            StatusCode::NOT_FOUND
        }
        AttendanceError::VerificationFailed(_) => StatusCode::UNAUTHORIZED,
    };
    (status, e.to_string())
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}

pub fn not_found(kind: &str, id: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("{} {} not found", kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{TaskEvent, TaskStatus, TransitionError};

    #[test]
    fn workflow_errors_map_to_statuses() {
        let transition = WorkflowError::Transition(TransitionError {
            from: TaskStatus::OnHold,
            event: TaskEvent::StartProgress,
        });
        assert_eq!(workflow_error(transition).0, StatusCode::CONFLICT);
        assert_eq!(
            workflow_error(WorkflowError::MissingWorker { step: 2 }).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            workflow_error(WorkflowError::NotFound("t".into())).0,
            StatusCode::NOT_FOUND
        );
        let conflict = WorkflowError::Store(StoreError::Conflict {
            id: "t".into(),
            expected: 1,
            actual: 2,
        });
        assert_eq!(workflow_error(conflict).0, StatusCode::CONFLICT);
        assert_eq!(
            workflow_error(WorkflowError::Store(StoreError::Backend("disk".into()))).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
