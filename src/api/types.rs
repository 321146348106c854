//! API request and response types.
//!
//! Domain records (tasks, employees, messages...) are serialized as-is; this
//! module only holds the envelopes around them.

use serde::{Deserialize, Serialize};

use crate::attendance::CheckInMethod;
use crate::directory::{Employee, User};
use crate::workflow::{FileAttachment, Task, TaskStatus};

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dev_mode: bool,
    pub auth_required: bool,
    pub store_persistent: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Absent in dev mode when no signing secret is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeLoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct EmployeeLoginResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub employee: Employee,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub employee_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyFaceRequest {
    pub employee_id: String,
    /// Captured frame, usually a data URL
    pub image: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQrRequest {
    /// When absent, the payload alone identifies the employee
    #[serde(default)]
    pub employee_id: Option<String>,
    pub payload: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyQrResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee: Option<Employee>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EmployeeListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignableQuery {
    pub department_id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub viewer_id: Option<String>,
    pub role: Option<String>,
}

/// Optimistic-concurrency token for bodiless transitions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionQuery {
    pub expected_version: Option<u64>,
}

/// Query for sign-off. `role` is only honored in dev mode; otherwise the
/// session token decides.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveQuery {
    pub expected_version: Option<u64>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    #[serde(default)]
    pub result_attachment: Option<FileAttachment>,
    #[serde(default)]
    pub report: Option<String>,
    /// Acting role in dev mode; defaults to `employee`. Ignored when a
    /// session token is present.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub status: TaskStatus,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// One chain with its progress.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub root_id: String,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub active_steps: usize,
    pub tasks: Vec<Task>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Attendance
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceQuery {
    pub date: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInRequest {
    pub employee_id: String,
    #[serde(default)]
    pub method: CheckInMethod,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutRequest {
    pub employee_id: String,
    /// Defaults to today
    #[serde(default)]
    pub date: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Messaging
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub from_id: String,
    pub to_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub user_id: String,
    pub contact_id: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSuggestionRequest {
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub from_id: String,
    pub text: String,
}
