//! Who sees which task, and where it lands on a board.

use serde::Serialize;

use super::status::TaskStatus;
use super::task::Task;
use crate::directory::Role;

/// Whether `viewer_id` acting as `role` may see `task`.
///
/// Directors and the HR head see everything. Managers and unit leads see what
/// they sent or received. Employees only see their own tasks once HR has
/// released them.
pub fn visible_to(task: &Task, viewer_id: &str, role: Role) -> bool {
    match role {
        Role::Director | Role::HrHead => true,
        Role::Manager | Role::UnitLead => task.from_id == viewer_id || task.to_id == viewer_id,
        Role::Employee => task.to_id == viewer_id && task.status.visible_to_worker(),
    }
}

/// Tasks waiting on HR: to forward, or to sign off.
pub fn in_hr_queue(task: &Task) -> bool {
    matches!(task.status, TaskStatus::PendingHr | TaskStatus::ReviewByHr)
}

/// Columns of the employee task board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardColumn {
    New,
    InProgress,
    Sent,
    Completed,
}

impl BoardColumn {
    pub fn of(status: TaskStatus) -> Option<Self> {
        match status {
            TaskStatus::Pending | TaskStatus::AssignedToWorker | TaskStatus::Overdue => {
                Some(BoardColumn::New)
            }
            TaskStatus::InProgress => Some(BoardColumn::InProgress),
            TaskStatus::InReview | TaskStatus::PendingHr | TaskStatus::ReviewByHr => {
                Some(BoardColumn::Sent)
            }
            TaskStatus::Completed => Some(BoardColumn::Completed),
            TaskStatus::OnHold => None,
        }
    }
}
