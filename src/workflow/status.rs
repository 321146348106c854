//! Task status and the transition table.
//!
//! # State Machine
//! ```text
//! OnHold -> Pending -> PendingHr -> AssignedToWorker -> InProgress -> InReview   -> Completed
//!              \                                         ^   |   \-> ReviewByHr -> Completed
//!               \---------------------------------------/    \-> Completed
//! ```
//! Completion of a chain task activates its successor (`OnHold -> Pending`).
//! `Overdue` is a legacy marker reachable from any active state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created or reactivated, not yet delegated further
    Pending,
    /// Waiting for HR to forward it to the worker
    PendingHr,
    /// Released by HR; the worker can see and act on it
    AssignedToWorker,
    InProgress,
    /// Result submitted, awaiting manager sign-off
    InReview,
    /// Result submitted, awaiting HR sign-off
    ReviewByHr,
    /// Chain step waiting for its predecessor
    OnHold,
    Completed,
    Overdue,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 9] = [
        TaskStatus::Pending,
        TaskStatus::PendingHr,
        TaskStatus::AssignedToWorker,
        TaskStatus::InProgress,
        TaskStatus::InReview,
        TaskStatus::ReviewByHr,
        TaskStatus::OnHold,
        TaskStatus::Completed,
        TaskStatus::Overdue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::PendingHr => "pending_hr",
            TaskStatus::AssignedToWorker => "assigned_to_worker",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::InReview => "in_review",
            TaskStatus::ReviewByHr => "review_by_hr",
            TaskStatus::OnHold => "on_hold",
            TaskStatus::Completed => "completed",
            TaskStatus::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn is_terminal(self) -> bool {
        self == TaskStatus::Completed
    }

    /// Active means the task is the live step of its chain.
    pub fn is_active(self) -> bool {
        !matches!(self, TaskStatus::OnHold | TaskStatus::Completed)
    }

    /// Whether the assignee sees the task on their board.
    pub fn visible_to_worker(self) -> bool {
        !matches!(self, TaskStatus::OnHold | TaskStatus::PendingHr)
    }

    /// Apply an event, returning the resulting status or the rejected edge.
    pub fn apply(self, event: TaskEvent) -> Result<TaskStatus, TransitionError> {
        use TaskEvent as E;
        use TaskStatus as S;

        let next = match (event, self) {
            (E::Activate, S::OnHold) => S::Pending,
            (E::ForwardToWorker, S::PendingHr) => S::AssignedToWorker,
            (
                E::StartProgress,
                S::Pending | S::AssignedToWorker | S::InReview | S::ReviewByHr | S::Overdue,
            ) => S::InProgress,
            (E::SubmitForReview, S::InProgress) => S::InReview,
            (E::SubmitToHr, S::InProgress) => S::ReviewByHr,
            (E::ReturnToHr, S::Pending | S::InProgress) => S::PendingHr,
            (E::Requeue, S::InProgress | S::AssignedToWorker) => S::Pending,
            (E::Approve, S::InReview | S::ReviewByHr) => S::Completed,
            (
                E::Complete,
                S::Pending
                | S::AssignedToWorker
                | S::InProgress
                | S::InReview
                | S::ReviewByHr
                | S::Overdue,
            ) => S::Completed,
            (
                E::MarkOverdue,
                S::Pending | S::PendingHr | S::AssignedToWorker | S::InProgress,
            ) => S::Overdue,
            _ => {
                return Err(TransitionError {
                    from: self,
                    event,
                })
            }
        };
        Ok(next)
    }

    pub fn can_apply(self, event: TaskEvent) -> bool {
        self.apply(event).is_ok()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEvent {
    /// Predecessor in the chain completed
    Activate,
    ForwardToWorker,
    StartProgress,
    SubmitForReview,
    SubmitToHr,
    ReturnToHr,
    /// Worker moved the card back to the "new" column
    Requeue,
    /// Manager or HR signed off on a submitted result
    Approve,
    /// Worker finished and attached a report
    Complete,
    MarkOverdue,
}

impl TaskEvent {
    /// Event a board drop onto `target` stands for, given the card's current status.
    ///
    /// Returns `None` when no event leads to that column.
    pub fn for_target(current: TaskStatus, target: TaskStatus) -> Option<TaskEvent> {
        let event = match target {
            TaskStatus::Pending => TaskEvent::Requeue,
            TaskStatus::PendingHr => TaskEvent::ReturnToHr,
            TaskStatus::AssignedToWorker => TaskEvent::ForwardToWorker,
            TaskStatus::InProgress => TaskEvent::StartProgress,
            TaskStatus::InReview => TaskEvent::SubmitForReview,
            TaskStatus::ReviewByHr => TaskEvent::SubmitToHr,
            TaskStatus::Completed => {
                if matches!(current, TaskStatus::InReview | TaskStatus::ReviewByHr) {
                    TaskEvent::Approve
                } else {
                    TaskEvent::Complete
                }
            }
            TaskStatus::Overdue => TaskEvent::MarkOverdue,
            TaskStatus::OnHold => return None,
        };
        Some(event)
    }
}

/// A rejected edge in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply {event:?} to a task in status {from}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub event: TaskEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_roundtrip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(TaskStatus::parse("read"), None);
    }

    #[test]
    fn happy_path_through_hr() {
        let s = TaskStatus::OnHold;
        let s = s.apply(TaskEvent::Activate).unwrap();
        assert_eq!(s, TaskStatus::Pending);
        let s = s.apply(TaskEvent::ReturnToHr).unwrap();
        assert_eq!(s, TaskStatus::PendingHr);
        let s = s.apply(TaskEvent::ForwardToWorker).unwrap();
        assert_eq!(s, TaskStatus::AssignedToWorker);
        let s = s.apply(TaskEvent::StartProgress).unwrap();
        assert_eq!(s, TaskStatus::InProgress);
        let s = s.apply(TaskEvent::SubmitToHr).unwrap();
        assert_eq!(s, TaskStatus::ReviewByHr);
        let s = s.apply(TaskEvent::Approve).unwrap();
        assert_eq!(s, TaskStatus::Completed);
    }

    #[test]
    fn forward_only_from_pending_hr() {
        for status in TaskStatus::ALL {
            let result = status.apply(TaskEvent::ForwardToWorker);
            if status == TaskStatus::PendingHr {
                assert_eq!(result, Ok(TaskStatus::AssignedToWorker));
            } else {
                assert!(result.is_err(), "forward accepted from {status}");
            }
        }
    }

    #[test]
    fn completed_is_terminal() {
        let events = [
            TaskEvent::Activate,
            TaskEvent::ForwardToWorker,
            TaskEvent::StartProgress,
            TaskEvent::SubmitForReview,
            TaskEvent::SubmitToHr,
            TaskEvent::ReturnToHr,
            TaskEvent::Requeue,
            TaskEvent::Approve,
            TaskEvent::Complete,
            TaskEvent::MarkOverdue,
        ];
        for event in events {
            assert!(!TaskStatus::Completed.can_apply(event), "{event:?} escaped completed");
        }
    }

    #[test]
    fn held_and_hr_gated_tasks_cannot_be_worked() {
        assert!(!TaskStatus::OnHold.can_apply(TaskEvent::StartProgress));
        assert!(!TaskStatus::OnHold.can_apply(TaskEvent::Complete));
        assert!(!TaskStatus::PendingHr.can_apply(TaskEvent::Complete));
        assert!(!TaskStatus::PendingHr.can_apply(TaskEvent::StartProgress));
    }

    #[test]
    fn activation_only_from_on_hold() {
        assert!(TaskStatus::OnHold.can_apply(TaskEvent::Activate));
        assert!(!TaskStatus::Pending.can_apply(TaskEvent::Activate));
        assert!(!TaskStatus::InProgress.can_apply(TaskEvent::Activate));
    }

    #[test]
    fn board_targets_map_to_events() {
        assert_eq!(
            TaskEvent::for_target(TaskStatus::InProgress, TaskStatus::InReview),
            Some(TaskEvent::SubmitForReview)
        );
        assert_eq!(
            TaskEvent::for_target(TaskStatus::InReview, TaskStatus::Completed),
            Some(TaskEvent::Approve)
        );
        assert_eq!(
            TaskEvent::for_target(TaskStatus::InProgress, TaskStatus::Completed),
            Some(TaskEvent::Complete)
        );
        assert_eq!(TaskEvent::for_target(TaskStatus::Pending, TaskStatus::OnHold), None);
    }

    #[test]
    fn visibility_and_activity() {
        assert!(!TaskStatus::OnHold.visible_to_worker());
        assert!(!TaskStatus::PendingHr.visible_to_worker());
        assert!(TaskStatus::AssignedToWorker.visible_to_worker());
        assert!(TaskStatus::Pending.is_active());
        assert!(!TaskStatus::OnHold.is_active());
        assert!(!TaskStatus::Completed.is_active());
    }
}
