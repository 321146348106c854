//! Task record with chain links and sub-task checklist.
//!
//! # Invariants
//! - `version` starts at 1 and grows by one on every persisted write
//! - `chain_step`, `parent_task_id` and `next_chain_task_id` are only set on chain tasks
//! - `status` only changes through [`Task::apply`]

use serde::{Deserialize, Serialize};

use super::status::{TaskEvent, TaskStatus, TransitionError};

/// Opaque file reference carried by a task. The payload is never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub data: String,
}

/// Checklist item on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub from_id: String,
    #[serde(default)]
    pub from_name: String,
    pub to_id: String,
    #[serde(default)]
    pub to_name: String,
    pub status: TaskStatus,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<FileAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_attachment: Option<FileAttachment>,
    /// Worker's completion comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr_reviewer_id: Option<String>,
    #[serde(default)]
    pub is_chain_task: bool,
    /// 1-based position in the chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chain_task_id: Option<String>,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
    #[serde(default = "initial_version")]
    pub version: u64,
}

fn initial_version() -> u64 {
    1
}

impl Task {
    /// A standalone task in `status`, stamped with `created_at`.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        status: TaskStatus,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            from_id: from_id.into(),
            from_name: String::new(),
            to_id: to_id.into(),
            to_name: String::new(),
            status,
            created_at,
            updated_at: None,
            attachment: None,
            result_attachment: None,
            report: None,
            hr_reviewer_id: None,
            is_chain_task: false,
            chain_step: None,
            parent_task_id: None,
            next_chain_task_id: None,
            sub_tasks: Vec::new(),
            version: initial_version(),
        }
    }

    /// Apply a workflow event, stamping `updated_at` on success.
    ///
    /// The task is left untouched when the edge is rejected.
    pub fn apply(&mut self, event: TaskEvent, now: i64) -> Result<TaskStatus, TransitionError> {
        let next = self.status.apply(event)?;
        self.status = next;
        self.updated_at = Some(now);
        Ok(next)
    }

    pub fn incomplete_sub_tasks(&self) -> usize {
        self.sub_tasks.iter().filter(|s| !s.completed).count()
    }

    pub fn sub_tasks_done(&self) -> bool {
        self.incomplete_sub_tasks() == 0
    }

    /// Flip a checklist item, returning its new state.
    pub fn toggle_sub_task(&mut self, sub_task_id: &str, now: i64) -> Option<bool> {
        let item = self.sub_tasks.iter_mut().find(|s| s.id == sub_task_id)?;
        item.completed = !item.completed;
        let completed = item.completed;
        self.updated_at = Some(now);
        Some(completed)
    }

    /// Whether this task is linked to other steps.
    pub fn in_chain(&self) -> bool {
        self.is_chain_task || self.parent_task_id.is_some() || self.next_chain_task_id.is_some()
    }

    /// Id of the first task of the chain this task belongs to.
    pub fn chain_root(&self) -> &str {
        self.parent_task_id.as_deref().unwrap_or(&self.id)
    }

    /// Timestamp of the last write, falling back to creation time.
    pub fn last_touched(&self) -> i64 {
        self.updated_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus) -> Task {
        Task::new("t1", "Audit", "m1", "w1", status, 1_000)
    }

    #[test]
    fn apply_stamps_updated_at() {
        let mut t = task(TaskStatus::PendingHr);
        assert_eq!(t.apply(TaskEvent::ForwardToWorker, 2_000), Ok(TaskStatus::AssignedToWorker));
        assert_eq!(t.status, TaskStatus::AssignedToWorker);
        assert_eq!(t.updated_at, Some(2_000));
    }

    #[test]
    fn rejected_apply_leaves_task_untouched() {
        let mut t = task(TaskStatus::OnHold);
        assert!(t.apply(TaskEvent::Complete, 2_000).is_err());
        assert_eq!(t.status, TaskStatus::OnHold);
        assert_eq!(t.updated_at, None);
    }

    #[test]
    fn sub_task_progress() {
        let mut t = task(TaskStatus::InProgress);
        t.sub_tasks = vec![
            SubTask { id: "s1".into(), title: "Draft".into(), completed: true },
            SubTask { id: "s2".into(), title: "Sign".into(), completed: false },
        ];
        assert_eq!(t.incomplete_sub_tasks(), 1);
        assert!(!t.sub_tasks_done());
        assert_eq!(t.toggle_sub_task("s2", 5), Some(true));
        assert!(t.sub_tasks_done());
        assert_eq!(t.toggle_sub_task("nope", 6), None);
    }

    #[test]
    fn camel_case_wire_format() {
        let mut t = task(TaskStatus::OnHold);
        t.next_chain_task_id = Some("t2".into());
        t.attachment = Some(FileAttachment {
            name: "brief.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 10,
            data: "data:...".into(),
        });
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["status"], "on_hold");
        assert_eq!(json["nextChainTaskId"], "t2");
        assert_eq!(json["attachment"]["type"], "application/pdf");
        assert!(json.get("parentTaskId").is_none());

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back.version, 1);
        assert_eq!(back.chain_root(), "t1");
    }
}
