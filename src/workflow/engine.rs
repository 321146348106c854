//! Workflow engine: loads tasks, applies the state machine, persists the
//! result and publishes the change.
//!
//! Completing a chain step and activating its successor happen in one
//! batched store write, so a reader never sees a chain with zero live steps
//! before its last step is done.

use std::collections::HashSet;

use serde::Deserialize;
use uuid::Uuid;

use super::chain::{build_chain, ChainRequest};
use super::status::{TaskEvent, TaskStatus};
use super::task::{FileAttachment, SubTask, Task};
use super::WorkflowError;
use crate::directory::{Role, Roster};
use crate::events::{ChangeEvent, EventHub};
use crate::store::{SharedStore, StoreError};
use crate::util;

/// Which roles must tick off every sub-task before completing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPolicy {
    gated: HashSet<Role>,
}

impl CompletionPolicy {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            gated: roles.into_iter().collect(),
        }
    }

    /// Parse a comma-separated role list. Unknown names are skipped.
    pub fn parse(list: &str) -> Self {
        let mut roles = Vec::new();
        for name in util::split_list(list) {
            match Role::parse(&name) {
                Some(role) => roles.push(role),
                None => tracing::warn!("Ignoring unknown role '{}' in completion policy", name),
            }
        }
        Self::new(roles)
    }

    pub fn gates(&self, role: Role) -> bool {
        self.gated.contains(&role)
    }
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self::new([Role::Employee])
    }
}

/// A single task sent directly, outside the chain builder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub from_id: String,
    #[serde(default)]
    pub from_name: String,
    pub to_id: String,
    #[serde(default)]
    pub attachment: Option<FileAttachment>,
    #[serde(default)]
    pub sub_tasks: Vec<String>,
    /// `pending` (default) or `pending_hr`
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// What a worker hands in when finishing a task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    #[serde(default)]
    pub result_attachment: Option<FileAttachment>,
    #[serde(default)]
    pub report: Option<String>,
}

#[derive(Clone)]
pub struct WorkflowEngine {
    store: SharedStore,
    events: EventHub,
    hr_reviewer_id: Option<String>,
    policy: CompletionPolicy,
}

impl WorkflowEngine {
    pub fn new(store: SharedStore, events: EventHub) -> Self {
        Self {
            store,
            events,
            hr_reviewer_id: None,
            policy: CompletionPolicy::default(),
        }
    }

    pub fn with_hr_reviewer(mut self, id: impl Into<String>) -> Self {
        self.hr_reviewer_id = Some(id.into());
        self
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Current roster snapshot from the store.
    pub async fn roster(&self) -> Result<Roster, WorkflowError> {
        let employees = self.store.list_employees().await?;
        let catalogs = self.store.list_catalogs().await?;
        Ok(Roster::new(employees, catalogs))
    }

    // === Creation ===

    /// Validate, build and persist a chain as one batch.
    pub async fn create_chain(&self, request: &ChainRequest) -> Result<Vec<Task>, WorkflowError> {
        let roster = self.roster().await?;
        let now = util::now_millis();
        let prefix = new_task_id(now);
        let tasks = build_chain(
            request,
            &roster,
            self.hr_reviewer_id.as_deref(),
            &prefix,
            now,
        )?;

        self.store.insert_tasks(&tasks).await?;
        tracing::info!(
            "Created {} task(s) from {} starting with {}",
            tasks.len(),
            request.from_id,
            tasks[0].id
        );
        self.events.publish(ChangeEvent::TasksCreated {
            tasks: tasks.clone(),
        });
        Ok(tasks)
    }

    /// Persist a standalone task.
    pub async fn create_task(&self, new: NewTask) -> Result<Task, WorkflowError> {
        if new.title.trim().is_empty() {
            return Err(WorkflowError::EmptyTitle);
        }
        let to_id = new.to_id.trim();
        if to_id.is_empty() {
            return Err(WorkflowError::MissingWorker { step: 1 });
        }
        let status = new.status.unwrap_or(TaskStatus::Pending);
        if !matches!(status, TaskStatus::Pending | TaskStatus::PendingHr) {
            return Err(WorkflowError::UnsupportedTarget(status));
        }

        let roster = self.roster().await?;
        let to_name = roster
            .display_name(to_id)
            .ok_or_else(|| WorkflowError::UnknownWorker {
                step: 1,
                worker_id: to_id.to_string(),
            })?;

        let now = util::now_millis();
        let id = new_task_id(now);
        let mut task = Task::new(id.clone(), new.title.trim(), new.from_id, to_id, status, now);
        task.description = new.description;
        task.from_name = if new.from_name.is_empty() {
            "Unknown".to_string()
        } else {
            new.from_name
        };
        task.to_name = to_name;
        task.attachment = new.attachment;
        task.hr_reviewer_id = self.hr_reviewer_id.clone();
        task.sub_tasks = new
            .sub_tasks
            .into_iter()
            .enumerate()
            .map(|(j, title)| SubTask {
                id: format!("{}-sub-{}", id, j),
                title,
                completed: false,
            })
            .collect();

        self.store.insert_tasks(std::slice::from_ref(&task)).await?;
        tracing::info!("Created task {} for {}", task.id, task.to_id);
        self.events.publish(ChangeEvent::TasksCreated {
            tasks: vec![task.clone()],
        });
        Ok(task)
    }

    // === Transitions ===

    pub async fn forward_to_worker(
        &self,
        id: &str,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        self.transition(id, TaskEvent::ForwardToWorker, expected_version)
            .await
    }

    pub async fn start_progress(
        &self,
        id: &str,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        self.transition(id, TaskEvent::StartProgress, expected_version)
            .await
    }

    pub async fn submit_for_review(
        &self,
        id: &str,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        self.transition(id, TaskEvent::SubmitForReview, expected_version)
            .await
    }

    pub async fn submit_to_hr(
        &self,
        id: &str,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        self.transition(id, TaskEvent::SubmitToHr, expected_version)
            .await
    }

    pub async fn return_to_hr(
        &self,
        id: &str,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        self.transition(id, TaskEvent::ReturnToHr, expected_version)
            .await
    }

    /// Sign off on a submitted result. The sub-task gate applies to `role`
    /// exactly as it does for [`WorkflowEngine::complete`].
    pub async fn approve(
        &self,
        id: &str,
        role: Role,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        let mut task = self.load(id, expected_version).await?;
        self.check_completion(&task, TaskEvent::Approve, role)?;
        let now = util::now_millis();
        task.apply(TaskEvent::Approve, now)?;
        self.persist(task, now).await
    }

    pub async fn mark_overdue(
        &self,
        id: &str,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        self.transition(id, TaskEvent::MarkOverdue, expected_version)
            .await
    }

    /// Finish a task on behalf of `role`.
    ///
    /// Gated roles must have every sub-task done; otherwise nothing is
    /// written.
    pub async fn complete(
        &self,
        id: &str,
        completion: Completion,
        role: Role,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        let mut task = self.load(id, expected_version).await?;
        self.check_completion(&task, TaskEvent::Complete, role)?;

        let now = util::now_millis();
        task.apply(TaskEvent::Complete, now)?;
        if completion.result_attachment.is_some() {
            task.result_attachment = completion.result_attachment;
        }
        if let Some(report) = completion.report.filter(|r| !r.trim().is_empty()) {
            task.report = Some(report);
        }
        self.persist(task, now).await
    }

    /// Board drop: resolve the target column to an event and apply it.
    pub async fn move_to(
        &self,
        id: &str,
        target: TaskStatus,
        role: Role,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        let current = self.load(id, None).await?;
        let event = TaskEvent::for_target(current.status, target)
            .ok_or(WorkflowError::UnsupportedTarget(target))?;
        match event {
            TaskEvent::Complete => {
                self.complete(id, Completion::default(), role, expected_version)
                    .await
            }
            TaskEvent::Approve => self.approve(id, role, expected_version).await,
            _ => self.transition(id, event, expected_version).await,
        }
    }

    /// Flip a checklist item. Completed tasks are frozen.
    pub async fn toggle_subtask(
        &self,
        id: &str,
        sub_task_id: &str,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        let mut task = self.load(id, expected_version).await?;
        if task.status.is_terminal() {
            return Err(WorkflowError::TaskClosed(id.to_string()));
        }
        let now = util::now_millis();
        task.toggle_sub_task(sub_task_id, now)
            .ok_or_else(|| WorkflowError::SubTaskNotFound {
                task_id: id.to_string(),
                sub_task_id: sub_task_id.to_string(),
            })?;
        self.persist(task, now).await
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), WorkflowError> {
        if !self.store.delete_task(id).await? {
            return Err(WorkflowError::NotFound(id.to_string()));
        }
        tracing::info!("Deleted task {}", id);
        self.events.publish(ChangeEvent::TaskDeleted { id: id.to_string() });
        Ok(())
    }

    // === Internals ===

    /// Reject an edge into `Completed` while a gated role still has open
    /// sub-tasks. Invalid edges are reported first.
    fn check_completion(&self, task: &Task, event: TaskEvent, role: Role) -> Result<(), WorkflowError> {
        if task.status.apply(event)? != TaskStatus::Completed {
            return Ok(());
        }
        if self.policy.gates(role) && !task.sub_tasks_done() {
            let remaining = task.incomplete_sub_tasks();
            tracing::debug!(
                "Refusing to complete {}: {} sub-task(s) open for {}",
                task.id,
                remaining,
                role
            );
            return Err(WorkflowError::IncompleteSubTasks { remaining });
        }
        Ok(())
    }

    async fn load(&self, id: &str, expected_version: Option<u64>) -> Result<Task, WorkflowError> {
        let task = self
            .store
            .get_task(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;
        if let Some(expected) = expected_version {
            if expected != task.version {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual: task.version,
                }
                .into());
            }
        }
        Ok(task)
    }

    async fn transition(
        &self,
        id: &str,
        event: TaskEvent,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        let mut task = self.load(id, expected_version).await?;
        let now = util::now_millis();
        task.apply(event, now)?;
        self.persist(task, now).await
    }

    /// Write a modified task, activating its successor when it just completed.
    async fn persist(&self, task: Task, now: i64) -> Result<Task, WorkflowError> {
        let mut batch = vec![task];
        if batch[0].status == TaskStatus::Completed {
            if let Some(next) = self.successor_to_activate(&batch[0], now).await? {
                batch.push(next);
            }
        }

        let written = self.store.update_tasks(&batch).await?;
        for task in &written {
            tracing::debug!("Task {} -> {} (v{})", task.id, task.status, task.version);
            self.events.publish(ChangeEvent::TaskUpdated { task: task.clone() });
        }
        written
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("update returned no rows".to_string()).into())
    }

    async fn successor_to_activate(
        &self,
        task: &Task,
        now: i64,
    ) -> Result<Option<Task>, WorkflowError> {
        let Some(next_id) = task.next_chain_task_id.as_deref() else {
            return Ok(None);
        };
        let Some(mut next) = self.store.get_task(next_id).await? else {
            tracing::warn!("Task {} links to missing successor {}", task.id, next_id);
            return Ok(None);
        };
        if next.status != TaskStatus::OnHold {
            tracing::warn!(
                "Successor {} of {} is {}, not on_hold; leaving it alone",
                next.id,
                task.id,
                next.status
            );
            return Ok(None);
        }
        next.apply(TaskEvent::Activate, now)?;
        tracing::info!("Activated chain step {} after {}", next.id, task.id);
        Ok(Some(next))
    }
}

/// Fresh task id, or id prefix for a chain: `task-{millis}-{8 hex}`.
fn new_task_id(now: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("task-{}-{}", now, &suffix[..8])
}
