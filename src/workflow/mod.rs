//! Task workflow: status machine, chain building and the engine that
//! persists and announces every transition.

mod chain;
mod engine;
mod status;
mod task;
mod views;

pub use chain::{active_steps, build_chain, group_chains, validate_steps, ChainRequest, ChainStep};
pub use engine::{Completion, CompletionPolicy, NewTask, WorkflowEngine};
pub use status::{TaskEvent, TaskStatus, TransitionError};
pub use task::{FileAttachment, SubTask, Task};
pub use views::{in_hr_queue, visible_to, BoardColumn};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("A chain needs at least one step")]
    EmptyChain,

    #[error("Task title is required")]
    EmptyTitle,

    #[error("Step {step}: no worker selected")]
    MissingWorker { step: usize },

    #[error("Step {step}: worker {worker_id} not found")]
    UnknownWorker { step: usize, worker_id: String },

    #[error("Step {step}: worker {worker_id} is not active")]
    InactiveWorker { step: usize, worker_id: String },

    #[error("Step {step}: worker {worker_id} is not in department {department_id}")]
    WorkerOutsideDepartment {
        step: usize,
        worker_id: String,
        department_id: String,
    },

    #[error("{remaining} sub-task(s) still open")]
    IncompleteSubTasks { remaining: usize },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Task {0} not found")]
    NotFound(String),

    #[error("Sub-task {sub_task_id} not found on task {task_id}")]
    SubTaskNotFound {
        task_id: String,
        sub_task_id: String,
    },

    #[error("Task {0} is completed and can no longer change")]
    TaskClosed(String),

    #[error("Cannot move a task to {0}")]
    UnsupportedTarget(TaskStatus),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Whether the caller sent something invalid, as opposed to hitting a
    /// state conflict or a backend failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorkflowError::EmptyChain
                | WorkflowError::EmptyTitle
                | WorkflowError::MissingWorker { .. }
                | WorkflowError::UnknownWorker { .. }
                | WorkflowError::InactiveWorker { .. }
                | WorkflowError::WorkerOutsideDepartment { .. }
                | WorkflowError::UnsupportedTarget(_)
        )
    }
}
