//! Chain construction and chain grouping.
//!
//! A chain is a singly linked list of tasks sharing one unit of work:
//! step 1 starts in `PendingHr`, every later step waits in `OnHold` until its
//! predecessor completes.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use super::status::TaskStatus;
use super::task::{FileAttachment, SubTask, Task};
use super::WorkflowError;
use crate::directory::Roster;

/// One hand-off in a chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
    /// Department the worker is picked from. When set, the worker must belong
    /// to it or one of its sub-departments.
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub worker_id: String,
}

/// Everything needed to build a chain, minus ids and clock.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub from_id: String,
    #[serde(default)]
    pub from_name: String,
    pub steps: Vec<ChainStep>,
    /// Attached to the first step only
    #[serde(default)]
    pub attachment: Option<FileAttachment>,
    /// Checklist titles copied onto every step
    #[serde(default)]
    pub sub_tasks: Vec<String>,
}

/// Check every step against the roster without building anything.
pub fn validate_steps(steps: &[ChainStep], roster: &Roster) -> Result<(), WorkflowError> {
    if steps.is_empty() {
        return Err(WorkflowError::EmptyChain);
    }
    for (i, step) in steps.iter().enumerate() {
        let step_no = i + 1;
        let worker_id = step.worker_id.trim();
        if worker_id.is_empty() {
            return Err(WorkflowError::MissingWorker { step: step_no });
        }
        let worker = roster
            .employee(worker_id)
            .ok_or_else(|| WorkflowError::UnknownWorker {
                step: step_no,
                worker_id: worker_id.to_string(),
            })?;
        if !worker.is_active() {
            return Err(WorkflowError::InactiveWorker {
                step: step_no,
                worker_id: worker_id.to_string(),
            });
        }
        if let Some(department_id) = step.department_id.as_deref().filter(|d| !d.is_empty()) {
            if !roster.in_department(worker_id, department_id) {
                return Err(WorkflowError::WorkerOutsideDepartment {
                    step: step_no,
                    worker_id: worker_id.to_string(),
                    department_id: department_id.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Build the linked task records for a chain.
///
/// Ids are `{id_prefix}-{i}` so they sort in step order. Nothing is persisted.
pub fn build_chain(
    request: &ChainRequest,
    roster: &Roster,
    hr_reviewer_id: Option<&str>,
    id_prefix: &str,
    now: i64,
) -> Result<Vec<Task>, WorkflowError> {
    if request.title.trim().is_empty() {
        return Err(WorkflowError::EmptyTitle);
    }
    validate_steps(&request.steps, roster)?;

    let n = request.steps.len();
    let is_chain = n > 1;
    let ids: Vec<String> = (0..n).map(|i| format!("{id_prefix}-{i}")).collect();

    let tasks = request
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let worker_id = step.worker_id.trim();
            let title = if is_chain {
                format!("{} (Step {})", request.title.trim(), i + 1)
            } else {
                request.title.trim().to_string()
            };
            let status = if i == 0 {
                TaskStatus::PendingHr
            } else {
                TaskStatus::OnHold
            };

            let mut task = Task::new(ids[i].clone(), title, &request.from_id, worker_id, status, now);
            task.description = request.description.clone();
            task.from_name = if request.from_name.is_empty() {
                "Unknown".to_string()
            } else {
                request.from_name.clone()
            };
            task.to_name = roster
                .display_name(worker_id)
                .unwrap_or_else(|| "Unknown Employee".to_string());
            task.hr_reviewer_id = hr_reviewer_id.map(|s| s.to_string());
            task.attachment = if i == 0 { request.attachment.clone() } else { None };
            task.sub_tasks = request
                .sub_tasks
                .iter()
                .enumerate()
                .map(|(j, title)| SubTask {
                    id: format!("{}-sub-{}", ids[i], j),
                    title: title.clone(),
                    completed: false,
                })
                .collect();

            if is_chain {
                task.is_chain_task = true;
                task.chain_step = Some(i as u32 + 1);
                task.parent_task_id = (i > 0).then(|| ids[0].clone());
                task.next_chain_task_id = ids.get(i + 1).cloned();
            }
            task
        })
        .collect();

    Ok(tasks)
}

/// Group chain tasks into ordered chains, starting from each chain head.
///
/// Tasks that are not part of a chain are ignored. Broken links end a chain
/// early instead of failing.
pub fn group_chains(tasks: &[Task]) -> Vec<Vec<Task>> {
    let chain_tasks: Vec<&Task> = tasks.iter().filter(|t| t.in_chain()).collect();
    let by_id: HashMap<&str, &Task> = chain_tasks.iter().map(|t| (t.id.as_str(), *t)).collect();

    let mut heads: Vec<&Task> = chain_tasks
        .iter()
        .copied()
        .filter(|t| t.parent_task_id.is_none() || !by_id.contains_key(t.chain_root()))
        .collect();
    heads.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut seen: HashSet<&str> = HashSet::new();
    let mut chains = Vec::new();
    for head in heads {
        let mut chain = Vec::new();
        let mut current = Some(head);
        while let Some(task) = current {
            if !seen.insert(task.id.as_str()) {
                break;
            }
            chain.push(task.clone());
            current = task
                .next_chain_task_id
                .as_deref()
                .and_then(|id| by_id.get(id).copied());
        }
        if !chain.is_empty() {
            chains.push(chain);
        }
    }
    chains
}

/// Number of live steps in an ordered chain. A healthy chain has exactly one,
/// or zero once its last step is completed.
pub fn active_steps(chain: &[Task]) -> usize {
    chain.iter().filter(|t| t.status.is_active()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::{catalog, employee};
    use crate::directory::{EmployeeStatus, Roster};

    fn roster() -> Roster {
        let mut gone = employee("w9", "Gone", "Away", "ops");
        gone.status = EmployeeStatus::Archived;
        Roster::new(
            vec![
                employee("w1", "Ann", "Lee", "ops"),
                employee("w2", "Bob", "Kim", "ops-field"),
                employee("w3", "Cid", "Ray", "sales"),
                gone,
            ],
            vec![
                catalog("ops", None),
                catalog("ops-field", Some("ops")),
                catalog("sales", None),
            ],
        )
    }

    fn request(workers: &[&str]) -> ChainRequest {
        ChainRequest {
            title: "Quarterly audit".to_string(),
            description: "Check the books".to_string(),
            from_id: "m1".to_string(),
            from_name: "Mia Manager".to_string(),
            steps: workers
                .iter()
                .map(|w| ChainStep {
                    department_id: None,
                    worker_id: w.to_string(),
                })
                .collect(),
            attachment: Some(FileAttachment {
                name: "brief.pdf".into(),
                mime_type: "application/pdf".into(),
                size: 3,
                data: "abc".into(),
            }),
            sub_tasks: vec![],
        }
    }

    #[test]
    fn chain_links_form_a_singly_linked_list() {
        let tasks = build_chain(&request(&["w1", "w2", "w3"]), &roster(), Some("hr"), "task-1", 10)
            .unwrap();
        assert_eq!(tasks.len(), 3);
        for i in 0..2 {
            assert_eq!(tasks[i].next_chain_task_id.as_deref(), Some(tasks[i + 1].id.as_str()));
        }
        assert!(tasks[2].next_chain_task_id.is_none());

        assert!(tasks[0].parent_task_id.is_none());
        for t in &tasks[1..] {
            assert_eq!(t.parent_task_id.as_deref(), Some(tasks[0].id.as_str()));
        }

        assert_eq!(tasks[0].status, TaskStatus::PendingHr);
        assert!(tasks[1..].iter().all(|t| t.status == TaskStatus::OnHold));
        assert_eq!(
            tasks.iter().map(|t| t.chain_step).collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(3)]
        );
        assert!(tasks.iter().all(|t| t.is_chain_task));
        assert_eq!(active_steps(&tasks), 1);
    }

    #[test]
    fn chain_fills_names_titles_and_first_attachment() {
        let tasks = build_chain(&request(&["w1", "w2"]), &roster(), Some("hr"), "task-1", 10)
            .unwrap();
        assert_eq!(tasks[0].title, "Quarterly audit (Step 1)");
        assert_eq!(tasks[1].title, "Quarterly audit (Step 2)");
        assert_eq!(tasks[0].to_name, "Ann Lee");
        assert_eq!(tasks[1].from_name, "Mia Manager");
        assert_eq!(tasks[1].hr_reviewer_id.as_deref(), Some("hr"));
        assert!(tasks[0].attachment.is_some());
        assert!(tasks[1].attachment.is_none());
        assert!(tasks[0].id < tasks[1].id);
    }

    #[test]
    fn single_step_is_not_a_chain() {
        let tasks = build_chain(&request(&["w1"]), &roster(), None, "task-1", 10).unwrap();
        assert_eq!(tasks.len(), 1);
        let t = &tasks[0];
        assert!(!t.is_chain_task);
        assert!(t.chain_step.is_none());
        assert!(t.parent_task_id.is_none());
        assert!(t.next_chain_task_id.is_none());
        assert_eq!(t.status, TaskStatus::PendingHr);
        assert_eq!(t.title, "Quarterly audit");
    }

    #[test]
    fn missing_or_unknown_workers_are_rejected() {
        let err = build_chain(&request(&["w1", ""]), &roster(), None, "p", 0).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingWorker { step: 2 }));

        let err = build_chain(&request(&["ghost"]), &roster(), None, "p", 0).unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownWorker { step: 1, .. }));

        let err = build_chain(&request(&["w9"]), &roster(), None, "p", 0).unwrap_err();
        assert!(matches!(err, WorkflowError::InactiveWorker { .. }));

        let err = build_chain(&request(&[]), &roster(), None, "p", 0).unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyChain));
    }

    #[test]
    fn department_scope_includes_sub_departments() {
        let mut req = request(&["w2", "w3"]);
        req.steps[0].department_id = Some("ops".into());
        req.steps[1].department_id = Some("ops".into());
        let err = build_chain(&req, &roster(), None, "p", 0).unwrap_err();
        assert!(matches!(err, WorkflowError::WorkerOutsideDepartment { step: 2, .. }));

        req.steps[1].department_id = Some("sales".into());
        assert!(build_chain(&req, &roster(), None, "p", 0).is_ok());
    }

    #[test]
    fn sub_tasks_are_copied_per_step() {
        let mut req = request(&["w1", "w2"]);
        req.sub_tasks = vec!["Collect".into(), "Report".into()];
        let tasks = build_chain(&req, &roster(), None, "p", 0).unwrap();
        assert_eq!(tasks[1].sub_tasks.len(), 2);
        assert_eq!(tasks[1].sub_tasks[0].id, "p-1-sub-0");
        assert!(tasks.iter().flat_map(|t| &t.sub_tasks).all(|s| !s.completed));
    }

    #[test]
    fn grouping_recovers_chain_order() {
        let mut tasks = build_chain(&request(&["w1", "w2", "w3"]), &roster(), None, "a", 1).unwrap();
        let other = build_chain(&request(&["w3", "w1"]), &roster(), None, "b", 2).unwrap();
        let single = Task::new("solo", "x", "m1", "w1", TaskStatus::Pending, 0);
        tasks.reverse();
        tasks.extend(other);
        tasks.push(single);

        let chains = group_chains(&tasks);
        assert_eq!(chains.len(), 2);
        let ids: Vec<&str> = chains[0].iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a-0", "a-1", "a-2"]);
        assert_eq!(chains[1].len(), 2);
    }
}
