//! In-memory store (non-persistent).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{HrStore, StoreError};
use crate::attendance::AttendanceRecord;
use crate::directory::{Catalog, Employee, User};
use crate::messaging::{Message, Suggestion};
use crate::workflow::Task;

#[derive(Default)]
struct State {
    tasks: HashMap<String, Task>,
    employees: HashMap<String, Employee>,
    catalogs: Vec<Catalog>,
    users: Vec<User>,
    attendance: Vec<AttendanceRecord>,
    messages: Vec<Message>,
    suggestions: Vec<Suggestion>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HrStore for InMemoryStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.state.read().await.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.state.read().await.tasks.get(id).cloned())
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let mut batch_ids = std::collections::HashSet::new();
        for task in tasks {
            if state.tasks.contains_key(&task.id) || !batch_ids.insert(task.id.as_str()) {
                return Err(StoreError::duplicate("Task", &task.id));
            }
        }
        for task in tasks {
            state.tasks.insert(task.id.clone(), task.clone());
        }
        Ok(())
    }

    async fn update_tasks(&self, tasks: &[Task]) -> Result<Vec<Task>, StoreError> {
        let mut state = self.state.write().await;
        for task in tasks {
            let stored = state
                .tasks
                .get(&task.id)
                .ok_or_else(|| StoreError::not_found("Task", &task.id))?;
            if stored.version != task.version {
                return Err(StoreError::Conflict {
                    id: task.id.clone(),
                    expected: task.version,
                    actual: stored.version,
                });
            }
        }

        let mut written = Vec::with_capacity(tasks.len());
        for task in tasks {
            let mut next = task.clone();
            next.version += 1;
            state.tasks.insert(next.id.clone(), next.clone());
            written.push(next);
        }
        Ok(written)
    }

    async fn delete_task(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.state.write().await.tasks.remove(id).is_some())
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let mut employees: Vec<Employee> =
            self.state.read().await.employees.values().cloned().collect();
        employees.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str(), a.id.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str(), b.id.as_str()))
        });
        Ok(employees)
    }

    async fn get_employee(&self, id: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self.state.read().await.employees.get(id).cloned())
    }

    async fn insert_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.employees.contains_key(&employee.id) {
            return Err(StoreError::duplicate("Employee", &employee.id));
        }
        state.employees.insert(employee.id.clone(), employee.clone());
        Ok(())
    }

    async fn put_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let slot = state
            .employees
            .get_mut(&employee.id)
            .ok_or_else(|| StoreError::not_found("Employee", &employee.id))?;
        *slot = employee.clone();
        Ok(())
    }

    async fn find_employee_by_login(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .employees
            .values()
            .find(|e| {
                e.system_login.as_deref() == Some(login)
                    && e.system_password.as_deref() == Some(password)
            })
            .cloned())
    }

    async fn list_catalogs(&self) -> Result<Vec<Catalog>, StoreError> {
        Ok(self.state.read().await.catalogs.clone())
    }

    async fn insert_catalog(&self, catalog: &Catalog) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.catalogs.iter().any(|c| c.id == catalog.id) {
            return Err(StoreError::duplicate("Catalog", &catalog.id));
        }
        state.catalogs.push(catalog.clone());
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state
            .users
            .iter()
            .any(|u| u.id == user.id || u.username == user.username)
        {
            return Err(StoreError::duplicate("User", &user.username));
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, username: &str, password: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .cloned())
    }

    async fn count_users(&self) -> Result<usize, StoreError> {
        Ok(self.state.read().await.users.len())
    }

    async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut records = self.state.read().await.attendance.clone();
        records.sort_by_key(|r| r.clock_in);
        Ok(records)
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.attendance.iter().any(|r| r.id == record.id) {
            return Err(StoreError::duplicate("Attendance record", &record.id));
        }
        state.attendance.push(record.clone());
        Ok(())
    }

    async fn finish_attendance(
        &self,
        employee_id: &str,
        date: &str,
        clock_out: i64,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for record in state
            .attendance
            .iter_mut()
            .filter(|r| r.employee_id == employee_id && r.date == date && r.is_open())
        {
            record.clock_out = Some(clock_out);
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_attendance(&self, id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let before = state.attendance.len();
        state.attendance.retain(|r| r.id != id);
        Ok(state.attendance.len() != before)
    }

    async fn messages_for(&self, user_id: &str) -> Result<Vec<Message>, StoreError> {
        let mut messages: Vec<Message> = self
            .state
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.from_id == user_id || m.to_id == user_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.messages.iter().any(|m| m.id == message.id) {
            return Err(StoreError::duplicate("Message", &message.id));
        }
        state.messages.push(message.clone());
        Ok(())
    }

    async fn mark_read(&self, user_id: &str, contact_id: &str) -> Result<usize, StoreError> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for message in state
            .messages
            .iter_mut()
            .filter(|m| m.to_id == user_id && m.from_id == contact_id && !m.read)
        {
            message.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn list_suggestions(&self) -> Result<Vec<Suggestion>, StoreError> {
        let mut suggestions = self.state.read().await.suggestions.clone();
        suggestions.sort_by_key(|s| s.date);
        Ok(suggestions)
    }

    async fn get_suggestion(&self, id: &str) -> Result<Option<Suggestion>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .suggestions
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.suggestions.iter().any(|s| s.id == suggestion.id) {
            return Err(StoreError::duplicate("Suggestion", &suggestion.id));
        }
        state.suggestions.push(suggestion.clone());
        Ok(())
    }

    async fn delete_suggestion(&self, id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let before = state.suggestions.len();
        state.suggestions.retain(|s| s.id != id);
        Ok(state.suggestions.len() != before)
    }
}
