//! Record storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database file under the data directory
//!
//! Multi-task writes go through [`HrStore::insert_tasks`] and
//! [`HrStore::update_tasks`], which are all-or-nothing in every backend.
//! Task updates carry the version the caller read; a stale version is
//! rejected with [`StoreError::Conflict`].

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::attendance::AttendanceRecord;
use crate::directory::{Catalog, Employee, Role, User};
use crate::messaging::{Message, Suggestion};
use crate::workflow::Task;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: String },

    #[error("Task {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound { kind, id: id.into() }
    }

    pub fn duplicate(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::Duplicate { kind, id: id.into() }
    }
}

/// Store trait - implemented by all storage backends.
#[async_trait]
pub trait HrStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    // === Tasks ===

    /// All tasks, oldest first.
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError>;

    /// Insert a batch of new tasks atomically. Fails without writing anything
    /// if any id already exists.
    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError>;

    /// Write a batch of modified tasks atomically.
    ///
    /// Each task's `version` must equal the stored version; the stored copy
    /// gets `version + 1`. Returns the tasks as written.
    async fn update_tasks(&self, tasks: &[Task]) -> Result<Vec<Task>, StoreError>;

    async fn delete_task(&self, id: &str) -> Result<bool, StoreError>;

    // === Directory ===

    async fn list_employees(&self) -> Result<Vec<Employee>, StoreError>;

    async fn get_employee(&self, id: &str) -> Result<Option<Employee>, StoreError>;

    async fn insert_employee(&self, employee: &Employee) -> Result<(), StoreError>;

    /// Overwrite an existing employee record.
    async fn put_employee(&self, employee: &Employee) -> Result<(), StoreError>;

    /// Employee matching system credentials. Passwords are compared as stored.
    async fn find_employee_by_login(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<Employee>, StoreError>;

    async fn list_catalogs(&self) -> Result<Vec<Catalog>, StoreError>;

    async fn insert_catalog(&self, catalog: &Catalog) -> Result<(), StoreError>;

    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, username: &str, password: &str) -> Result<Option<User>, StoreError>;

    async fn count_users(&self) -> Result<usize, StoreError>;

    // === Attendance ===

    /// All records, ordered by clock-in.
    async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// Close the open record for employee+date. Returns the number of rows changed.
    async fn finish_attendance(
        &self,
        employee_id: &str,
        date: &str,
        clock_out: i64,
    ) -> Result<usize, StoreError>;

    async fn delete_attendance(&self, id: &str) -> Result<bool, StoreError>;

    // === Messaging ===

    /// Messages sent or received by a user, oldest first.
    async fn messages_for(&self, user_id: &str) -> Result<Vec<Message>, StoreError>;

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError>;

    /// Mark everything `contact_id` sent to `user_id` as read.
    async fn mark_read(&self, user_id: &str, contact_id: &str) -> Result<usize, StoreError>;

    async fn list_suggestions(&self) -> Result<Vec<Suggestion>, StoreError>;

    async fn get_suggestion(&self, id: &str) -> Result<Option<Suggestion>, StoreError>;

    async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<(), StoreError>;

    async fn delete_suggestion(&self, id: &str) -> Result<bool, StoreError>;
}

pub type SharedStore = Arc<dyn HrStore>;

/// Store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    Memory,
    #[default]
    Sqlite,
}

impl StoreType {
    /// Parse from environment variable value.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Create a store based on type and configuration.
pub async fn create_store(store_type: StoreType, data_dir: PathBuf) -> Result<SharedStore, StoreError> {
    match store_type {
        StoreType::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreType::Sqlite => {
            let store = SqliteStore::new(data_dir).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Seed the accounts and catalog a fresh install needs to log in.
///
/// Does nothing when any user already exists.
pub async fn seed_defaults(store: &dyn HrStore, hr_head_id: &str) -> Result<bool, StoreError> {
    if store.count_users().await? > 0 {
        return Ok(false);
    }

    let users = [
        User {
            id: "dir-1".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            role: Role::Director,
            full_name: "Director".to_string(),
            employee_id: None,
        },
        User {
            id: hr_head_id.to_string(),
            username: "hr_boss".to_string(),
            password: "hr_boss".to_string(),
            role: Role::HrHead,
            full_name: "HR Head".to_string(),
            employee_id: None,
        },
    ];
    for user in &users {
        store.insert_user(user).await?;
    }

    if store.list_catalogs().await?.is_empty() {
        store
            .insert_catalog(&Catalog {
                id: "cat-1".to_string(),
                name: "General".to_string(),
                positions: vec!["Manager".to_string(), "Developer".to_string()],
                parent_id: None,
            })
            .await?;
    }

    tracing::info!("Seeded default director and HR accounts");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::TaskStatus;

    fn task(id: &str) -> Task {
        Task::new(id, "Audit", "m1", "w1", TaskStatus::Pending, 1)
    }

    /// Exercise the shared contract against any backend.
    async fn check_task_contract(store: &dyn HrStore) {
        store.insert_tasks(&[task("a"), task("b")]).await.unwrap();
        assert_eq!(store.list_tasks().await.unwrap().len(), 2);

        // Batch with one duplicate writes nothing
        let err = store.insert_tasks(&[task("c"), task("a")]).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert!(store.get_task("c").await.unwrap().is_none());

        // Versioned update
        let mut a = store.get_task("a").await.unwrap().unwrap();
        a.status = TaskStatus::InProgress;
        let written = store.update_tasks(&[a.clone()]).await.unwrap();
        assert_eq!(written[0].version, 2);
        let stored = store.get_task("a").await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::InProgress);
        assert_eq!(stored.version, 2);

        // Stale write is rejected and the batch is not applied
        let mut b = store.get_task("b").await.unwrap().unwrap();
        b.status = TaskStatus::Completed;
        let err = store.update_tasks(&[b, a]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, actual: 2, .. }));
        assert_eq!(
            store.get_task("b").await.unwrap().unwrap().status,
            TaskStatus::Pending
        );

        let err = store.update_tasks(&[task("zzz")]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        assert!(store.delete_task("a").await.unwrap());
        assert!(!store.delete_task("a").await.unwrap());
    }

    #[tokio::test]
    async fn memory_store_task_contract() {
        let store = InMemoryStore::new();
        assert!(!store.is_persistent());
        check_task_contract(&store).await;
    }

    #[tokio::test]
    async fn sqlite_store_task_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().to_path_buf()).await.unwrap();
        assert!(store.is_persistent());
        check_task_contract(&store).await;
    }

    #[tokio::test]
    async fn seeding_runs_once() {
        let store = InMemoryStore::new();
        assert!(seed_defaults(&store, "u-hr-1").await.unwrap());
        assert!(!seed_defaults(&store, "u-hr-1").await.unwrap());
        let hr = store.find_user("hr_boss", "hr_boss").await.unwrap().unwrap();
        assert_eq!(hr.id, "u-hr-1");
        assert_eq!(hr.role, Role::HrHead);
        assert_eq!(store.list_catalogs().await.unwrap().len(), 1);
    }

    #[test]
    fn store_type_parsing() {
        assert_eq!(StoreType::parse("memory"), StoreType::Memory);
        assert_eq!(StoreType::parse("DB"), StoreType::Sqlite);
        assert_eq!(StoreType::parse("whatever"), StoreType::Sqlite);
    }
}
