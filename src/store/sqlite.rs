//! SQLite-backed store.
//!
//! Structured fields get their own columns; attachments, checklists and
//! string lists are stored as JSON text.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{HrStore, StoreError};
use crate::attendance::{AttendanceRecord, CheckInMethod};
use crate::directory::{Catalog, Employee, EmployeeStatus, Role, User};
use crate::messaging::{Message, Suggestion};
use crate::workflow::{Task, TaskStatus};

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    from_id TEXT NOT NULL,
    from_name TEXT NOT NULL DEFAULT '',
    to_id TEXT NOT NULL,
    to_name TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending',
    created_at INTEGER NOT NULL,
    updated_at INTEGER,
    attachment TEXT,
    result_attachment TEXT,
    report TEXT,
    hr_reviewer_id TEXT,
    is_chain_task INTEGER NOT NULL DEFAULT 0,
    chain_step INTEGER,
    parent_task_id TEXT,
    next_chain_task_id TEXT,
    sub_tasks TEXT NOT NULL DEFAULT '[]',
    version INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_tasks_to_status ON tasks(to_id, status);
CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_task_id) WHERE parent_task_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS employees (
    id TEXT PRIMARY KEY NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    middle_name TEXT NOT NULL DEFAULT '',
    position TEXT NOT NULL DEFAULT '',
    photo_url TEXT NOT NULL DEFAULT '',
    catalog_id TEXT NOT NULL,
    phone_number TEXT NOT NULL DEFAULT '',
    residence TEXT NOT NULL DEFAULT '',
    passport_serial TEXT NOT NULL DEFAULT '',
    passport_pin TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'active',
    working_hours TEXT NOT NULL DEFAULT '',
    working_days TEXT NOT NULL DEFAULT '[]',
    system_login TEXT,
    system_password TEXT,
    is_online INTEGER NOT NULL DEFAULT 0,
    qr_code TEXT,
    reports_to_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_employees_catalog ON employees(catalog_id);

CREATE TABLE IF NOT EXISTS catalogs (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    positions TEXT NOT NULL DEFAULT '[]',
    parent_id TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    role TEXT NOT NULL,
    full_name TEXT NOT NULL,
    employee_id TEXT
);

CREATE TABLE IF NOT EXISTS attendance (
    id TEXT PRIMARY KEY NOT NULL,
    employee_id TEXT NOT NULL,
    employee_name TEXT NOT NULL DEFAULT '',
    position TEXT NOT NULL DEFAULT '',
    date TEXT NOT NULL,
    clock_in INTEGER NOT NULL,
    clock_out INTEGER,
    method TEXT NOT NULL DEFAULT 'standard',
    is_late INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_attendance_employee_date ON attendance(employee_id, date);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY NOT NULL,
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    text TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    read INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_messages_to ON messages(to_id, from_id);

CREATE TABLE IF NOT EXISTS suggestions (
    id TEXT PRIMARY KEY NOT NULL,
    author_id TEXT NOT NULL,
    author_name TEXT NOT NULL DEFAULT '',
    text TEXT NOT NULL,
    date INTEGER NOT NULL
);
"#;

const TASK_COLUMNS: &str = "id, title, description, from_id, from_name, to_id, to_name, status, \
    created_at, updated_at, attachment, result_attachment, report, hr_reviewer_id, is_chain_task, \
    chain_step, parent_task_id, next_chain_task_id, sub_tasks, version";

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, middle_name, position, photo_url, \
    catalog_id, phone_number, residence, passport_serial, passport_pin, status, working_hours, \
    working_days, system_login, system_password, is_online, qr_code, reports_to_id";

const ATTENDANCE_COLUMNS: &str =
    "id, employee_id, employee_name, position, date, clock_in, clock_out, method, is_late";

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Backend(format!("JSON column: {}", e))
    }
}

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub async fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to create data dir: {}", e)))?;
        let db_path = data_dir.join("zencorp.db");

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(SCHEMA)?;
            Self::run_migrations(&conn)?;
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))??;

        tracing::debug!("SQLite store ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Bring databases created by older builds up to the current schema.
    /// `CREATE TABLE IF NOT EXISTS` never adds columns to an existing table.
    fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
        Self::ensure_column(conn, "tasks", "version", "INTEGER NOT NULL DEFAULT 1")?;
        Self::ensure_column(conn, "tasks", "report", "TEXT")?;
        Self::ensure_column(conn, "tasks", "result_attachment", "TEXT")?;
        Self::ensure_column(conn, "tasks", "sub_tasks", "TEXT NOT NULL DEFAULT '[]'")?;
        Self::ensure_column(conn, "employees", "qr_code", "TEXT")?;
        Self::ensure_column(conn, "employees", "reports_to_id", "TEXT")?;
        Ok(())
    }

    fn ensure_column(
        conn: &Connection,
        table: &str,
        column: &str,
        definition: &str,
    ) -> Result<(), StoreError> {
        let exists = conn
            .prepare(&format!(
                "SELECT 1 FROM pragma_table_info('{}') WHERE name = ?1",
                table
            ))?
            .exists([column])?;
        if !exists {
            tracing::info!("Running migration: adding '{}' column to {} table", column, table);
            conn.execute(
                &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition),
                [],
            )?;
        }
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }

    /// Decode a JSON text column; malformed content fails the row.
    fn json_column<T: serde::de::DeserializeOwned>(idx: usize, text: &str) -> rusqlite::Result<T> {
        serde_json::from_str(text).map_err(|e| {
            tracing::warn!("Malformed JSON in task column {}: {}", idx, e);
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
        let status: String = row.get(7)?;
        let attachment: Option<String> = row.get(10)?;
        let result_attachment: Option<String> = row.get(11)?;
        let sub_tasks: String = row.get(18)?;
        let chain_step: Option<i64> = row.get(15)?;
        let version: i64 = row.get(19)?;
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            from_id: row.get(3)?,
            from_name: row.get(4)?,
            to_id: row.get(5)?,
            to_name: row.get(6)?,
            status: TaskStatus::parse(&status).unwrap_or(TaskStatus::Pending),
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
            attachment: attachment
                .map(|s| Self::json_column(10, &s))
                .transpose()?,
            result_attachment: result_attachment
                .map(|s| Self::json_column(11, &s))
                .transpose()?,
            report: row.get(12)?,
            hr_reviewer_id: row.get(13)?,
            is_chain_task: row.get::<_, i64>(14)? != 0,
            chain_step: chain_step.map(|s| s as u32),
            parent_task_id: row.get(16)?,
            next_chain_task_id: row.get(17)?,
            sub_tasks: Self::json_column(18, &sub_tasks)?,
            version: version as u64,
        })
    }

    fn write_task(conn: &Connection, task: &Task, version: u64, insert: bool) -> Result<(), StoreError> {
        let attachment = task.attachment.as_ref().map(serde_json::to_string).transpose()?;
        let result_attachment = task
            .result_attachment
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let sub_tasks = serde_json::to_string(&task.sub_tasks)?;
        let sql = if insert {
            format!(
                "INSERT INTO tasks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, \
                 ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
                TASK_COLUMNS
            )
        } else {
            "UPDATE tasks SET title = ?2, description = ?3, from_id = ?4, from_name = ?5, \
             to_id = ?6, to_name = ?7, status = ?8, created_at = ?9, updated_at = ?10, \
             attachment = ?11, result_attachment = ?12, report = ?13, hr_reviewer_id = ?14, \
             is_chain_task = ?15, chain_step = ?16, parent_task_id = ?17, \
             next_chain_task_id = ?18, sub_tasks = ?19, version = ?20 WHERE id = ?1"
                .to_string()
        };
        conn.execute(
            &sql,
            params![
                task.id,
                task.title,
                task.description,
                task.from_id,
                task.from_name,
                task.to_id,
                task.to_name,
                task.status.as_str(),
                task.created_at,
                task.updated_at,
                attachment,
                result_attachment,
                task.report,
                task.hr_reviewer_id,
                task.is_chain_task as i64,
                task.chain_step.map(|s| s as i64),
                task.parent_task_id,
                task.next_chain_task_id,
                sub_tasks,
                version as i64,
            ],
        )?;
        Ok(())
    }

    fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
        let status: String = row.get(11)?;
        let working_days: String = row.get(13)?;
        Ok(Employee {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            middle_name: row.get(3)?,
            position: row.get(4)?,
            photo_url: row.get(5)?,
            catalog_id: row.get(6)?,
            phone_number: row.get(7)?,
            residence: row.get(8)?,
            passport_serial: row.get(9)?,
            passport_pin: row.get(10)?,
            status: EmployeeStatus::parse(&status),
            working_hours: row.get(12)?,
            working_days: serde_json::from_str(&working_days).unwrap_or_default(),
            system_login: row.get(14)?,
            system_password: row.get(15)?,
            is_online: row.get::<_, i64>(16)? != 0,
            qr_code: row.get(17)?,
            reports_to_id: row.get(18)?,
        })
    }

    fn write_employee(conn: &Connection, e: &Employee, insert: bool) -> Result<usize, StoreError> {
        let working_days = serde_json::to_string(&e.working_days)?;
        let sql = if insert {
            format!(
                "INSERT INTO employees ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                EMPLOYEE_COLUMNS
            )
        } else {
            "UPDATE employees SET first_name = ?2, last_name = ?3, middle_name = ?4, \
             position = ?5, photo_url = ?6, catalog_id = ?7, phone_number = ?8, residence = ?9, \
             passport_serial = ?10, passport_pin = ?11, status = ?12, working_hours = ?13, \
             working_days = ?14, system_login = ?15, system_password = ?16, is_online = ?17, \
             qr_code = ?18, reports_to_id = ?19 WHERE id = ?1"
                .to_string()
        };
        Ok(conn.execute(
            &sql,
            params![
                e.id,
                e.first_name,
                e.last_name,
                e.middle_name,
                e.position,
                e.photo_url,
                e.catalog_id,
                e.phone_number,
                e.residence,
                e.passport_serial,
                e.passport_pin,
                e.status.as_str(),
                e.working_hours,
                working_days,
                e.system_login,
                e.system_password,
                e.is_online as i64,
                e.qr_code,
                e.reports_to_id,
            ],
        )?)
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        let role: String = row.get(3)?;
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password: row.get(2)?,
            role: Role::parse(&role).unwrap_or(Role::Employee),
            full_name: row.get(4)?,
            employee_id: row.get(5)?,
        })
    }

    fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
        let method: String = row.get(7)?;
        Ok(AttendanceRecord {
            id: row.get(0)?,
            employee_id: row.get(1)?,
            employee_name: row.get(2)?,
            position: row.get(3)?,
            date: row.get(4)?,
            clock_in: row.get(5)?,
            clock_out: row.get(6)?,
            method: CheckInMethod::parse(&method),
            is_late: row.get::<_, i64>(8)? != 0,
        })
    }

    fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
        Ok(Message {
            id: row.get(0)?,
            from_id: row.get(1)?,
            to_id: row.get(2)?,
            text: row.get(3)?,
            timestamp: row.get(4)?,
            read: row.get::<_, i64>(5)? != 0,
        })
    }

    fn suggestion_from_row(row: &Row<'_>) -> rusqlite::Result<Suggestion> {
        Ok(Suggestion {
            id: row.get(0)?,
            author_id: row.get(1)?,
            author_name: row.get(2)?,
            text: row.get(3)?,
            date: row.get(4)?,
        })
    }
}

fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool, StoreError> {
    Ok(conn
        .prepare(&format!("SELECT 1 FROM {} WHERE id = ?1", table))?
        .exists([id])?)
}

#[async_trait]
impl HrStore for SqliteStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tasks ORDER BY created_at ASC, id ASC",
                TASK_COLUMNS
            ))?;
            let tasks = stmt
                .query_map([], Self::task_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
        .await
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                    [&id],
                    Self::task_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let tasks = tasks.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for task in &tasks {
                if exists(&tx, "tasks", &task.id)? {
                    return Err(StoreError::duplicate("Task", &task.id));
                }
                Self::write_task(&tx, task, task.version, true)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn update_tasks(&self, tasks: &[Task]) -> Result<Vec<Task>, StoreError> {
        let tasks = tasks.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut written = Vec::with_capacity(tasks.len());
            for task in tasks {
                let stored: Option<i64> = tx
                    .query_row("SELECT version FROM tasks WHERE id = ?1", [&task.id], |row| {
                        row.get(0)
                    })
                    .optional()?;
                let stored = stored.ok_or_else(|| StoreError::not_found("Task", &task.id))? as u64;
                if stored != task.version {
                    return Err(StoreError::Conflict {
                        id: task.id.clone(),
                        expected: task.version,
                        actual: stored,
                    });
                }
                let mut next = task;
                next.version += 1;
                Self::write_task(&tx, &next, next.version, false)?;
                written.push(next);
            }
            tx.commit()?;
            Ok(written)
        })
        .await
    }

    async fn delete_task(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| Ok(conn.execute("DELETE FROM tasks WHERE id = ?1", [&id])? > 0))
            .await
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM employees ORDER BY last_name, first_name, id",
                EMPLOYEE_COLUMNS
            ))?;
            let employees = stmt
                .query_map([], Self::employee_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(employees)
        })
        .await
    }

    async fn get_employee(&self, id: &str) -> Result<Option<Employee>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {} FROM employees WHERE id = ?1", EMPLOYEE_COLUMNS),
                    [&id],
                    Self::employee_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn insert_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        let employee = employee.clone();
        self.with_conn(move |conn| {
            if exists(conn, "employees", &employee.id)? {
                return Err(StoreError::duplicate("Employee", &employee.id));
            }
            Self::write_employee(conn, &employee, true)?;
            Ok(())
        })
        .await
    }

    async fn put_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        let employee = employee.clone();
        self.with_conn(move |conn| {
            if Self::write_employee(conn, &employee, false)? == 0 {
                return Err(StoreError::not_found("Employee", &employee.id));
            }
            Ok(())
        })
        .await
    }

    async fn find_employee_by_login(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<Employee>, StoreError> {
        let (login, password) = (login.to_string(), password.to_string());
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {} FROM employees WHERE system_login = ?1 AND system_password = ?2",
                        EMPLOYEE_COLUMNS
                    ),
                    params![login, password],
                    Self::employee_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn list_catalogs(&self) -> Result<Vec<Catalog>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, positions, parent_id FROM catalogs ORDER BY rowid")?;
            let catalogs = stmt
                .query_map([], |row| {
                    let positions: String = row.get(2)?;
                    Ok(Catalog {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        positions: serde_json::from_str(&positions).unwrap_or_default(),
                        parent_id: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(catalogs)
        })
        .await
    }

    async fn insert_catalog(&self, catalog: &Catalog) -> Result<(), StoreError> {
        let catalog = catalog.clone();
        self.with_conn(move |conn| {
            if exists(conn, "catalogs", &catalog.id)? {
                return Err(StoreError::duplicate("Catalog", &catalog.id));
            }
            conn.execute(
                "INSERT INTO catalogs (id, name, positions, parent_id) VALUES (?1, ?2, ?3, ?4)",
                params![
                    catalog.id,
                    catalog.name,
                    serde_json::to_string(&catalog.positions)?,
                    catalog.parent_id
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let user = user.clone();
        self.with_conn(move |conn| {
            let taken = conn
                .prepare("SELECT 1 FROM users WHERE id = ?1 OR username = ?2")?
                .exists(params![user.id, user.username])?;
            if taken {
                return Err(StoreError::duplicate("User", &user.username));
            }
            conn.execute(
                "INSERT INTO users (id, username, password, role, full_name, employee_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id,
                    user.username,
                    user.password,
                    user.role.as_str(),
                    user.full_name,
                    user.employee_id
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_user(&self, username: &str, password: &str) -> Result<Option<User>, StoreError> {
        let (username, password) = (username.to_string(), password.to_string());
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, username, password, role, full_name, employee_id FROM users \
                     WHERE username = ?1 AND password = ?2",
                    params![username, password],
                    Self::user_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn count_users(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM attendance ORDER BY clock_in ASC",
                ATTENDANCE_COLUMNS
            ))?;
            let records = stmt
                .query_map([], Self::attendance_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let record = record.clone();
        self.with_conn(move |conn| {
            if exists(conn, "attendance", &record.id)? {
                return Err(StoreError::duplicate("Attendance record", &record.id));
            }
            conn.execute(
                &format!(
                    "INSERT INTO attendance ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    ATTENDANCE_COLUMNS
                ),
                params![
                    record.id,
                    record.employee_id,
                    record.employee_name,
                    record.position,
                    record.date,
                    record.clock_in,
                    record.clock_out,
                    record.method.as_str(),
                    record.is_late as i64,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn finish_attendance(
        &self,
        employee_id: &str,
        date: &str,
        clock_out: i64,
    ) -> Result<usize, StoreError> {
        let (employee_id, date) = (employee_id.to_string(), date.to_string());
        self.with_conn(move |conn| {
            Ok(conn.execute(
                "UPDATE attendance SET clock_out = ?3 \
                 WHERE employee_id = ?1 AND date = ?2 AND clock_out IS NULL",
                params![employee_id, date, clock_out],
            )?)
        })
        .await
    }

    async fn delete_attendance(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            Ok(conn.execute("DELETE FROM attendance WHERE id = ?1", [&id])? > 0)
        })
        .await
    }

    async fn messages_for(&self, user_id: &str) -> Result<Vec<Message>, StoreError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, from_id, to_id, text, timestamp, read FROM messages \
                 WHERE from_id = ?1 OR to_id = ?1 ORDER BY timestamp ASC",
            )?;
            let messages = stmt
                .query_map([&user_id], Self::message_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        let message = message.clone();
        self.with_conn(move |conn| {
            if exists(conn, "messages", &message.id)? {
                return Err(StoreError::duplicate("Message", &message.id));
            }
            conn.execute(
                "INSERT INTO messages (id, from_id, to_id, text, timestamp, read) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id,
                    message.from_id,
                    message.to_id,
                    message.text,
                    message.timestamp,
                    message.read as i64
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn mark_read(&self, user_id: &str, contact_id: &str) -> Result<usize, StoreError> {
        let (user_id, contact_id) = (user_id.to_string(), contact_id.to_string());
        self.with_conn(move |conn| {
            Ok(conn.execute(
                "UPDATE messages SET read = 1 WHERE to_id = ?1 AND from_id = ?2 AND read = 0",
                params![user_id, contact_id],
            )?)
        })
        .await
    }

    async fn list_suggestions(&self) -> Result<Vec<Suggestion>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, author_name, text, date FROM suggestions ORDER BY date ASC",
            )?;
            let suggestions = stmt
                .query_map([], Self::suggestion_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(suggestions)
        })
        .await
    }

    async fn get_suggestion(&self, id: &str) -> Result<Option<Suggestion>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, author_id, author_name, text, date FROM suggestions WHERE id = ?1",
                    [&id],
                    Self::suggestion_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<(), StoreError> {
        let suggestion = suggestion.clone();
        self.with_conn(move |conn| {
            if exists(conn, "suggestions", &suggestion.id)? {
                return Err(StoreError::duplicate("Suggestion", &suggestion.id));
            }
            conn.execute(
                "INSERT INTO suggestions (id, author_id, author_name, text, date) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    suggestion.id,
                    suggestion.author_id,
                    suggestion.author_name,
                    suggestion.text,
                    suggestion.date
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_suggestion(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            Ok(conn.execute("DELETE FROM suggestions WHERE id = ?1", [&id])? > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::employee;

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteStore::new(dir.path().to_path_buf()).await.unwrap();
            let mut emp = employee("e1", "Ann", "Lee", "cat-1");
            emp.working_days = vec!["Mon".into(), "Tue".into()];
            emp.system_login = Some("ann".into());
            emp.system_password = Some("pw".into());
            store.insert_employee(&emp).await.unwrap();

            let mut task = Task::new("t1", "Audit", "m1", "e1", TaskStatus::PendingHr, 5);
            task.sub_tasks = vec![crate::workflow::SubTask {
                id: "t1-sub-0".into(),
                title: "Collect".into(),
                completed: false,
            }];
            task.is_chain_task = true;
            task.chain_step = Some(1);
            store.insert_tasks(&[task]).await.unwrap();
        }

        let store = SqliteStore::new(dir.path().to_path_buf()).await.unwrap();
        let emp = store.find_employee_by_login("ann", "pw").await.unwrap().unwrap();
        assert_eq!(emp.working_days, vec!["Mon", "Tue"]);
        assert!(store.find_employee_by_login("ann", "nope").await.unwrap().is_none());

        let task = store.get_task("t1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::PendingHr);
        assert_eq!(task.sub_tasks.len(), 1);
        assert_eq!(task.chain_step, Some(1));
        assert!(task.is_chain_task);
    }

    #[tokio::test]
    async fn corrupt_checklist_fails_the_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().to_path_buf()).await.unwrap();
        let task = Task::new("t1", "Audit", "m1", "e1", TaskStatus::InReview, 5);
        store.insert_tasks(&[task]).await.unwrap();
        store
            .with_conn(|conn| {
                conn.execute("UPDATE tasks SET sub_tasks = 'not json' WHERE id = 't1'", [])?;
                Ok(())
            })
            .await
            .unwrap();

        // An empty checklist here would let the task through the completion gate
        assert!(store.get_task("t1").await.is_err());
        assert!(store.list_tasks().await.is_err());
    }

    #[tokio::test]
    async fn attendance_finish_closes_open_rows_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().to_path_buf()).await.unwrap();
        let open = AttendanceRecord {
            id: "a1".into(),
            employee_id: "e1".into(),
            employee_name: "Ann Lee".into(),
            position: "Clerk".into(),
            date: "2026-03-02".into(),
            clock_in: 10,
            clock_out: None,
            method: CheckInMethod::QrCode,
            is_late: true,
        };
        let closed = AttendanceRecord {
            id: "a0".into(),
            clock_out: Some(5),
            clock_in: 1,
            ..open.clone()
        };
        store.insert_attendance(&closed).await.unwrap();
        store.insert_attendance(&open).await.unwrap();

        assert_eq!(store.finish_attendance("e1", "2026-03-02", 99).await.unwrap(), 1);
        assert_eq!(store.finish_attendance("e1", "2026-03-02", 100).await.unwrap(), 0);
        let records = store.list_attendance().await.unwrap();
        assert_eq!(records[0].clock_out, Some(5));
        assert_eq!(records[1].clock_out, Some(99));
        assert_eq!(records[1].method, CheckInMethod::QrCode);
    }

    #[tokio::test]
    async fn mark_read_is_directional() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().to_path_buf()).await.unwrap();
        store.insert_message(&Message::new("a", "b", "hi", 1)).await.unwrap();
        store.insert_message(&Message::new("b", "a", "yo", 2)).await.unwrap();
        assert_eq!(store.mark_read("b", "a").await.unwrap(), 1);
        let msgs = store.messages_for("a").await.unwrap();
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].read);
        assert!(!msgs[1].read);
    }
}
