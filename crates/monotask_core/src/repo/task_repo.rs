//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the durable-store surface consumed by hydration and the
//!   write-behind queue: load, targeted writes, and the snapshot primitives.
//! - Keep SQL and column codecs inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state (`InvalidData`) instead of
//!   masking it.
//! - `load_all` returns rows ordered by `order_index`, then `created_at`.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::task::{Priority, Subtask, Task, TaskId, TaskStatus, TaskValidationError};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    notes,
    status,
    priority,
    estimate_minutes,
    due_at,
    scheduled_at,
    snooze_until,
    completed_at,
    created_at,
    order_index,
    tags,
    skips_count,
    subtasks
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection not migrated: schema version {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Durable-store surface for tasks.
///
/// `clear` + `bulk_insert` form the snapshot-replace contract; the store's
/// mutation paths prefer the targeted-delta methods and only use the
/// snapshot primitives for seeding.
pub trait TaskRepository {
    /// Loads every row, ordered by `order_index` then `created_at`.
    fn load_all(&self) -> RepoResult<Vec<Task>>;
    fn insert(&self, task: &Task) -> RepoResult<()>;
    /// Inserts all rows inside one transaction.
    fn bulk_insert(&self, tasks: &[Task]) -> RepoResult<()>;
    /// Replaces the full row for `task.id`.
    fn update(&self, task: &Task) -> RepoResult<()>;
    fn delete(&self, id: TaskId) -> RepoResult<()>;
    /// Deletes every listed id inside one transaction. Missing ids are not
    /// an error here; the in-memory layer decides the not-found policy.
    fn delete_many(&self, ids: &[TaskId]) -> RepoResult<()>;
    /// Applies `(id, order_index)` pairs inside one transaction.
    fn update_order_indexes(&self, entries: &[(TaskId, i64)]) -> RepoResult<()>;
    fn clear(&self) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Constructs a repository from a migrated, ready connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` when the `tasks` table is absent.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "tasks")?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn load_all(&self) -> RepoResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} ORDER BY order_index ASC, created_at ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn insert(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (
                id, title, notes, status, priority, estimate_minutes,
                due_at, scheduled_at, snooze_until, completed_at, created_at,
                order_index, tags, skips_count, subtasks
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
            params_from_iter(task_params(task)?),
        )?;

        Ok(())
    }

    fn bulk_insert(&self, tasks: &[Task]) -> RepoResult<()> {
        for task in tasks {
            task.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tasks (
                    id, title, notes, status, priority, estimate_minutes,
                    due_at, scheduled_at, snooze_until, completed_at, created_at,
                    order_index, tags, skips_count, subtasks
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
            )?;
            for task in tasks {
                stmt.execute(params_from_iter(task_params(task)?))?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn update(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?2,
                notes = ?3,
                status = ?4,
                priority = ?5,
                estimate_minutes = ?6,
                due_at = ?7,
                scheduled_at = ?8,
                snooze_until = ?9,
                completed_at = ?10,
                created_at = ?11,
                order_index = ?12,
                tags = ?13,
                skips_count = ?14,
                subtasks = ?15
             WHERE id = ?1;",
            params_from_iter(task_params(task)?),
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(task.id));
        }

        Ok(())
    }

    fn delete(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_many(&self, ids: &[TaskId]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM tasks WHERE id = ?1;")?;
            for id in ids {
                stmt.execute([id.to_string()])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn update_order_indexes(&self, entries: &[(TaskId, i64)]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE tasks SET order_index = ?2 WHERE id = ?1;")?;
            for (id, order_index) in entries {
                stmt.execute(params![id.to_string(), order_index])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn clear(&self) -> RepoResult<()> {
        self.conn.execute("DELETE FROM tasks;", [])?;
        Ok(())
    }
}

pub(crate) fn ensure_connection_ready(conn: &Connection, table: &'static str) -> RepoResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version == 0 {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::MissingRequiredTable(table));
    }

    Ok(())
}

fn task_params(task: &Task) -> RepoResult<Vec<Value>> {
    Ok(vec![
        Value::Text(task.id.to_string()),
        Value::Text(task.title.clone()),
        opt_text(task.notes.clone()),
        Value::Text(status_to_db(task.status).to_string()),
        Value::Text(priority_to_db(task.priority).to_string()),
        opt_integer(task.estimate_minutes.map(i64::from)),
        opt_integer(task.due_at.map(to_epoch_ms)),
        opt_integer(task.scheduled_at.map(to_epoch_ms)),
        opt_integer(task.snooze_until.map(to_epoch_ms)),
        opt_integer(task.completed_at.map(to_epoch_ms)),
        Value::Integer(to_epoch_ms(task.created_at)),
        Value::Integer(task.order_index),
        Value::Text(serde_json::to_string(&task.tags)?),
        Value::Integer(i64::from(task.skips_count)),
        Value::Text(serde_json::to_string(&task.subtasks)?),
    ])
}

fn opt_text(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::Text)
}

fn opt_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in tasks.id")))?;

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = parse_priority(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;

    let tags_text: String = row.get("tags")?;
    let tags: BTreeSet<String> = serde_json::from_str(&tags_text)
        .map_err(|err| RepoError::InvalidData(format!("invalid tags payload: {err}")))?;

    let subtasks_text: String = row.get("subtasks")?;
    let subtasks: Vec<Subtask> = serde_json::from_str(&subtasks_text)
        .map_err(|err| RepoError::InvalidData(format!("invalid subtasks payload: {err}")))?;

    let task = Task {
        id,
        title: row.get("title")?,
        notes: row.get("notes")?,
        status,
        priority,
        estimate_minutes: row.get("estimate_minutes")?,
        due_at: parse_epoch_ms_opt(row.get("due_at")?, "due_at")?,
        scheduled_at: parse_epoch_ms_opt(row.get("scheduled_at")?, "scheduled_at")?,
        snooze_until: parse_epoch_ms_opt(row.get("snooze_until")?, "snooze_until")?,
        completed_at: parse_epoch_ms_opt(row.get("completed_at")?, "completed_at")?,
        created_at: parse_epoch_ms(row.get("created_at")?, "created_at")?,
        order_index: row.get("order_index")?,
        tags,
        skips_count: row.get("skips_count")?,
        subtasks,
    };
    task.validate()?;
    Ok(task)
}

fn status_to_db(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Active => "active",
        TaskStatus::Done => "done",
        TaskStatus::Archived => "archived",
    }
}

fn parse_status(value: &str) -> Option<TaskStatus> {
    match value {
        "active" => Some(TaskStatus::Active),
        "done" => Some(TaskStatus::Done),
        "archived" => Some(TaskStatus::Archived),
        _ => None,
    }
}

fn priority_to_db(priority: Priority) -> &'static str {
    match priority {
        Priority::Pinned => "pinned",
        Priority::High => "high",
        Priority::Normal => "normal",
        Priority::Low => "low",
    }
}

fn parse_priority(value: &str) -> Option<Priority> {
    match value {
        "pinned" => Some(Priority::Pinned),
        "high" => Some(Priority::High),
        "normal" => Some(Priority::Normal),
        "low" => Some(Priority::Low),
        _ => None,
    }
}

fn to_epoch_ms(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

fn parse_epoch_ms(value: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| RepoError::InvalidData(format!("invalid epoch ms `{value}` in tasks.{column}")))
}

fn parse_epoch_ms_opt(value: Option<i64>, column: &str) -> RepoResult<Option<DateTime<Utc>>> {
    value.map(|ms| parse_epoch_ms(ms, column)).transpose()
}
