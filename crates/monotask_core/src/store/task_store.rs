//! Task store: hydration, mutation operations and the focus pointer.
//!
//! # Responsibility
//! - Hold the authoritative in-memory task collection and user settings.
//! - Apply every mutation atomically from the caller's point of view, then
//!   enqueue the matching write-behind command.
//!
//! # Invariants
//! - Mutations validate before touching state; a returned error means
//!   nothing changed.
//! - Not-found is an error for every id-addressed operation, uniformly.
//! - `completed_at` is written exactly once per task.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

use chrono::{DateTime, Local, Utc};
use log::{debug, info};

use crate::db::open_db;
use crate::model::settings::Settings;
use crate::model::task::{
    Priority, Task, TaskDraft, TaskId, TaskPatch, TaskStatus, TaskValidationError,
};
use crate::persist::{StoreCommand, SyncStatus, WriteBehind};
use crate::queue::{ranked_today, start_of_local_day};
use crate::repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
use crate::repo::task_repo::{RepoError, SqliteTaskRepository, TaskRepository};
use crate::store::events::{StoreEvent, SubscriberId, Subscribers};

/// Synchronous error surface of the mutation operations.
///
/// Store I/O failures never appear here; they are logged by the writer
/// thread and visible through `sync_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    Validation(TaskValidationError),
    NotFound(TaskId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

/// The authoritative in-memory store behind every view.
///
/// Obtained through [`TaskStore::open`]; until that returns, the store does
/// not exist and consumers have nothing to observe. Mutators take
/// `&mut self`, so operations cannot interleave.
pub struct TaskStore {
    tasks: Vec<Task>,
    settings: Settings,
    focus_index: usize,
    queue: WriteBehind,
    subscribers: Subscribers,
}

impl TaskStore {
    /// Hydrates the store from the database at `path`.
    ///
    /// # Contract
    /// - Opens and migrates the database.
    /// - Seeds the fixed example set into an empty store before loading.
    /// - Loads rows ordered by `order_index`, and settings (or defaults).
    /// - Hands the connection to the writer thread last; no write-behind
    ///   command can precede hydration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let conn = open_db(path)?;

        let (tasks, settings) = {
            let task_repo = SqliteTaskRepository::try_new(&conn)?;
            let mut tasks = task_repo.load_all()?;
            if tasks.is_empty() {
                let seeds = seed_tasks(Utc::now());
                task_repo.bulk_insert(&seeds)?;
                tasks = task_repo.load_all()?;
                info!(
                    "event=store_seed module=store status=ok count={}",
                    tasks.len()
                );
            }

            let settings_repo = SqliteSettingsRepository::try_new(&conn)?;
            let settings = settings_repo.load()?.unwrap_or_default();
            (tasks, settings)
        };

        let queue = WriteBehind::spawn(conn)?;
        info!(
            "event=store_hydrated module=store status=ok tasks={}",
            tasks.len()
        );

        Ok(Self {
            tasks,
            settings,
            focus_index: 0,
            queue,
            subscribers: Subscribers::default(),
        })
    }

    // ---- reads ----------------------------------------------------------

    /// Every task, in hydration/insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Eligible tasks for `now`'s day, ranked. Index 0 is the focus task.
    pub fn today_queue(&self, now: DateTime<Utc>) -> Vec<&Task> {
        ranked_today(&self.tasks, now)
    }

    pub fn focus_index(&self) -> usize {
        self.focus_index
    }

    /// The task the focus view currently presents, or `None` when the
    /// pointer has walked past the end of the queue.
    pub fn current_focus(&self, now: DateTime<Utc>) -> Option<&Task> {
        self.today_queue(now).get(self.focus_index).copied()
    }

    /// Write-behind health for a sync indicator.
    pub fn sync_status(&self) -> SyncStatus {
        self.queue.status()
    }

    /// Blocks until every enqueued write has been applied to the database.
    pub fn flush(&self) {
        self.queue.flush();
    }

    // ---- subscriptions --------------------------------------------------

    pub fn subscribe(&mut self, callback: impl Fn(StoreEvent) + Send + 'static) -> SubscriberId {
        self.subscribers.subscribe(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.unsubscribe(id);
    }

    // ---- mutations ------------------------------------------------------

    /// Adds a task from a draft.
    ///
    /// # Contract
    /// - `Validation` when the trimmed title is empty; nothing changes.
    /// - `order_index` becomes max existing + 1 (0 on an empty store).
    /// - `scheduled_at` defaults to the start of `now`'s local day.
    pub fn add(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<TaskId, StoreError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(StoreError::Validation(TaskValidationError::EmptyTitle));
        }

        let mut task = Task::new(title, now);
        task.notes = draft.notes;
        task.priority = draft.priority.unwrap_or(Priority::Normal);
        task.estimate_minutes = draft.estimate_minutes;
        task.due_at = draft.due_at;
        task.scheduled_at = Some(
            draft
                .scheduled_at
                .unwrap_or_else(|| start_of_local_day(now)),
        );
        task.tags = draft.tags;
        task.subtasks = draft.subtasks;
        task.order_index = self.next_order_index();

        let id = task.id;
        debug!(
            "event=task_add module=store status=ok id={id} order_index={}",
            task.order_index
        );
        self.tasks.push(task.clone());
        self.subscribers.notify(StoreEvent::TasksChanged);
        self.queue.enqueue(StoreCommand::Insert(task));
        Ok(id)
    }

    /// Merges a partial update into an existing task.
    pub fn update(&mut self, id: TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        let merged = patch.apply_to(&self.tasks[index]);
        merged.validate()?;

        debug!("event=task_update module=store status=ok id={id}");
        self.tasks[index] = merged.clone();
        self.subscribers.notify(StoreEvent::TasksChanged);
        self.queue.enqueue(StoreCommand::Update(merged));
        Ok(())
    }

    /// Permanently removes a task.
    pub fn remove(&mut self, id: TaskId) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        self.tasks.remove(index);

        debug!("event=task_remove module=store status=ok id={id}");
        self.subscribers.notify(StoreEvent::TasksChanged);
        self.queue.enqueue(StoreCommand::Delete(id));
        Ok(())
    }

    /// Marks a task done.
    ///
    /// # Contract
    /// - Sets `status = Done`, `completed_at = now`, clears `snooze_until`.
    /// - A task that already left `Active` is a no-op: `completed_at` is
    ///   written exactly once, so history grouping never shifts.
    pub fn complete(&mut self, id: TaskId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        if self.tasks[index].status != TaskStatus::Active {
            debug!("event=task_complete module=store status=noop id={id}");
            return Ok(());
        }

        let task = &mut self.tasks[index];
        task.status = TaskStatus::Done;
        task.completed_at = Some(now);
        task.snooze_until = None;
        let task = task.clone();

        debug!("event=task_complete module=store status=ok id={id}");
        self.subscribers.notify(StoreEvent::TasksChanged);
        self.queue.enqueue(StoreCommand::Update(task));
        Ok(())
    }

    /// Sets the snooze instant.
    ///
    /// `until` is not validated against the clock: a past instant is
    /// already expired under the eligibility rule and acts as no snooze.
    pub fn snooze(&mut self, id: TaskId, until: DateTime<Utc>) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        self.tasks[index].snooze_until = Some(until);
        let task = self.tasks[index].clone();

        debug!("event=task_snooze module=store status=ok id={id}");
        self.subscribers.notify(StoreEvent::TasksChanged);
        self.queue.enqueue(StoreCommand::Update(task));
        Ok(())
    }

    /// Sends a task to the back of the manual order and counts the skip.
    pub fn skip(&mut self, id: TaskId) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        let next_index = self.next_order_index();
        let task = &mut self.tasks[index];
        task.order_index = next_index;
        task.skips_count += 1;
        let task = task.clone();

        debug!(
            "event=task_skip module=store status=ok id={id} skips={}",
            task.skips_count
        );
        self.subscribers.notify(StoreEvent::TasksChanged);
        self.queue.enqueue(StoreCommand::Update(task));
        Ok(())
    }

    /// Reassigns `order_index` by position in `ordered_ids`.
    ///
    /// # Contract
    /// - Every supplied id must exist; an unknown id fails with `NotFound`
    ///   before any index is touched.
    /// - Tasks absent from the list keep their previous `order_index`.
    pub fn reorder(&mut self, ordered_ids: &[TaskId]) -> Result<(), StoreError> {
        for id in ordered_ids {
            if !self.tasks.iter().any(|task| task.id == *id) {
                return Err(StoreError::NotFound(*id));
            }
        }

        let mut entries = Vec::with_capacity(ordered_ids.len());
        for (position, id) in ordered_ids.iter().enumerate() {
            if let Some(task) = self.tasks.iter_mut().find(|task| task.id == *id) {
                task.order_index = position as i64;
                entries.push((*id, position as i64));
            }
        }

        debug!(
            "event=task_reorder module=store status=ok count={}",
            entries.len()
        );
        self.subscribers.notify(StoreEvent::TasksChanged);
        self.queue.enqueue(StoreCommand::UpdateOrder(entries));
        Ok(())
    }

    /// Removes every task completed on `now`'s local calendar day.
    ///
    /// Returns how many were removed; zero removals change nothing.
    pub fn clear_done_today(&mut self, now: DateTime<Utc>) -> usize {
        let today = now.with_timezone(&Local).date_naive();
        let removed: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|task| {
                task.status == TaskStatus::Done
                    && task
                        .completed_at
                        .unwrap_or(task.created_at)
                        .with_timezone(&Local)
                        .date_naive()
                        == today
            })
            .map(|task| task.id)
            .collect();

        if removed.is_empty() {
            return 0;
        }

        self.tasks.retain(|task| !removed.contains(&task.id));
        debug!(
            "event=task_clear_done module=store status=ok count={}",
            removed.len()
        );
        self.subscribers.notify(StoreEvent::TasksChanged);
        let count = removed.len();
        self.queue.enqueue(StoreCommand::DeleteMany(removed));
        count
    }

    /// Replaces user settings.
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
        debug!("event=settings_update module=store status=ok");
        self.subscribers.notify(StoreEvent::SettingsChanged);
        self.queue.enqueue(StoreCommand::SaveSettings(settings));
    }

    /// Moves the focus pointer. The pointer may point past the end of the
    /// queue; reads then yield `None` ("nothing left today").
    pub fn set_focus_index(&mut self, index: usize) {
        self.focus_index = index;
        self.subscribers.notify(StoreEvent::FocusMoved);
    }

    // ---- internals ------------------------------------------------------

    fn index_of(&self, id: TaskId) -> Result<usize, StoreError> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn next_order_index(&self) -> i64 {
        self.tasks
            .iter()
            .map(|task| task.order_index)
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// The example tasks a fresh store starts with.
fn seed_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let today = start_of_local_day(now);
    let mut seeds = Vec::new();

    let mut plan = Task::new("Plan your day", now);
    plan.priority = Priority::Pinned;
    plan.estimate_minutes = Some(10);
    plan.scheduled_at = Some(today);
    plan.order_index = 0;
    seeds.push(plan);

    let mut inbox = Task::new("Review your inbox", now);
    inbox.estimate_minutes = Some(15);
    inbox.scheduled_at = Some(today);
    inbox.order_index = 1;
    seeds.push(inbox);

    let mut walk = Task::new("Take a short walk", now);
    walk.priority = Priority::Low;
    walk.estimate_minutes = Some(20);
    walk.scheduled_at = Some(today);
    walk.order_index = 2;
    seeds.push(walk);

    seeds
}
