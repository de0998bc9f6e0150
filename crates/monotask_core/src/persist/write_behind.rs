//! Ordered write-behind queue over the SQLite repositories.
//!
//! # Responsibility
//! - Drain store commands FIFO on one writer thread that owns the
//!   connection.
//! - Map every command to targeted SQL; reorder and clear-done persist as
//!   per-key deltas, not whole-collection snapshots.
//!
//! # Invariants
//! - Command order equals mutation order: a single channel, a single
//!   consumer.
//! - `Flush` acknowledges only after every earlier command was applied.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Sender};
use log::{debug, error, info};
use rusqlite::Connection;

use crate::model::settings::Settings;
use crate::model::task::{Task, TaskId};
use crate::repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
use crate::repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};

/// One durable-store write, mirroring a single in-memory mutation.
#[derive(Debug)]
pub enum StoreCommand {
    Insert(Task),
    Update(Task),
    Delete(TaskId),
    DeleteMany(Vec<TaskId>),
    UpdateOrder(Vec<(TaskId, i64)>),
    SaveSettings(Settings),
    /// Acknowledges once every earlier command has been applied.
    Flush(Sender<()>),
}

impl StoreCommand {
    fn label(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::DeleteMany(_) => "delete_many",
            Self::UpdateOrder(_) => "update_order",
            Self::SaveSettings(_) => "save_settings",
            Self::Flush(_) => "flush",
        }
    }
}

/// Snapshot of write-behind health, readable at any time by the UI shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Commands enqueued but not yet applied.
    pub pending: u64,
    /// Commands applied successfully.
    pub completed: u64,
    /// Commands that failed; in-memory state is ahead of durable state.
    pub failed: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: u64,
    completed: u64,
    failed: u64,
    last_error: Option<String>,
}

/// Handle to the writer thread. Dropping it drains what was already
/// enqueued, then joins the thread.
pub struct WriteBehind {
    tx: Option<Sender<StoreCommand>>,
    counters: Arc<Mutex<Counters>>,
    worker: Option<JoinHandle<()>>,
}

impl WriteBehind {
    /// Takes ownership of a migrated connection and starts the writer.
    pub fn spawn(conn: Connection) -> RepoResult<Self> {
        // Why: validate the connection while the caller can still observe
        // the error; past this point the writer can only log.
        SqliteTaskRepository::try_new(&conn)?;
        SqliteSettingsRepository::try_new(&conn)?;

        let (tx, rx) = unbounded::<StoreCommand>();
        let counters = Arc::new(Mutex::new(Counters::default()));
        let worker_counters = Arc::clone(&counters);

        let worker = std::thread::Builder::new()
            .name("monotask-store-writer".to_string())
            .spawn(move || {
                let task_repo = match SqliteTaskRepository::try_new(&conn) {
                    Ok(repo) => repo,
                    Err(err) => {
                        error!(
                            "event=store_writer module=persist status=error error_code=repo_init_failed error={err}"
                        );
                        return;
                    }
                };
                let settings_repo = match SqliteSettingsRepository::try_new(&conn) {
                    Ok(repo) => repo,
                    Err(err) => {
                        error!(
                            "event=store_writer module=persist status=error error_code=repo_init_failed error={err}"
                        );
                        return;
                    }
                };

                while let Ok(command) = rx.recv() {
                    let command = match command {
                        StoreCommand::Flush(ack) => {
                            let _ = ack.send(());
                            continue;
                        }
                        other => other,
                    };

                    let label = command.label();
                    match apply(&task_repo, &settings_repo, command) {
                        Ok(()) => {
                            let mut counters = lock(&worker_counters);
                            counters.completed += 1;
                            debug!("event=store_write module=persist status=ok op={label}");
                        }
                        Err(err) => {
                            let mut counters = lock(&worker_counters);
                            counters.failed += 1;
                            counters.last_error = Some(err.to_string());
                            error!(
                                "event=store_write module=persist status=error op={label} error={err}"
                            );
                        }
                    }
                }

                info!("event=store_writer module=persist status=stopped");
            })
            .map_err(|err| RepoError::Db(err.into()))?;

        Ok(Self {
            tx: Some(tx),
            counters,
            worker: Some(worker),
        })
    }

    /// Enqueues a command without waiting for it to hit the store.
    pub fn enqueue(&self, command: StoreCommand) {
        let Some(tx) = &self.tx else { return };
        {
            let mut counters = lock(&self.counters);
            counters.enqueued += 1;
        }
        if tx.send(command).is_err() {
            // Writer is gone; record the loss instead of surfacing it.
            let mut counters = lock(&self.counters);
            counters.failed += 1;
            counters.last_error = Some("store writer is not running".to_string());
            error!("event=store_write module=persist status=error error_code=writer_gone");
        }
    }

    /// Blocks until every previously enqueued command has been applied.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else { return };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(StoreCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Current write-behind health.
    pub fn status(&self) -> SyncStatus {
        let counters = lock(&self.counters);
        SyncStatus {
            pending: counters
                .enqueued
                .saturating_sub(counters.completed + counters.failed),
            completed: counters.completed,
            failed: counters.failed,
            last_error: counters.last_error.clone(),
        }
    }
}

impl Drop for WriteBehind {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn apply(
    task_repo: &SqliteTaskRepository<'_>,
    settings_repo: &SqliteSettingsRepository<'_>,
    command: StoreCommand,
) -> RepoResult<()> {
    match command {
        StoreCommand::Insert(task) => task_repo.insert(&task),
        StoreCommand::Update(task) => task_repo.update(&task),
        StoreCommand::Delete(id) => task_repo.delete(id),
        StoreCommand::DeleteMany(ids) => task_repo.delete_many(&ids),
        StoreCommand::UpdateOrder(entries) => task_repo.update_order_indexes(&entries),
        StoreCommand::SaveSettings(settings) => settings_repo.save(&settings),
        StoreCommand::Flush(_) => Ok(()),
    }
}

fn lock(counters: &Mutex<Counters>) -> MutexGuard<'_, Counters> {
    // A poisoned lock only means a panic mid-update of plain integers;
    // the counters stay usable.
    match counters.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
