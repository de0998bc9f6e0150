//! Core domain logic for the single-focus task manager.
//! This crate is the single source of truth for queue and lifecycle
//! invariants; presentation shells only render what it exposes.

pub mod db;
pub mod logging;
pub mod model;
pub mod persist;
pub mod queue;
pub mod repo;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::settings::Settings;
pub use model::task::{
    Priority, Subtask, Task, TaskDraft, TaskId, TaskPatch, TaskStatus, TaskValidationError,
};
pub use persist::SyncStatus;
pub use queue::{
    completions_by_day, end_of_local_day, is_eligible_today, planned_minutes_today, rank,
    ranked_today, start_of_local_day,
};
pub use repo::{
    RepoError, RepoResult, SettingsRepository, SqliteSettingsRepository, SqliteTaskRepository,
    TaskRepository,
};
pub use store::{StoreError, StoreEvent, SubscriberId, TaskStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
