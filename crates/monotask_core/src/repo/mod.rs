//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable-store contracts consumed by the task store.
//! - Isolate SQLite query details from store/business orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Task::validate()` before persistence.
//! - Repository reads reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod settings_repo;
pub mod task_repo;

pub use settings_repo::{SettingsRepository, SqliteSettingsRepository};
pub use task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
