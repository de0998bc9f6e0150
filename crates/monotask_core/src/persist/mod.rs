//! Fire-and-forget persistence behind the in-memory store.
//!
//! # Responsibility
//! - Apply store commands to SQLite on a dedicated writer thread, in the
//!   exact order mutations were enqueued.
//! - Surface write-behind health without ever blocking a mutation.
//!
//! # Invariants
//! - One writer thread owns the connection; there is no other store writer.
//! - Failures are logged and counted, never propagated to the mutating
//!   caller, never rolled back against in-memory state.

mod write_behind;

pub use write_behind::{StoreCommand, SyncStatus, WriteBehind};
