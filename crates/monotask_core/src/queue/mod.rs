//! Eligibility and ranking engine for the today queue.
//!
//! # Responsibility
//! - Decide which tasks qualify for the current day.
//! - Produce the deterministic total order used by the triage list and the
//!   one-task-at-a-time focus queue.
//!
//! # Invariants
//! - Every function here is pure: no clock reads, no store access. The
//!   caller passes `now` in, freshly read per evaluation.

mod eligibility;
mod ranking;
mod stats;

pub use eligibility::{end_of_local_day, is_eligible_today, start_of_local_day};
pub use ranking::{rank, ranked_today};
pub use stats::{completions_by_day, planned_minutes_today};
