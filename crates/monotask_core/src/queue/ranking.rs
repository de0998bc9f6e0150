//! Ranking comparator and the ranked today queue.
//!
//! # Responsibility
//! - Define the total order shared by the triage list and the focus queue.
//!
//! # Invariants
//! - Key order: priority, then due date (absence sorting last), then
//!   manual order index, then creation time.
//! - Sorting is stable: full ties retain input order.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::model::task::Task;
use crate::queue::eligibility::is_eligible_today;

/// Compares two tasks for queue position, strongest first.
///
/// At equal priority, earlier deadlines come first and any deadline
/// outranks none. Comparing the absence as "latest" keeps the relation a
/// total order; skipping the key for one-sided deadlines would admit
/// cycles, and `sort_by` requires consistency.
pub fn rank(a: &Task, b: &Task) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| due_key(a.due_at).cmp(&due_key(b.due_at)))
        .then_with(|| a.order_index.cmp(&b.order_index))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

fn due_key(due_at: Option<DateTime<Utc>>) -> (bool, Option<DateTime<Utc>>) {
    (due_at.is_none(), due_at)
}

/// Filters for today-eligibility and sorts by `rank`.
///
/// The result is the focus queue: index 0 is the single task the focus view
/// presents.
pub fn ranked_today(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    let mut queue: Vec<&Task> = tasks
        .iter()
        .filter(|task| is_eligible_today(task, now))
        .collect();
    queue.sort_by(|a, b| rank(a, b));
    queue
}
