//! Read-side aggregates for the stats and heatmap views.
//!
//! # Responsibility
//! - Summarize the task collection for presentation; nothing here feeds
//!   back into eligibility or ranking.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::model::task::{Task, TaskStatus};
use crate::queue::eligibility::is_eligible_today;

/// Summed duration hints of today's eligible tasks, for display against the
/// configured daily capacity.
pub fn planned_minutes_today(tasks: &[Task], now: DateTime<Utc>) -> u32 {
    tasks
        .iter()
        .filter(|task| is_eligible_today(task, now))
        .filter_map(|task| task.estimate_minutes)
        .sum()
}

/// Completed-task counts grouped by local calendar day.
///
/// Rows missing `completed_at` (legacy data predating the invariant) fall
/// back to `created_at` so history never silently loses entries.
pub fn completions_by_day(tasks: &[Task]) -> BTreeMap<NaiveDate, u32> {
    let mut days: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for task in tasks {
        if task.status != TaskStatus::Done {
            continue;
        }
        let instant = task.completed_at.unwrap_or(task.created_at);
        let day = instant.with_timezone(&Local).date_naive();
        *days.entry(day).or_insert(0) += 1;
    }
    days
}
