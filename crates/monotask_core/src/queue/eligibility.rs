//! Today-eligibility predicate and local day boundaries.
//!
//! # Responsibility
//! - Gate tasks on schedule and snooze against the caller-supplied clock.
//!
//! # Invariants
//! - Only `Active` tasks can be eligible.
//! - The schedule gate is inclusive at end of day; the snooze gate is
//!   inclusive at `now` (an exactly-expired snooze no longer suppresses).
//! - Day boundaries use millisecond precision, matching storage granularity.

use chrono::{DateTime, Days, Duration, Local, LocalResult, TimeZone, Utc};

use crate::model::task::{Task, TaskStatus};

/// Local midnight of `now`'s calendar day, in UTC.
pub fn start_of_local_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.with_timezone(&Local).date_naive();
    resolve_local_midnight(now, date)
}

/// Last representable millisecond of `now`'s local calendar day, in UTC.
pub fn end_of_local_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.with_timezone(&Local).date_naive();
    let next = date
        .checked_add_days(Days::new(1))
        .unwrap_or(date);
    resolve_local_midnight(now, next) - Duration::milliseconds(1)
}

/// Returns whether `task` qualifies for the current day's queue.
///
/// # Contract
/// - `false` unless `task.status == Active`.
/// - Schedule gate: absent, or `scheduled_at <= end_of_local_day(now)`.
/// - Snooze gate: absent, or `snooze_until <= now`.
pub fn is_eligible_today(task: &Task, now: DateTime<Utc>) -> bool {
    if task.status != TaskStatus::Active {
        return false;
    }

    if let Some(scheduled_at) = task.scheduled_at {
        if scheduled_at > end_of_local_day(now) {
            return false;
        }
    }

    if let Some(snooze_until) = task.snooze_until {
        if snooze_until > now {
            return false;
        }
    }

    true
}

fn resolve_local_midnight(now: DateTime<Utc>, date: chrono::NaiveDate) -> DateTime<Utc> {
    let midnight = match date.and_hms_opt(0, 0, 0) {
        Some(naive) => naive,
        None => return now,
    };
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(local) | LocalResult::Ambiguous(local, _) => {
            local.with_timezone(&Utc)
        }
        // Midnight erased by a DST gap; the day effectively starts an hour in.
        LocalResult::None => match (midnight + Duration::hours(1))
            .and_local_timezone(Local)
            .earliest()
        {
            Some(local) => local.with_timezone(&Utc),
            None => now,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Task;
    use chrono::Duration;

    fn task_at(now: DateTime<Utc>) -> Task {
        Task::new("t", now)
    }

    #[test]
    fn day_boundaries_bracket_now() {
        let now = Utc::now();
        let start = start_of_local_day(now);
        let end = end_of_local_day(now);
        assert!(start <= now);
        assert!(now <= end);
        // Days shrink or stretch around DST shifts but stay day-sized.
        let span = end - start + Duration::milliseconds(1);
        assert!(span >= Duration::hours(23) && span <= Duration::hours(25));
    }

    #[test]
    fn non_active_is_never_eligible() {
        let now = Utc::now();
        let mut done = task_at(now);
        done.status = TaskStatus::Done;
        done.completed_at = Some(now);
        assert!(!is_eligible_today(&done, now));

        let mut archived = task_at(now);
        archived.status = TaskStatus::Archived;
        assert!(!is_eligible_today(&archived, now));
    }

    #[test]
    fn snooze_suppresses_until_exactly_now() {
        let now = Utc::now();

        let mut snoozed = task_at(now);
        snoozed.snooze_until = Some(now + Duration::milliseconds(1));
        assert!(!is_eligible_today(&snoozed, now));

        snoozed.snooze_until = Some(now);
        assert!(is_eligible_today(&snoozed, now));

        snoozed.snooze_until = Some(now - Duration::hours(1));
        assert!(is_eligible_today(&snoozed, now));
    }

    #[test]
    fn schedule_gate_is_inclusive_at_day_end() {
        let now = Utc::now();
        let day_end = end_of_local_day(now);

        let mut scheduled = task_at(now);
        scheduled.scheduled_at = Some(day_end);
        assert!(is_eligible_today(&scheduled, now));

        scheduled.scheduled_at = Some(day_end + Duration::milliseconds(1));
        assert!(!is_eligible_today(&scheduled, now));

        scheduled.scheduled_at = None;
        assert!(is_eligible_today(&scheduled, now));
    }
}
