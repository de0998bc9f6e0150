use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use monotask_core::{
    start_of_local_day, Priority, Settings, StoreError, StoreEvent, TaskDraft, TaskId, TaskPatch,
    TaskStatus, TaskStore, TaskValidationError,
};
use tempfile::TempDir;
use uuid::Uuid;

fn open_store(dir: &TempDir) -> TaskStore {
    TaskStore::open(dir.path().join("tasks.db")).unwrap()
}

/// A store with the example seeds removed, for tests that need exact
/// collection contents.
fn open_empty_store(dir: &TempDir) -> TaskStore {
    let mut store = open_store(dir);
    let ids: Vec<TaskId> = store.tasks().iter().map(|task| task.id).collect();
    for id in ids {
        store.remove(id).unwrap();
    }
    store
}

fn draft(title: &str, priority: Priority) -> TaskDraft {
    TaskDraft {
        priority: Some(priority),
        ..TaskDraft::new(title)
    }
}

#[test]
fn add_rejects_blank_titles() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);

    let err = store.add(TaskDraft::new("   "), Utc::now()).unwrap_err();
    assert_eq!(
        err,
        StoreError::Validation(TaskValidationError::EmptyTitle)
    );
    assert!(store.tasks().is_empty());
}

#[test]
fn add_assigns_order_index_and_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let first = store.add(TaskDraft::new("first"), now).unwrap();
    let second = store.add(TaskDraft::new("second"), now).unwrap();

    let first_task = store.task(first).unwrap();
    assert_eq!(first_task.order_index, 0);
    assert_eq!(first_task.status, TaskStatus::Active);
    assert_eq!(first_task.skips_count, 0);
    assert_eq!(first_task.scheduled_at, Some(start_of_local_day(now)));
    assert_eq!(first_task.created_at, now);

    assert_eq!(store.task(second).unwrap().order_index, 1);

    // The counter follows the maximum, not the count.
    store.skip(first).unwrap();
    let third = store.add(TaskDraft::new("third"), now).unwrap();
    assert_eq!(store.task(first).unwrap().order_index, 2);
    assert_eq!(store.task(third).unwrap().order_index, 3);
}

#[test]
fn add_trims_the_title() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);

    let id = store.add(TaskDraft::new("  buy milk  "), Utc::now()).unwrap();
    assert_eq!(store.task(id).unwrap().title, "buy milk");
}

#[test]
fn complete_sets_done_fields_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let id = store.add(TaskDraft::new("finish it"), now).unwrap();
    store.snooze(id, now + Duration::hours(4)).unwrap();

    let completed_at = now + Duration::minutes(30);
    store.complete(id, completed_at).unwrap();

    let task = store.task(id).unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.completed_at, Some(completed_at));
    assert_eq!(task.snooze_until, None);

    // A second complete keeps the original completion instant.
    store.complete(id, completed_at + Duration::days(1)).unwrap();
    assert_eq!(store.task(id).unwrap().completed_at, Some(completed_at));
}

#[test]
fn snooze_sets_instant_without_touching_status() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let id = store.add(TaskDraft::new("later"), now).unwrap();
    let until = now + Duration::hours(2);
    store.snooze(id, until).unwrap();

    let task = store.task(id).unwrap();
    assert_eq!(task.snooze_until, Some(until));
    assert_eq!(task.status, TaskStatus::Active);

    // A snooze in the past is legal; the task stays eligible.
    store.snooze(id, now - Duration::hours(1)).unwrap();
    assert!(store.today_queue(now).iter().any(|task| task.id == id));
}

#[test]
fn skip_moves_to_back_and_counts() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let a = store.add(TaskDraft::new("a"), now).unwrap();
    let b = store.add(TaskDraft::new("b"), now).unwrap();
    let c = store.add(TaskDraft::new("c"), now).unwrap();

    let max_before = store
        .tasks()
        .iter()
        .map(|task| task.order_index)
        .max()
        .unwrap();
    store.skip(a).unwrap();

    let skipped = store.task(a).unwrap();
    assert!(skipped.order_index > max_before);
    assert_eq!(skipped.skips_count, 1);

    let queue: Vec<TaskId> = store.today_queue(now).iter().map(|task| task.id).collect();
    assert_eq!(queue, [b, c, a]);

    store.skip(a).unwrap();
    assert_eq!(store.task(a).unwrap().skips_count, 2);
}

#[test]
fn skip_flag_uses_the_configured_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    store.update_settings(Settings {
        skip_limit: 2,
        ..Settings::default()
    });

    let id = store.add(TaskDraft::new("avoided"), now).unwrap();
    store.skip(id).unwrap();
    assert!(!store
        .settings()
        .skip_flagged(store.task(id).unwrap().skips_count));

    store.skip(id).unwrap();
    assert!(store
        .settings()
        .skip_flagged(store.task(id).unwrap().skips_count));
}

#[test]
fn reorder_round_trip_matches_permutation() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let a = store.add(TaskDraft::new("a"), now).unwrap();
    let b = store.add(TaskDraft::new("b"), now).unwrap();
    let c = store.add(TaskDraft::new("c"), now).unwrap();

    store.reorder(&[c, a, b]).unwrap();

    assert_eq!(store.task(c).unwrap().order_index, 0);
    assert_eq!(store.task(a).unwrap().order_index, 1);
    assert_eq!(store.task(b).unwrap().order_index, 2);

    let queue: Vec<TaskId> = store.today_queue(now).iter().map(|task| task.id).collect();
    assert_eq!(queue, [c, a, b]);
}

#[test]
fn reorder_with_unknown_id_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let a = store.add(TaskDraft::new("a"), now).unwrap();
    let b = store.add(TaskDraft::new("b"), now).unwrap();
    let unknown = Uuid::new_v4();

    let err = store.reorder(&[b, unknown, a]).unwrap_err();
    assert_eq!(err, StoreError::NotFound(unknown));

    // Atomic failure: the known ids kept their indexes.
    assert_eq!(store.task(a).unwrap().order_index, 0);
    assert_eq!(store.task(b).unwrap().order_index, 1);
}

#[test]
fn reorder_leaves_unlisted_tasks_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let a = store.add(TaskDraft::new("a"), now).unwrap();
    let b = store.add(TaskDraft::new("b"), now).unwrap();
    let c = store.add(TaskDraft::new("c"), now).unwrap();

    store.reorder(&[b, a]).unwrap();

    assert_eq!(store.task(b).unwrap().order_index, 0);
    assert_eq!(store.task(a).unwrap().order_index, 1);
    assert_eq!(store.task(c).unwrap().order_index, 2);
}

#[test]
fn update_merges_patch_fields() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let id = store.add(draft("draft", Priority::Low), now).unwrap();
    let due = now + Duration::days(2);

    store
        .update(
            id,
            &TaskPatch {
                title: Some("final".to_string()),
                priority: Some(Priority::High),
                due_at: Some(Some(due)),
                notes: Some(Some("ship it".to_string())),
                ..TaskPatch::default()
            },
        )
        .unwrap();

    let task = store.task(id).unwrap();
    assert_eq!(task.title, "final");
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.due_at, Some(due));
    assert_eq!(task.notes.as_deref(), Some("ship it"));

    // Clearing an optional field through the patch.
    store
        .update(
            id,
            &TaskPatch {
                due_at: Some(None),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    assert_eq!(store.task(id).unwrap().due_at, None);

    // A patch that empties the title is rejected without effect.
    let err = store
        .update(
            id,
            &TaskPatch {
                title: Some("  ".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(store.task(id).unwrap().title, "final");
}

#[test]
fn every_id_addressed_mutation_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();
    let unknown = Uuid::new_v4();

    assert_eq!(
        store.update(unknown, &TaskPatch::default()).unwrap_err(),
        StoreError::NotFound(unknown)
    );
    assert_eq!(store.remove(unknown).unwrap_err(), StoreError::NotFound(unknown));
    assert_eq!(
        store.complete(unknown, now).unwrap_err(),
        StoreError::NotFound(unknown)
    );
    assert_eq!(
        store.snooze(unknown, now).unwrap_err(),
        StoreError::NotFound(unknown)
    );
    assert_eq!(store.skip(unknown).unwrap_err(), StoreError::NotFound(unknown));
}

#[test]
fn clear_done_today_keeps_other_days_and_open_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let today = store.add(TaskDraft::new("done today"), now).unwrap();
    let yesterday = store.add(TaskDraft::new("done yesterday"), now).unwrap();
    let open = store.add(TaskDraft::new("still open"), now).unwrap();

    store.complete(today, now).unwrap();
    store.complete(yesterday, now - Duration::days(1)).unwrap();

    let removed = store.clear_done_today(now);
    assert_eq!(removed, 1);

    assert!(store.task(today).is_none());
    assert_eq!(store.task(yesterday).unwrap().status, TaskStatus::Done);
    assert_eq!(store.task(open).unwrap().status, TaskStatus::Active);

    // Nothing left for today; a second pass is a no-op.
    assert_eq!(store.clear_done_today(now), 0);
}

#[test]
fn focus_pointer_walks_the_queue_and_runs_out() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let a = store.add(TaskDraft::new("a"), now).unwrap();
    let b = store.add(TaskDraft::new("b"), now).unwrap();

    assert_eq!(store.focus_index(), 0);
    assert_eq!(store.current_focus(now).unwrap().id, a);

    store.set_focus_index(1);
    assert_eq!(store.current_focus(now).unwrap().id, b);

    // Past the end of the queue means nothing left to show.
    store.set_focus_index(2);
    assert!(store.current_focus(now).is_none());
}

#[test]
fn subscribers_observe_mutations_until_unsubscribed() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let tasks_events = Arc::new(AtomicUsize::new(0));
    let settings_events = Arc::new(AtomicUsize::new(0));
    let focus_events = Arc::new(AtomicUsize::new(0));

    let (t, s, f) = (
        Arc::clone(&tasks_events),
        Arc::clone(&settings_events),
        Arc::clone(&focus_events),
    );
    let subscription = store.subscribe(move |event| match event {
        StoreEvent::TasksChanged => {
            t.fetch_add(1, AtomicOrdering::SeqCst);
        }
        StoreEvent::SettingsChanged => {
            s.fetch_add(1, AtomicOrdering::SeqCst);
        }
        StoreEvent::FocusMoved => {
            f.fetch_add(1, AtomicOrdering::SeqCst);
        }
    });

    let id = store.add(TaskDraft::new("observed"), now).unwrap();
    store.skip(id).unwrap();
    store.complete(id, now).unwrap();
    store.update_settings(Settings::default());
    store.set_focus_index(0);

    assert_eq!(tasks_events.load(AtomicOrdering::SeqCst), 3);
    assert_eq!(settings_events.load(AtomicOrdering::SeqCst), 1);
    assert_eq!(focus_events.load(AtomicOrdering::SeqCst), 1);

    // Failed mutations notify nobody.
    let _ = store.add(TaskDraft::new(""), now);
    assert_eq!(tasks_events.load(AtomicOrdering::SeqCst), 3);

    store.unsubscribe(subscription);
    store.add(TaskDraft::new("unobserved"), now).unwrap();
    assert_eq!(tasks_events.load(AtomicOrdering::SeqCst), 3);
}

#[test]
fn focus_queue_orders_by_priority_and_shifts_on_complete() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let normal = store.add(draft("normal", Priority::Normal), now).unwrap();
    let pinned = store.add(draft("pinned", Priority::Pinned), now).unwrap();
    let high = store.add(draft("high", Priority::High), now).unwrap();

    let queue: Vec<TaskId> = store.today_queue(now).iter().map(|task| task.id).collect();
    assert_eq!(queue, [pinned, high, normal]);

    store.complete(pinned, now).unwrap();

    let queue: Vec<TaskId> = store.today_queue(now).iter().map(|task| task.id).collect();
    assert_eq!(queue, [high, normal]);
    assert_eq!(store.current_focus(now).unwrap().id, high);
}

#[test]
fn snoozed_task_returns_after_the_clock_passes() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);
    let now = Utc::now();

    let id = store.add(TaskDraft::new("snoozed"), now).unwrap();
    store.snooze(id, now + Duration::hours(1)).unwrap();

    assert!(!store.today_queue(now).iter().any(|task| task.id == id));

    let later = now + Duration::hours(1);
    assert!(store.today_queue(later).iter().any(|task| task.id == id));
}

#[test]
fn update_settings_replaces_and_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_empty_store(&dir);

    let custom = Settings {
        capacity_minutes: 240,
        skip_limit: 9,
        confirm_snooze: false,
    };
    store.update_settings(custom);
    assert_eq!(*store.settings(), custom);
}
