//! Change notification for presentation views.
//!
//! # Responsibility
//! - Let every view observe the same authoritative collection and re-render
//!   on change, without views reaching into store internals.
//!
//! # Invariants
//! - Callbacks run synchronously inside the mutation call, after state is
//!   updated and before the call returns.

/// What changed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// The task collection changed (add/update/remove/complete/snooze/skip/
    /// reorder/clear).
    TasksChanged,
    /// User settings changed.
    SettingsChanged,
    /// The focus pointer moved.
    FocusMoved,
}

/// Token for removing a subscription.
pub type SubscriberId = u64;

type Callback = Box<dyn Fn(StoreEvent) + Send>;

/// Registry of view callbacks.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: SubscriberId,
    entries: Vec<(SubscriberId, Callback)>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self, callback: Callback) -> SubscriberId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Removes a subscription; unknown ids are ignored.
    pub(crate) fn unsubscribe(&mut self, id: SubscriberId) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    pub(crate) fn notify(&self, event: StoreEvent) {
        for (_, callback) in &self.entries {
            callback(event);
        }
    }
}
