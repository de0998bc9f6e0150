//! User settings.
//!
//! # Responsibility
//! - Hold process-wide preferences consumed by the presentation layer.
//!
//! # Invariants
//! - Settings are advisory: nothing here is enforced by the queue engine.

use serde::{Deserialize, Serialize};

/// Process-wide user preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Informational daily budget in minutes, shown against the planned
    /// total of today's queue.
    pub capacity_minutes: u32,
    /// Skip count at which the UI should flag a task. Advisory only.
    pub skip_limit: u32,
    /// Whether the UI asks before snoozing.
    pub confirm_snooze: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capacity_minutes: 90,
            skip_limit: 3,
            confirm_snooze: true,
        }
    }
}

impl Settings {
    /// Whether a task with the given skip count should be flagged to the
    /// user. The engine never acts on this.
    pub fn skip_flagged(&self, skips_count: u32) -> bool {
        skips_count >= self.skip_limit
    }
}
