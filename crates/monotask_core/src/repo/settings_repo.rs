//! Settings repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the single user-settings row.
//!
//! # Invariants
//! - The table holds at most one row (`id = 1`); `save` upserts it.

use rusqlite::{params, Connection};

use crate::model::settings::Settings;
use crate::repo::task_repo::{ensure_connection_ready, RepoResult};

/// Durable-store surface for user settings.
pub trait SettingsRepository {
    /// Returns the persisted settings, or `None` when never saved.
    fn load(&self) -> RepoResult<Option<Settings>>;
    fn save(&self, settings: &Settings) -> RepoResult<()>;
}

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    /// Constructs a repository from a migrated, ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "settings")?;
        Ok(Self { conn })
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load(&self) -> RepoResult<Option<Settings>> {
        let mut stmt = self.conn.prepare(
            "SELECT capacity_minutes, skip_limit, confirm_snooze
             FROM settings WHERE id = 1;",
        )?;

        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(Settings {
                capacity_minutes: row.get(0)?,
                skip_limit: row.get(1)?,
                confirm_snooze: row.get::<_, i64>(2)? != 0,
            }));
        }

        Ok(None)
    }

    fn save(&self, settings: &Settings) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO settings (id, capacity_minutes, skip_limit, confirm_snooze)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET
                capacity_minutes = excluded.capacity_minutes,
                skip_limit = excluded.skip_limit,
                confirm_snooze = excluded.confirm_snooze;",
            params![
                settings.capacity_minutes,
                settings.skip_limit,
                settings.confirm_snooze as i64,
            ],
        )?;

        Ok(())
    }
}
