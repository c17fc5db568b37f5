//! SQLite-backed session store and statistics.
//!
//! The clock never touches this module; it is the statistics
//! collaborator's backing store, plus a small key-value table the CLI
//! uses to persist the serialized clock between invocations.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::DatabaseError;
use crate::timer::Mode;

/// One completed (or abandoned) interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub mode: String,
    pub duration_min: u64,
    pub completed: bool,
    pub completed_at: DateTime<Utc>,
}

/// Aggregate counters over the session table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_focus_min: u64,
    pub total_break_min: u64,
    pub sessions_today: u64,
    pub focus_min_today: u64,
}

/// Consecutive-day focus streaks.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// SQLite database at `~/.config/focusloop/focusloop.db`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (and migrate) the database, creating it if absent.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()?.join("focusloop.db");
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database for tests.
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::QueryFailed)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                mode         TEXT NOT NULL,
                duration_min INTEGER NOT NULL,
                completed    INTEGER NOT NULL DEFAULT 1,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_mode ON sessions(mode);",
        )?;
        Ok(())
    }

    /// Record an interval. Returns the new row id.
    pub fn record_session(
        &self,
        mode: Mode,
        duration_min: u64,
        completed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (mode, duration_min, completed, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                mode.as_str(),
                duration_min,
                completed,
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn stats_all(&self) -> Result<Stats, DatabaseError> {
        self.stats_since(None)
    }

    pub fn stats_today(&self) -> Result<Stats, DatabaseError> {
        let midnight = format!("{}T00:00:00+00:00", Utc::now().format("%Y-%m-%d"));
        self.stats_since(Some(midnight))
    }

    fn stats_since(&self, floor: Option<String>) -> Result<Stats, DatabaseError> {
        let midnight = format!("{}T00:00:00+00:00", Utc::now().format("%Y-%m-%d"));
        let floor = floor.unwrap_or_default();
        let mut stmt = self.conn.prepare(
            "SELECT mode, COUNT(*), COALESCE(SUM(duration_min), 0),
                    COALESCE(SUM(CASE WHEN completed_at >= ?2 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN completed_at >= ?2 THEN duration_min ELSE 0 END), 0)
             FROM sessions
             WHERE completed = 1 AND completed_at >= ?1
             GROUP BY mode",
        )?;

        let mut stats = Stats::default();
        let rows = stmt.query_map(params![floor, midnight], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u64>(4)?,
            ))
        })?;

        for row in rows {
            let (mode, count, minutes, today_count, today_minutes) = row?;
            stats.total_sessions += count;
            if mode == "focus" {
                stats.total_focus_min += minutes;
                stats.sessions_today += today_count;
                stats.focus_min_today += today_minutes;
            } else {
                stats.total_break_min += minutes;
            }
        }
        Ok(stats)
    }

    /// Current and longest streak of consecutive days with at least one
    /// completed focus session.
    pub fn streaks(&self) -> Result<Streaks, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT substr(completed_at, 1, 10)
             FROM sessions
             WHERE mode = 'focus' AND completed = 1
             ORDER BY 1",
        )?;
        let days = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let days: Vec<NaiveDate> = days
            .iter()
            .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .collect();
        Ok(streaks_from_days(&days, Utc::now().date_naive()))
    }

    /// Most recent sessions, newest first.
    pub fn recent_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mode, duration_min, completed, completed_at
             FROM sessions
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let raw: String = row.get(4)?;
            let completed_at = DateTime::parse_from_rfc3339(&raw)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
            Ok(SessionRecord {
                id: row.get(0)?,
                mode: row.get(1)?,
                duration_min: row.get(2)?,
                completed: row.get(3)?,
                completed_at,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Drop all recorded sessions.
    pub fn reset_sessions(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM sessions", [])?)
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        match stmt.query_row(params![key], |row| row.get::<_, String>(0)) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Streak computation over sorted, de-duplicated focus days.
///
/// The current streak counts the run of consecutive days ending at the
/// most recent focus day; it is zero once that day is older than
/// yesterday (the streak is broken even though no new session recorded
/// the break).
fn streaks_from_days(days: &[NaiveDate], today: NaiveDate) -> Streaks {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for &day in days {
        run = match prev {
            Some(p) if (day - p).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }
    let current = match prev {
        Some(last) if (today - last).num_days() <= 1 => run,
        _ => 0,
    };
    Streaks { current, longest }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn record_and_aggregate() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_session(Mode::Focus, 25, true, now).unwrap();
        db.record_session(Mode::ShortBreak, 5, true, now).unwrap();
        db.record_session(Mode::Focus, 25, false, now).unwrap();

        let stats = db.stats_all().unwrap();
        // The abandoned session is excluded from the aggregates.
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_focus_min, 25);
        assert_eq!(stats.total_break_min, 5);
        assert_eq!(stats.sessions_today, 1);
        assert_eq!(stats.focus_min_today, 25);
    }

    #[test]
    fn stats_today_excludes_older_sessions() {
        let db = Database::open_memory().unwrap();
        let old = Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap();
        db.record_session(Mode::Focus, 25, true, old).unwrap();
        db.record_session(Mode::Focus, 25, true, Utc::now()).unwrap();

        let today = db.stats_today().unwrap();
        assert_eq!(today.total_sessions, 1);
        let all = db.stats_all().unwrap();
        assert_eq!(all.total_sessions, 2);
    }

    #[test]
    fn recent_sessions_newest_first() {
        let db = Database::open_memory().unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        db.record_session(Mode::Focus, 25, true, t1).unwrap();
        db.record_session(Mode::ShortBreak, 5, true, t2).unwrap();

        let recent = db.recent_sessions(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].mode, "short_break");
        assert_eq!(recent[1].mode, "focus");
    }

    #[test]
    fn reset_clears_sessions_but_not_kv() {
        let db = Database::open_memory().unwrap();
        db.record_session(Mode::Focus, 25, true, Utc::now()).unwrap();
        db.kv_set("session_clock", "{}").unwrap();
        assert_eq!(db.reset_sessions().unwrap(), 1);
        assert_eq!(db.stats_all().unwrap().total_sessions, 0);
        assert!(db.kv_get("session_clock").unwrap().is_some());
    }

    #[test]
    fn kv_store_round_trip() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("clock").unwrap().is_none());
        db.kv_set("clock", "state").unwrap();
        assert_eq!(db.kv_get("clock").unwrap().as_deref(), Some("state"));
        db.kv_set("clock", "state2").unwrap();
        assert_eq!(db.kv_get("clock").unwrap().as_deref(), Some("state2"));
    }

    #[test]
    fn streaks_consecutive_days() {
        let days = [day(2024, 5, 1), day(2024, 5, 2), day(2024, 5, 3)];
        let s = streaks_from_days(&days, day(2024, 5, 3));
        assert_eq!(s.current, 3);
        assert_eq!(s.longest, 3);
    }

    #[test]
    fn streaks_gap_resets_current_but_keeps_longest() {
        let days = [
            day(2024, 5, 1),
            day(2024, 5, 2),
            day(2024, 5, 3),
            day(2024, 5, 10),
        ];
        let s = streaks_from_days(&days, day(2024, 5, 10));
        assert_eq!(s.current, 1);
        assert_eq!(s.longest, 3);
    }

    #[test]
    fn streak_survives_until_end_of_next_day() {
        let days = [day(2024, 5, 1), day(2024, 5, 2)];
        // Yesterday was the last focus day: the streak still stands.
        assert_eq!(streaks_from_days(&days, day(2024, 5, 3)).current, 2);
        // Two days without a session: broken.
        assert_eq!(streaks_from_days(&days, day(2024, 5, 4)).current, 0);
    }

    #[test]
    fn streaks_empty_history() {
        let s = streaks_from_days(&[], day(2024, 5, 1));
        assert_eq!(s.current, 0);
        assert_eq!(s.longest, 0);
    }
}
