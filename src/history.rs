use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result, Row};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::progress;
use crate::session::WorkoutSession;

/// One finished workout, as recorded by the completion callback
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSession {
    pub program_id: Option<String>,
    pub day_number: Option<u32>,
    pub week_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub exercise_count: u32,
    pub completed_sets: u64,
    pub total_sets: u64,
}

impl CompletedSession {
    pub fn from_session(session: &WorkoutSession, finished_at: DateTime<Utc>) -> Self {
        Self {
            program_id: session.source.program_id.clone(),
            day_number: session.source.day_number,
            week_id: session.source.week_id.clone(),
            started_at: session.start_time,
            finished_at,
            exercise_count: session.exercises.len() as u32,
            completed_sets: progress::completed_sets_count(session),
            total_sets: progress::total_sets(session),
        }
    }

    pub fn duration_secs(&self) -> u64 {
        (self.finished_at - self.started_at).num_seconds().max(0) as u64
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            program_id: row.get("program_id")?,
            day_number: row.get("day_number")?,
            week_id: row.get("week_id")?,
            started_at: parse_timestamp(row, "started_at")?,
            finished_at: parse_timestamp(row, "finished_at")?,
            exercise_count: row.get("exercise_count")?,
            completed_sets: row.get::<_, i64>("completed_sets")?.max(0) as u64,
            total_sets: row.get::<_, i64>("total_sets")?.max(0) as u64,
        })
    }
}

fn parse_timestamp(row: &Row, column: &str) -> Result<DateTime<Utc>> {
    let text: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

/// Log of finished sessions
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open the history database under the state directory
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::history_db_path().unwrap_or_else(|| PathBuf::from("spotter_history.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {e}")),
                )
            })?;
        }
        Self::init(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS completed_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                program_id TEXT,
                day_number INTEGER,
                week_id TEXT,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                exercise_count INTEGER NOT NULL,
                completed_sets INTEGER NOT NULL,
                total_sets INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_completed_sessions_day ON completed_sessions(program_id, day_number)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    pub fn record(&self, entry: &CompletedSession) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO completed_sessions
            (program_id, day_number, week_id, started_at, finished_at, exercise_count, completed_sets, total_sets)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                entry.program_id,
                entry.day_number,
                entry.week_id,
                entry.started_at.to_rfc3339(),
                entry.finished_at.to_rfc3339(),
                entry.exercise_count,
                entry.completed_sets as i64,
                entry.total_sets as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent first
    pub fn recent(&self, limit: usize) -> Result<Vec<CompletedSession>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT program_id, day_number, week_id, started_at, finished_at,
                   exercise_count, completed_sets, total_sets
            FROM completed_sessions
            ORDER BY finished_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| CompletedSession::from_row(row))?;
        rows.collect()
    }

    /// Day numbers of `program_id` finished at least once, ascending
    pub fn completed_days(&self, program_id: &str) -> Result<Vec<u32>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT day_number FROM completed_sessions
            WHERE program_id = ?1 AND day_number IS NOT NULL
            ORDER BY day_number
            "#,
        )?;
        let rows = stmt.query_map(params![program_id], |row| row.get::<_, u32>(0))?;
        rows.collect()
    }

    pub fn is_day_complete(&self, program_id: &str, day_number: u32) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM completed_sessions WHERE program_id = ?1 AND day_number = ?2",
            params![program_id, day_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM completed_sessions", [])?;
        Ok(())
    }
}
