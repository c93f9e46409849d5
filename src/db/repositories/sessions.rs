use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{
        parse_datetime, parse_mode, parse_optional_datetime, parse_status, to_i64, to_u32, to_u64,
    },
    models::{Session, SessionStatus},
};

fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: String = row.get("started_at")?;
    let stopped_at: Option<String> = row.get("stopped_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let status: String = row.get("status")?;
    let mode: String = row.get("mode")?;
    let target_ms: i64 = row.get("target_ms")?;
    let duration_ms: i64 = row.get("duration_ms")?;
    let distractions: i64 = row.get("distractions")?;

    Ok(Session {
        id: row.get("id")?,
        goal: row.get("goal")?,
        mode: parse_mode(&mode)?,
        started_at: parse_datetime(&started_at, "started_at")?,
        stopped_at: parse_optional_datetime(stopped_at, "stopped_at")?,
        status: parse_status(&status)?,
        target_ms: to_u64(target_ms, "target_ms")?,
        duration_ms: to_u64(duration_ms, "duration_ms")?,
        distractions: to_u32(distractions, "distractions")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, goal, mode, started_at, stopped_at, status, target_ms, duration_ms, distractions, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.goal,
                    record.mode.as_str(),
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    to_i64(record.target_ms)?,
                    to_i64(record.duration_ms)?,
                    i64::from(record.distractions),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Close out a session record: status, stop time and computed duration.
    pub async fn finalize_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        stopped_at: DateTime<Utc>,
        duration_ms: u64,
        distractions: u32,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     stopped_at = ?2,
                     duration_ms = ?3,
                     distractions = ?4,
                     updated_at = ?5
                 WHERE id = ?6",
                params![
                    status.as_str(),
                    stopped_at.to_rfc3339(),
                    to_i64(duration_ms)?,
                    i64::from(distractions),
                    stopped_at.to_rfc3339(),
                    session_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Bump the stored distraction counter and return the new value.
    pub async fn increment_session_distractions(
        &self,
        session_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<u32> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET distractions = distractions + 1,
                     updated_at = ?1
                 WHERE id = ?2",
                params![updated_at.to_rfc3339(), session_id],
            )?;
            let count: i64 = conn.query_row(
                "SELECT distractions FROM sessions WHERE id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            to_u32(count, "distractions")
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT * FROM sessions WHERE id = ?1",
                    params![session_id],
                    |row| {
                        Ok(row_to_session(row))
                    },
                )
                .optional()?;
            row.transpose()
        })
        .await
    }

    /// Finalized sessions, newest first. Feeds the stats view.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM sessions
                 WHERE status IN ('Completed', 'Interrupted')
                 ORDER BY started_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    pub async fn get_incomplete_sessions(&self) -> Result<Vec<Session>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM sessions
                 WHERE status = 'Running'
                 ORDER BY started_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    /// Crash recovery: a session left Running by a previous process gets
    /// marked Interrupted with its duration clamped to what we can prove.
    pub async fn mark_session_interrupted(
        &self,
        session_id: &str,
        stopped_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = 'Interrupted',
                     stopped_at = COALESCE(stopped_at, ?1),
                     duration_ms = CAST(MAX(0, (julianday(?1) - julianday(started_at)) * 86400000) AS INTEGER),
                     updated_at = ?1
                 WHERE id = ?2",
                params![stopped_at.to_rfc3339(), session_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tempfile::TempDir;
    use uuid::Uuid;

    use crate::db::models::{Session, SessionStatus, TrackingMode};
    use crate::db::Database;

    fn open_test_db() -> (Database, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("open db");
        (db, dir)
    }

    fn make_session(goal: &str) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            goal: goal.to_string(),
            mode: TrackingMode::Broad,
            started_at: now,
            stopped_at: None,
            status: SessionStatus::Running,
            target_ms: 25 * 60 * 1000,
            duration_ms: 0,
            distractions: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_roundtrip() {
        let (db, _dir) = open_test_db();
        let session = make_session("Learn Go");
        db.insert_session(&session).await.expect("insert");

        let fetched = db
            .get_session(&session.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.goal, "Learn Go");
        assert_eq!(fetched.mode, TrackingMode::Broad);
        assert_eq!(fetched.status, SessionStatus::Running);
        assert_eq!(fetched.distractions, 0);
    }

    #[tokio::test]
    async fn finalize_moves_session_into_history() {
        let (db, _dir) = open_test_db();
        let session = make_session("Write thesis");
        db.insert_session(&session).await.expect("insert");

        assert!(db.list_sessions().await.expect("list").is_empty());

        let stopped_at = session.started_at + Duration::minutes(25);
        db.finalize_session(&session.id, SessionStatus::Completed, stopped_at, 1_500_000, 3)
            .await
            .expect("finalize");

        let history = db.list_sessions().await.expect("list");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SessionStatus::Completed);
        assert_eq!(history[0].duration_ms, 1_500_000);
        assert_eq!(history[0].distractions, 3);
    }

    #[tokio::test]
    async fn increment_returns_running_count() {
        let (db, _dir) = open_test_db();
        let session = make_session("Read papers");
        db.insert_session(&session).await.expect("insert");

        let now = Utc::now();
        assert_eq!(
            db.increment_session_distractions(&session.id, now)
                .await
                .expect("first"),
            1
        );
        assert_eq!(
            db.increment_session_distractions(&session.id, now)
                .await
                .expect("second"),
            2
        );
    }

    #[tokio::test]
    async fn interrupted_recovery_closes_running_sessions() {
        let (db, _dir) = open_test_db();
        let session = make_session("Study Rust");
        db.insert_session(&session).await.expect("insert");

        let incomplete = db.get_incomplete_sessions().await.expect("incomplete");
        assert_eq!(incomplete.len(), 1);

        db.mark_session_interrupted(&session.id, Utc::now())
            .await
            .expect("mark interrupted");

        assert!(db
            .get_incomplete_sessions()
            .await
            .expect("incomplete")
            .is_empty());
        let fetched = db
            .get_session(&session.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.status, SessionStatus::Interrupted);
        assert!(fetched.stopped_at.is_some());
    }
}
