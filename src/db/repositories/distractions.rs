use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::Distraction,
};

fn row_to_distraction(row: &Row) -> Result<Distraction> {
    let timestamp: String = row.get("timestamp")?;
    Ok(Distraction {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        score: row.get("score")?,
        threshold: row.get("threshold")?,
        summary: row.get("summary")?,
    })
}

impl Database {
    pub async fn insert_distraction(&self, distraction: &Distraction) -> Result<()> {
        let record = distraction.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO distractions (id, session_id, timestamp, score, threshold, summary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.session_id,
                    record.timestamp.to_rfc3339(),
                    record.score,
                    record.threshold,
                    record.summary,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_distractions_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<Distraction>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM distractions
                 WHERE session_id = ?1
                 ORDER BY timestamp ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut distractions = Vec::new();
            while let Some(row) = rows.next()? {
                distractions.push(row_to_distraction(row)?);
            }
            Ok(distractions)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    use crate::db::models::{Distraction, Session, SessionStatus, TrackingMode};
    use crate::db::Database;

    fn open_test_db() -> (Database, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("open db");
        (db, dir)
    }

    async fn seed_session(db: &Database) -> String {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            goal: "Learn Rust".to_string(),
            mode: TrackingMode::Specific,
            started_at: now,
            stopped_at: None,
            status: SessionStatus::Running,
            target_ms: 60_000,
            duration_ms: 0,
            distractions: 0,
            created_at: now,
            updated_at: now,
        };
        db.insert_session(&session).await.expect("seed session");
        session.id
    }

    fn make_distraction(session_id: &str, score: f64) -> Distraction {
        Distraction {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            score,
            threshold: 0.5,
            summary: Some("cat videos".to_string()),
        }
    }

    #[tokio::test]
    async fn distractions_are_listed_in_order() {
        let (db, _dir) = open_test_db();
        let session_id = seed_session(&db).await;

        db.insert_distraction(&make_distraction(&session_id, 0.2))
            .await
            .expect("first");
        db.insert_distraction(&make_distraction(&session_id, 0.3))
            .await
            .expect("second");

        let listed = db
            .get_distractions_for_session(&session_id)
            .await
            .expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].score, 0.2);
        assert_eq!(listed[1].score, 0.3);
    }

    #[tokio::test]
    async fn deleting_a_session_cascades() {
        let (db, _dir) = open_test_db();
        let session_id = seed_session(&db).await;

        db.insert_distraction(&make_distraction(&session_id, 0.1))
            .await
            .expect("insert");
        db.delete_session(&session_id).await.expect("delete");

        let listed = db
            .get_distractions_for_session(&session_id)
            .await
            .expect("list");
        assert!(listed.is_empty());
    }
}
