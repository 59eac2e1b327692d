use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{from_json, parse_datetime, parse_status, to_json},
    models::Session,
};

fn row_to_session(row: &Row) -> Result<Session> {
    let status: String = row.get("status")?;
    let models_json: String = row.get("models_json")?;
    let session_start_time: String = row.get("session_start_time")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Session {
        session_id: row.get("session_id")?,
        device_id: row.get("device_id")?,
        status: parse_status(&status)?,
        models: from_json(&models_json, "models_json")?,
        session_start_time: parse_datetime(&session_start_time, "session_start_time")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (session_id, device_id, status, models_json, session_start_time, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.session_id,
                    record.device_id,
                    record.status.as_str(),
                    to_json(&record.models, "models")?,
                    record.session_start_time.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, device_id, status, models_json, session_start_time, created_at, updated_at
                 FROM sessions
                 WHERE session_id = ?1",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    /// Sessions captured inside `[start, end_exclusive)`, newest first.
    pub async fn sessions_in_range(
        &self,
        start: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, device_id, status, models_json, session_start_time, created_at, updated_at
                 FROM sessions
                 WHERE session_start_time >= ?1 AND session_start_time < ?2
                 ORDER BY session_start_time DESC",
            )?;

            let mut rows = stmt.query(params![start.to_rfc3339(), end_exclusive.to_rfc3339()])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    /// Sessions captured on one device inside `[start, end_exclusive)`.
    pub async fn count_sessions(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    ) -> Result<u64> {
        let device_id = device_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sessions
                 WHERE device_id = ?1 AND updated_at >= ?2 AND updated_at < ?3",
                params![device_id, start.to_rfc3339(), end_exclusive.to_rfc3339()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }
}
