//! SQLite turn store implementation.
//!
//! Local fallback backend so a classroom session can run and keep its
//! research log without network credentials.

use super::{Rating, TurnRecord, TurnStore};
use crate::error::{AulaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS interacciones_investigacion (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        nrc TEXT NOT NULL,
        grupo TEXT NOT NULL,
        tema TEXT NOT NULL,
        estudiante TEXT NOT NULL,
        mensaje_usuario TEXT NOT NULL,
        respuesta_ia TEXT NOT NULL,
        usa_rag INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        feedback TEXT,
        feedback_text TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_interacciones_session
        ON interacciones_investigacion(session_id);
"#;

/// SQLite-backed turn store.
pub struct SqliteTurnStore {
    conn: Mutex<Connection>,
}

impl SqliteTurnStore {
    /// Open (or create) a turn store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened SQLite turn store at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory turn store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fetch one row by id.
    pub fn get(&self, id: i64) -> Result<Option<TurnRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT session_id, nrc, grupo, tema, estudiante, mensaje_usuario,
                    respuesta_ia, usa_rag, timestamp, id, feedback, feedback_text
             FROM interacciones_investigacion WHERE id = ?1",
        )?;

        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => {
                let timestamp: String = row.get(8)?;
                let timestamp = timestamp
                    .parse::<DateTime<Utc>>()
                    .map_err(|e| AulaError::Store(format!("Bad timestamp in store: {}", e)))?;
                let feedback: Option<String> = row.get(10)?;
                let feedback = match feedback.as_deref() {
                    Some("up") => Some(Rating::Up),
                    Some("down") => Some(Rating::Down),
                    Some(other) => {
                        return Err(AulaError::Store(format!("Bad rating in store: {}", other)))
                    }
                    None => None,
                };

                Ok(Some(TurnRecord {
                    session_id: row.get(0)?,
                    nrc: row.get(1)?,
                    grupo: row.get(2)?,
                    tema: row.get(3)?,
                    estudiante: row.get(4)?,
                    mensaje_usuario: row.get(5)?,
                    respuesta_ia: row.get(6)?,
                    usa_rag: row.get::<_, i64>(7)? != 0,
                    timestamp,
                    id: Some(row.get(9)?),
                    feedback,
                    feedback_text: row.get(11)?,
                }))
            }
            None => Ok(None),
        }
    }

    fn affect_one(&self, affected: usize, id: i64) -> Result<()> {
        if affected == 0 {
            return Err(AulaError::Store(format!("No turn with id {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TurnStore for SqliteTurnStore {
    async fn insert_turn(&self, record: &TurnRecord) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO interacciones_investigacion
                (session_id, nrc, grupo, tema, estudiante, mensaje_usuario,
                 respuesta_ia, usa_rag, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.session_id,
                record.nrc,
                record.grupo,
                record.tema,
                record.estudiante,
                record.mensaje_usuario,
                record.respuesta_ia,
                record.usa_rag as i64,
                record.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn set_rating(&self, id: i64, rating: Rating) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE interacciones_investigacion SET feedback = ?1 WHERE id = ?2",
            params![rating.as_str(), id],
        )?;
        self.affect_one(affected, id)
    }

    async fn set_comment(&self, id: i64, text: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE interacciones_investigacion SET feedback_text = ?1 WHERE id = ?2",
            params![text, id],
        )?;
        self.affect_one(affected, id)
    }
}
