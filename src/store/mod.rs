//! Turn persistence for research logging.
//!
//! Provides a trait-based interface over the external store. The persisted
//! row shape (Spanish field names) is a wire contract shared with the
//! research database; do not rename fields.

mod memory;
mod rest;
mod sqlite;

pub use memory::MemoryTurnStore;
pub use rest::RestTurnStore;
pub use sqlite::SqliteTurnStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Binary feedback rating.
///
/// Canonical wire mapping: `Up` is `"up"`, `Down` is `"down"`. Index-based
/// conventions from earlier tooling are not used anywhere in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Up => "up",
            Rating::Down => "down",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub session_id: String,
    pub nrc: String,
    pub grupo: String,
    pub tema: String,
    pub estudiante: String,
    pub mensaje_usuario: String,
    pub respuesta_ia: String,
    pub usa_rag: bool,
    pub timestamp: DateTime<Utc>,
    /// Store-assigned identifier, read back after insert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Rating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_text: Option<String>,
}

/// Trait for turn store backends.
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Insert a turn and return the store-assigned identifier.
    async fn insert_turn(&self, record: &TurnRecord) -> Result<i64>;

    /// Overwrite the rating of a persisted turn.
    async fn set_rating(&self, id: i64, rating: Rating) -> Result<()>;

    /// Overwrite the feedback comment of a persisted turn.
    async fn set_comment(&self, id: i64, text: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_wire_mapping() {
        assert_eq!(serde_json::to_string(&Rating::Up).unwrap(), "\"up\"");
        assert_eq!(serde_json::to_string(&Rating::Down).unwrap(), "\"down\"");
    }

    #[test]
    fn test_record_serialization_omits_absent_fields() {
        let record = TurnRecord {
            session_id: "abcd1234".to_string(),
            nrc: "EST101".to_string(),
            grupo: "G1".to_string(),
            tema: "Distribución Normal".to_string(),
            estudiante: "Ana".to_string(),
            mensaje_usuario: "¿Qué es la media?".to_string(),
            respuesta_ia: "La media es...".to_string(),
            usa_rag: false,
            timestamp: Utc::now(),
            id: None,
            feedback: None,
            feedback_text: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("feedback").is_none());
        assert_eq!(json["usa_rag"], serde_json::json!(false));
    }
}
