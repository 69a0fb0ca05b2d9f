//! Session state for one classroom interaction unit.
//!
//! Replaces ambient global state with an explicit object passed to every
//! component: created at session start, carried through ingestion, grounding
//! and turn processing, discarded at process end.

use crate::error::{AulaError, Result};
use crate::index::VectorIndex;
use crate::store::TurnRecord;
use uuid::Uuid;

/// Configuration collected at session setup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Course code.
    pub nrc: String,
    /// Group identifier.
    pub grupo: String,
    /// Topic the group is working on.
    pub tema: String,
    /// Participant names, order preserved.
    pub estudiantes: Vec<String>,
    /// Informed consent for research logging.
    pub consentimiento: bool,
}

impl SessionConfig {
    /// Check that every required field is present.
    pub fn validate(&self) -> Result<()> {
        if self.nrc.trim().is_empty()
            || self.grupo.trim().is_empty()
            || self.tema.trim().is_empty()
        {
            return Err(AulaError::Config(
                "Completa todos los campos obligatorios.".to_string(),
            ));
        }
        if self.estudiantes.iter().all(|e| e.trim().is_empty()) {
            return Err(AulaError::Config(
                "La lista de integrantes no puede estar vacía.".to_string(),
            ));
        }
        if !self.consentimiento {
            return Err(AulaError::Config(
                "Se requiere el consentimiento del grupo para el registro.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Role of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the in-memory chat history.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    /// Which participant wrote the message (user entries only).
    pub author: Option<String>,
    pub text: String,
    /// Store-assigned turn id (assistant entries only, when the insert
    /// succeeded). Required to attach feedback later.
    pub turn_id: Option<i64>,
}

/// One classroom interaction unit.
///
/// The session owns the in-memory history, the log buffer, the operator
/// notices and the optional vector index for the lifetime of the process.
pub struct Session {
    session_id: String,
    config: Option<SessionConfig>,
    /// Names of the ingested PDF files, if any.
    pub ingested_files: Vec<String>,
    /// Vector index over the ingested material; built at most once.
    pub index: Option<VectorIndex>,
    /// Chat history, alternating user/assistant.
    pub history: Vec<ChatMessage>,
    /// Local copy of every logged turn, for CSV export.
    pub log: Vec<TurnRecord>,
    /// Operator-facing notices (logging failures and the like). Never shown
    /// in the student-facing chat.
    pub notices: Vec<String>,
    closed: bool,
}

impl Session {
    /// Create an unconfigured session with a fresh identifier.
    pub fn new() -> Self {
        let session_id = Uuid::new_v4().to_string()[..8].to_string();
        Self {
            session_id,
            config: None,
            ingested_files: Vec::new(),
            index: None,
            history: Vec::new(),
            log: Vec::new(),
            notices: Vec::new(),
            closed: false,
        }
    }

    /// Opaque session identifier, immutable for the process lifetime.
    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// Apply a validated configuration. Only the configuration step may call
    /// this, and only once.
    pub fn apply_config(&mut self, config: SessionConfig) -> Result<()> {
        if self.config.is_some() {
            return Err(AulaError::InvalidInput(
                "La sesión ya está configurada.".to_string(),
            ));
        }
        config.validate()?;
        self.config = Some(config);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// The applied configuration; errors when setup has not completed.
    pub fn config(&self) -> Result<&SessionConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| AulaError::InvalidInput("La sesión no está configurada.".to_string()))
    }

    /// Whether `name` is one of the session's participants.
    pub fn has_participant(&self, name: &str) -> bool {
        self.config
            .as_ref()
            .map(|c| c.estudiantes.iter().any(|e| e == name))
            .unwrap_or(false)
    }

    /// Find the history entry carrying a given persisted turn id.
    pub fn message_by_turn_id(&self, turn_id: i64) -> Option<&ChatMessage> {
        self.history.iter().find(|m| m.turn_id == Some(turn_id))
    }

    /// Record an operator-facing notice.
    pub fn push_notice(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }

    /// Mark the session as explicitly closed. Idempotent.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
