//! Explicit event handlers for every user action.
//!
//! Each handler performs one state transition on the session and returns a
//! minimal render instruction, instead of recomputing a whole UI pass. Setup
//! and input errors surface as `Err` and block the action without partial
//! effects; generation, persistence and feedback failures are folded into the
//! success path per the availability policy.

use crate::config::{IngestSettings, Prompts};
use crate::chat::ChatModel;
use crate::embedding::Embedder;
use crate::error::{AulaError, Result};
use crate::export;
use crate::feedback::{FeedbackOutcome, FeedbackRecorder};
use crate::index::VectorIndex;
use crate::ingest::{ingest_pdfs, UploadedFile};
use crate::session::{Session, SessionConfig};
use crate::store::{Rating, TurnStore};
use crate::turn::TurnProcessor;
use std::sync::Arc;
use tracing::{info, instrument};

/// What the caller should re-render after a handled action.
#[derive(Debug)]
pub enum RenderAction {
    /// Configuration accepted; the chat can start.
    SessionReady { indexed_chunks: usize },
    /// One new exchange to append to the chat view.
    Exchange {
        reply: String,
        turn_id: Option<i64>,
        used_grounding: bool,
    },
    /// Show the rating confirmation once.
    RatingConfirmed(Rating),
    /// Show the comment confirmation once.
    CommentConfirmed,
    /// Nothing visible changed.
    Nothing,
    /// A CSV snapshot ready for download.
    CsvReady { filename: String, bytes: Vec<u8> },
    /// The session is finalized; no further messages are accepted.
    Closed,
}

/// Session-scoped application state: one session plus the components that
/// act on it.
pub struct App {
    pub session: Session,
    embedder: Arc<dyn Embedder>,
    processor: TurnProcessor,
    feedback: FeedbackRecorder,
    ingest_settings: IngestSettings,
}

impl App {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
        store: Arc<dyn TurnStore>,
        prompts: Prompts,
        ingest_settings: IngestSettings,
    ) -> Self {
        Self {
            session: Session::new(),
            embedder,
            processor: TurnProcessor::new(model, store.clone(), prompts),
            feedback: FeedbackRecorder::new(store),
            ingest_settings,
        }
    }

    /// Handle the configuration submit: validate, ingest the PDF batch, build
    /// the index, then apply everything. Nothing is applied on failure.
    #[instrument(skip(self, config, files), fields(session = %self.session.id()))]
    pub async fn configure(
        &mut self,
        config: SessionConfig,
        files: Vec<UploadedFile>,
    ) -> Result<RenderAction> {
        if self.session.is_configured() {
            return Err(AulaError::InvalidInput(
                "La sesión ya está configurada.".to_string(),
            ));
        }
        config.validate()?;

        let mut index = None;
        let mut filenames = Vec::new();
        if !files.is_empty() {
            let chunks = ingest_pdfs(&files, &self.ingest_settings)?;
            index = Some(VectorIndex::build(chunks, self.embedder.clone()).await?);
            filenames = files.into_iter().map(|f| f.name).collect();
        }

        let indexed_chunks = index.as_ref().map(|i| i.len()).unwrap_or(0);
        self.session.apply_config(config)?;
        self.session.index = index;
        self.session.ingested_files = filenames;

        info!(
            "Session {} configured ({} indexed chunks)",
            self.session.id(),
            indexed_chunks
        );
        Ok(RenderAction::SessionReady { indexed_chunks })
    }

    /// Handle one student message.
    pub async fn send_message(&mut self, author: &str, text: &str) -> Result<RenderAction> {
        if !self.session.is_configured() {
            return Err(AulaError::InvalidInput(
                "Configura la sesión antes de chatear.".to_string(),
            ));
        }
        if self.session.is_closed() {
            return Err(AulaError::InvalidInput(
                "La sesión ya fue finalizada.".to_string(),
            ));
        }
        if !self.session.has_participant(author) {
            return Err(AulaError::InvalidInput(format!(
                "{} no es integrante de esta sesión.",
                author
            )));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(AulaError::InvalidInput("Escribe un mensaje.".to_string()));
        }

        let outcome = self.processor.process(&mut self.session, author, text).await;
        Ok(RenderAction::Exchange {
            reply: outcome.reply,
            turn_id: outcome.turn_id,
            used_grounding: outcome.used_grounding,
        })
    }

    /// Handle a thumbs click on a displayed turn.
    pub async fn rate_turn(&mut self, turn_id: i64, rating: Rating) -> Result<RenderAction> {
        if self.session.message_by_turn_id(turn_id).is_none() {
            return Err(AulaError::InvalidInput(format!(
                "No hay una respuesta registrada con id {}.",
                turn_id
            )));
        }

        match self.feedback.set_rating(turn_id, rating).await {
            FeedbackOutcome::Confirmed { store_error } => {
                if let Some(e) = store_error {
                    self.session.push_notice(format!("Error de feedback: {}", e));
                }
                Ok(RenderAction::RatingConfirmed(rating))
            }
            FeedbackOutcome::Unchanged => Ok(RenderAction::Nothing),
        }
    }

    /// Handle a comment submit on a negatively rated turn.
    pub async fn comment_turn(&mut self, turn_id: i64, text: &str) -> Result<RenderAction> {
        if self.session.message_by_turn_id(turn_id).is_none() {
            return Err(AulaError::InvalidInput(format!(
                "No hay una respuesta registrada con id {}.",
                turn_id
            )));
        }

        match self.feedback.set_comment(turn_id, text).await {
            FeedbackOutcome::Confirmed { store_error } => {
                if let Some(e) = store_error {
                    self.session.push_notice(format!("Error de feedback: {}", e));
                }
                Ok(RenderAction::CommentConfirmed)
            }
            FeedbackOutcome::Unchanged => Ok(RenderAction::Nothing),
        }
    }

    /// Handle the CSV download click.
    pub fn export_csv(&self) -> Result<RenderAction> {
        let bytes = export::to_csv(&self.session.log)?;
        Ok(RenderAction::CsvReady {
            filename: export::suggested_filename(self.session.id()),
            bytes,
        })
    }

    /// Handle the finalize click. Idempotent.
    pub fn finalize(&mut self) -> RenderAction {
        self.session.close();
        RenderAction::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::fake::FakeChatModel;
    use crate::embedding::fake::FakeEmbedder;
    use crate::store::MemoryTurnStore;

    fn app_with(model: FakeChatModel) -> (App, Arc<MemoryTurnStore>) {
        let store = Arc::new(MemoryTurnStore::new());
        let app = App::new(
            Arc::new(FakeEmbedder),
            Arc::new(model),
            store.clone(),
            Prompts::default(),
            IngestSettings::default(),
        );
        (app, store)
    }

    fn valid_config() -> SessionConfig {
        SessionConfig {
            nrc: "EST101".to_string(),
            grupo: "G1".to_string(),
            tema: "Distribución Normal".to_string(),
            estudiantes: vec!["Ana".to_string()],
            consentimiento: true,
        }
    }

    #[tokio::test]
    async fn test_ana_scenario_without_pdfs() {
        let (mut app, store) = app_with(FakeChatModel::replying("La media es el promedio."));

        let ready = app.configure(valid_config(), Vec::new()).await.unwrap();
        assert!(matches!(
            ready,
            RenderAction::SessionReady { indexed_chunks: 0 }
        ));

        let action = app.send_message("Ana", "¿Qué es la media?").await.unwrap();
        let (turn_id, used_grounding) = match action {
            RenderAction::Exchange {
                turn_id,
                used_grounding,
                ..
            } => (turn_id, used_grounding),
            other => panic!("unexpected action: {:?}", other),
        };

        assert!(!used_grounding);
        let id = turn_id.expect("id assigned");
        assert!(!store.get(id).unwrap().usa_rag);
        assert_eq!(app.session.history.len(), 2);
    }

    #[tokio::test]
    async fn test_incomplete_config_blocks_without_partial_apply() {
        let (mut app, _store) = app_with(FakeChatModel::replying("ok"));

        let mut config = valid_config();
        config.nrc = String::new();
        assert!(app.configure(config, Vec::new()).await.is_err());
        assert!(!app.session.is_configured());
    }

    #[tokio::test]
    async fn test_oversized_batch_creates_no_index() {
        let (mut app, _store) = app_with(FakeChatModel::replying("ok"));
        app.ingest_settings.max_batch_bytes = 10;

        let files = vec![UploadedFile::new("grande.pdf", vec![0u8; 11])];
        assert!(app.configure(valid_config(), files).await.is_err());
        assert!(!app.session.is_configured());
        assert!(app.session.index.is_none());
    }

    #[tokio::test]
    async fn test_unknown_author_is_rejected() {
        let (mut app, _store) = app_with(FakeChatModel::replying("ok"));
        app.configure(valid_config(), Vec::new()).await.unwrap();

        assert!(app.send_message("Eva", "hola").await.is_err());
        assert!(app.session.history.is_empty());
    }

    #[tokio::test]
    async fn test_feedback_scenario_rate_then_comment_then_repeat() {
        let (mut app, store) = app_with(FakeChatModel::replying("respuesta"));
        app.configure(valid_config(), Vec::new()).await.unwrap();

        let action = app.send_message("Ana", "pregunta").await.unwrap();
        let turn_id = match action {
            RenderAction::Exchange { turn_id, .. } => turn_id.unwrap(),
            other => panic!("unexpected action: {:?}", other),
        };

        let rated = app.rate_turn(turn_id, Rating::Down).await.unwrap();
        assert!(matches!(rated, RenderAction::RatingConfirmed(Rating::Down)));

        let commented = app.comment_turn(turn_id, "muy vago").await.unwrap();
        assert!(matches!(commented, RenderAction::CommentConfirmed));

        let row = store.get(turn_id).unwrap();
        assert_eq!(row.feedback, Some(Rating::Down));
        assert_eq!(row.feedback_text.as_deref(), Some("muy vago"));

        // Second identical comment: no new confirmation.
        let repeat = app.comment_turn(turn_id, "muy vago").await.unwrap();
        assert!(matches!(repeat, RenderAction::Nothing));

        // Repeated rating click: no duplicate confirmation either.
        let repeat = app.rate_turn(turn_id, Rating::Down).await.unwrap();
        assert!(matches!(repeat, RenderAction::Nothing));
    }

    #[tokio::test]
    async fn test_feedback_requires_persisted_id() {
        let (mut app, _store) = app_with(FakeChatModel::replying("ok"));
        app.configure(valid_config(), Vec::new()).await.unwrap();

        assert!(app.rate_turn(42, Rating::Up).await.is_err());
    }

    #[tokio::test]
    async fn test_export_after_turns() {
        let (mut app, _store) = app_with(FakeChatModel::replying("ok"));
        app.configure(valid_config(), Vec::new()).await.unwrap();
        app.send_message("Ana", "uno").await.unwrap();
        app.send_message("Ana", "dos").await.unwrap();

        match app.export_csv().unwrap() {
            RenderAction::CsvReady { filename, bytes } => {
                assert_eq!(filename, format!("log_{}.csv", app.session.id()));
                let text = String::from_utf8(bytes).unwrap();
                assert_eq!(text.lines().count(), 3);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_finalized_session_rejects_messages() {
        let (mut app, _store) = app_with(FakeChatModel::replying("ok"));
        app.configure(valid_config(), Vec::new()).await.unwrap();

        assert!(matches!(app.finalize(), RenderAction::Closed));
        assert!(app.send_message("Ana", "hola").await.is_err());
    }
}
