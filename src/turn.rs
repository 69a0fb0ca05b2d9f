//! Chat turn processing: the central state transition.
//!
//! One invocation appends exactly one user and one assistant entry to the
//! session history, in that order, regardless of any failure along the way.
//! Generation failures become an error-text reply; persistence failures are
//! reported to the operator notices only. The student-facing chat is never
//! blocked by a logging failure.

use crate::chat::{normalize_math_delimiters, ChatModel};
use crate::config::Prompts;
use crate::grounding;
use crate::session::{ChatMessage, Role, Session};
use crate::store::{TurnRecord, TurnStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of one processed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant reply shown to the students.
    pub reply: String,
    /// Store-assigned id, when the insert succeeded.
    pub turn_id: Option<i64>,
    /// Whether a vector index grounded this turn.
    pub used_grounding: bool,
}

/// Processes chat turns against a model and a turn store.
pub struct TurnProcessor {
    model: Arc<dyn ChatModel>,
    store: Arc<dyn TurnStore>,
    prompts: Prompts,
}

impl TurnProcessor {
    pub fn new(model: Arc<dyn ChatModel>, store: Arc<dyn TurnStore>, prompts: Prompts) -> Self {
        Self {
            model,
            store,
            prompts,
        }
    }

    /// Process one exchange for `author` asking `question`.
    ///
    /// The caller validates author and session state beforehand; from here on
    /// the turn always completes and is always recorded in the session.
    #[instrument(skip(self, session, question), fields(session = %session.id(), author = %author))]
    pub async fn process(&self, session: &mut Session, author: &str, question: &str) -> TurnOutcome {
        session.history.push(ChatMessage {
            role: Role::User,
            author: Some(author.to_string()),
            text: question.to_string(),
            turn_id: None,
        });

        let used_grounding = session.index.is_some();
        let reply = self.generate_reply(session, question).await;

        let (nrc, grupo, tema) = match session.config() {
            Ok(c) => (c.nrc.clone(), c.grupo.clone(), c.tema.clone()),
            // Unreachable for configured sessions; keep the turn anyway.
            Err(_) => (String::new(), String::new(), String::new()),
        };

        let mut record = TurnRecord {
            session_id: session.id().to_string(),
            nrc,
            grupo,
            tema,
            estudiante: author.to_string(),
            mensaje_usuario: question.to_string(),
            respuesta_ia: reply.clone(),
            usa_rag: used_grounding,
            timestamp: Utc::now(),
            id: None,
            feedback: None,
            feedback_text: None,
        };

        let turn_id = match self.store.insert_turn(&record).await {
            Ok(id) => {
                info!("Persisted turn {} for session {}", id, session.id());
                Some(id)
            }
            Err(e) => {
                warn!("Turn insert failed: {}", e);
                session.push_notice(format!("Error de registro: {}", e));
                None
            }
        };
        record.id = turn_id;
        session.log.push(record);

        session.history.push(ChatMessage {
            role: Role::Assistant,
            author: None,
            text: reply.clone(),
            turn_id,
        });

        TurnOutcome {
            reply,
            turn_id,
            used_grounding,
        }
    }

    /// Assemble grounding and call the model, folding every failure into an
    /// error-text reply so the turn is still recorded.
    async fn generate_reply(&self, session: &Session, question: &str) -> String {
        let contexto = match grounding::assemble(question, session.index.as_ref()).await {
            Ok(block) => block,
            Err(e) => return format!("Error al generar respuesta: {}", e),
        };

        let tema = session.config().map(|c| c.tema.clone()).unwrap_or_default();
        let system = self.prompts.render_system(&tema, &contexto);

        match self.model.complete(&system, question).await {
            Ok(raw) => normalize_math_delimiters(&raw),
            Err(e) => format!("Error al generar respuesta: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::fake::FakeChatModel;
    use crate::embedding::fake::FakeEmbedder;
    use crate::grounding::GROUNDING_HEADER;
    use crate::index::VectorIndex;
    use crate::session::SessionConfig;
    use crate::store::MemoryTurnStore;

    fn configured_session() -> Session {
        let mut session = Session::new();
        session
            .apply_config(SessionConfig {
                nrc: "EST101".to_string(),
                grupo: "G1".to_string(),
                tema: "Distribución Normal".to_string(),
                estudiantes: vec!["Ana".to_string()],
                consentimiento: true,
            })
            .unwrap();
        session
    }

    fn processor(
        model: Arc<FakeChatModel>,
        store: Arc<MemoryTurnStore>,
    ) -> TurnProcessor {
        TurnProcessor::new(model, store, Prompts::default())
    }

    #[tokio::test]
    async fn test_successful_turn_is_persisted() {
        let model = Arc::new(FakeChatModel::replying("La media es el promedio."));
        let store = Arc::new(MemoryTurnStore::new());
        let proc = processor(model.clone(), store.clone());
        let mut session = configured_session();

        let outcome = proc.process(&mut session, "Ana", "¿Qué es la media?").await;

        assert_eq!(outcome.reply, "La media es el promedio.");
        assert!(!outcome.used_grounding);
        let id = outcome.turn_id.expect("insert should assign an id");

        let row = store.get(id).unwrap();
        assert_eq!(row.estudiante, "Ana");
        assert_eq!(row.mensaje_usuario, "¿Qué es la media?");
        assert!(!row.usa_rag);

        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].role, Role::User);
        assert_eq!(session.history[1].role, Role::Assistant);
        assert_eq!(session.history[1].turn_id, Some(id));
    }

    #[tokio::test]
    async fn test_history_alternates_over_many_turns() {
        let model = Arc::new(FakeChatModel::replying("ok"));
        let store = Arc::new(MemoryTurnStore::new());
        let proc = processor(model, store);
        let mut session = configured_session();

        for _ in 0..5 {
            proc.process(&mut session, "Ana", "pregunta").await;
        }

        assert_eq!(session.history.len(), 10);
        for (i, msg) in session.history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(msg.role, expected);
        }
        assert_eq!(session.log.len(), 5);
    }

    #[tokio::test]
    async fn test_model_failure_becomes_error_reply_and_is_still_persisted() {
        let model = Arc::new(FakeChatModel::failing());
        let store = Arc::new(MemoryTurnStore::new());
        let proc = processor(model, store.clone());
        let mut session = configured_session();

        let outcome = proc.process(&mut session, "Ana", "¿Qué es la media?").await;

        assert!(outcome.reply.starts_with("Error al generar respuesta:"));
        assert!(outcome.reply.contains("connection reset by peer"));

        let id = outcome.turn_id.expect("the turn is still recorded");
        assert_eq!(store.get(id).unwrap().respuesta_ia, outcome.reply);
        assert_eq!(session.history.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_failure_keeps_turn_visible_without_id() {
        let model = Arc::new(FakeChatModel::replying("respuesta"));
        let store = Arc::new(MemoryTurnStore::new());
        store.set_failing(true);
        let proc = processor(model, store.clone());
        let mut session = configured_session();

        let outcome = proc.process(&mut session, "Ana", "hola").await;

        assert!(outcome.turn_id.is_none());
        assert_eq!(session.history.len(), 2);
        assert!(session.history[1].turn_id.is_none());
        // Logging failure goes to the operator notices, not the chat.
        assert_eq!(session.notices.len(), 1);
        assert!(session.notices[0].starts_with("Error de registro:"));
        // The id-less turn still lands in the export buffer.
        assert_eq!(session.log.len(), 1);
        assert!(session.log[0].id.is_none());
    }

    #[tokio::test]
    async fn test_reply_delimiters_are_normalized() {
        let model = Arc::new(FakeChatModel::replying(r"La fórmula \(z\) y \[E\]"));
        let store = Arc::new(MemoryTurnStore::new());
        let proc = processor(model, store);
        let mut session = configured_session();

        let outcome = proc.process(&mut session, "Ana", "fórmulas").await;
        assert_eq!(outcome.reply, "La fórmula $z$ y $$E$$");
    }

    #[tokio::test]
    async fn test_ungrounded_turn_carries_no_grounding_header() {
        let model = Arc::new(FakeChatModel::replying("ok"));
        let store = Arc::new(MemoryTurnStore::new());
        let proc = processor(model.clone(), store.clone());
        let mut session = configured_session();

        let outcome = proc.process(&mut session, "Ana", "¿Qué es la media?").await;

        assert!(!outcome.used_grounding);
        let system = model.last_system.lock().unwrap().clone().unwrap();
        assert!(!system.contains("CONTEXTO MATERIAL"));
        let id = outcome.turn_id.unwrap();
        assert!(!store.get(id).unwrap().usa_rag);
    }

    #[tokio::test]
    async fn test_grounded_turn_embeds_material_in_system_prompt() {
        let model = Arc::new(FakeChatModel::replying("ok"));
        let store = Arc::new(MemoryTurnStore::new());
        let proc = processor(model.clone(), store.clone());
        let mut session = configured_session();

        let chunks = vec!["la varianza mide dispersión".to_string()];
        session.index = Some(
            VectorIndex::build(chunks, Arc::new(FakeEmbedder))
                .await
                .unwrap(),
        );

        let outcome = proc.process(&mut session, "Ana", "varianza").await;

        assert!(outcome.used_grounding);
        let system = model.last_system.lock().unwrap().clone().unwrap();
        assert!(system.contains(GROUNDING_HEADER.trim_start()));
        assert!(system.contains("la varianza mide dispersión"));
        let id = outcome.turn_id.unwrap();
        assert!(store.get(id).unwrap().usa_rag);
    }
}
