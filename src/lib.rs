//! Aula - Classroom Chat Assistant with Research Logging
//!
//! Students converse with an LLM about a configured topic, optionally
//! grounded in instructor-supplied PDF material. Every turn is persisted for
//! research purposes and can receive thumbs-up/down feedback.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `ingest` - PDF upload batches to text chunks
//! - `embedding` - Embedding generation
//! - `index` - Session-scoped vector index
//! - `grounding` - Grounding context assembly per turn
//! - `chat` - Chat completion abstraction
//! - `turn` - Chat turn processing and persistence
//! - `feedback` - Idempotent feedback recording
//! - `store` - Turn store backends (Supabase, SQLite, memory)
//! - `export` - CSV export of the session log
//! - `session` - Session-scoped state
//! - `handlers` - Explicit per-action event handlers
//!
//! # Example
//!
//! ```rust,no_run
//! use aula::chat::OpenAIChatModel;
//! use aula::config::{Prompts, Settings};
//! use aula::embedding::OpenAIEmbedder;
//! use aula::handlers::App;
//! use aula::session::SessionConfig;
//! use aula::store::SqliteTurnStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut app = App::new(
//!         Arc::new(OpenAIEmbedder::new()),
//!         Arc::new(OpenAIChatModel::new(&settings.chat.model, settings.chat.temperature)),
//!         Arc::new(SqliteTurnStore::new(&settings.sqlite_path())?),
//!         Prompts::default(),
//!         settings.ingest.clone(),
//!     );
//!
//!     app.configure(
//!         SessionConfig {
//!             nrc: "EST101".into(),
//!             grupo: "G1".into(),
//!             tema: "Distribución Normal".into(),
//!             estudiantes: vec!["Ana".into()],
//!             consentimiento: true,
//!         },
//!         Vec::new(),
//!     )
//!     .await?;
//!
//!     let action = app.send_message("Ana", "¿Qué es la media?").await?;
//!     println!("{:?}", action);
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod export;
pub mod feedback;
pub mod grounding;
pub mod handlers;
pub mod index;
pub mod ingest;
pub mod openai;
pub mod session;
pub mod store;
pub mod turn;

pub use error::{AulaError, Result};
