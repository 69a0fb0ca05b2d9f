//! Configuration module for Aula.
//!
//! Handles loading and managing application settings and the prompt templates
//! used to build the assistant's system instruction.

mod prompts;
mod settings;

pub use prompts::{ChatPrompts, Prompts};
pub use settings::{
    ChatSettings, EmbeddingSettings, GeneralSettings, IngestSettings, Settings, StoreBackend,
    StoreSettings,
};
