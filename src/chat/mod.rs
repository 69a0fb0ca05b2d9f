//! Chat completion abstraction.
//!
//! The model call is the only long-latency operation in a turn; everything
//! around it stays synchronous and testable behind this trait.

mod openai;

pub use openai::OpenAIChatModel;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for chat completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a reply from a system instruction and a single user message.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Replace alternate LaTeX delimiters with the canonical `$`/`$$` forms.
///
/// A best-effort textual substitution, not a parser: the delimiters are
/// replaced wherever they appear, including inside unrelated text.
pub fn normalize_math_delimiters(text: &str) -> String {
    text.replace(r"\(", "$")
        .replace(r"\)", "$")
        .replace(r"\[", "$$")
        .replace(r"\]", "$$")
}

#[cfg(test)]
pub mod fake {
    //! Scripted chat model for tests.

    use super::ChatModel;
    use crate::error::{AulaError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed reply, or a transport-style error when `fail` is set.
    /// Captures the last system instruction for assertions.
    pub struct FakeChatModel {
        pub reply: String,
        pub fail: bool,
        pub last_system: Mutex<Option<String>>,
    }

    impl FakeChatModel {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail: false,
                last_system: Mutex::new(None),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: String::new(),
                fail: true,
                last_system: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ChatModel for FakeChatModel {
        async fn complete(&self, system: &str, _user: &str) -> Result<String> {
            *self.last_system.lock().unwrap() = Some(system.to_string());
            if self.fail {
                return Err(AulaError::OpenAI("connection reset by peer".to_string()));
            }
            Ok(self.reply.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_inline_delimiters() {
        let text = r"La fórmula \(z = x\) es clave.";
        assert_eq!(normalize_math_delimiters(text), "La fórmula $z = x$ es clave.");
    }

    #[test]
    fn test_normalize_block_delimiters() {
        let text = r"Bloque: \[E = mc^2\]";
        assert_eq!(normalize_math_delimiters(text), "Bloque: $$E = mc^2$$");
    }

    #[test]
    fn test_normalize_leaves_canonical_delimiters_alone() {
        let text = "Inline $x$ y bloque $$y$$.";
        assert_eq!(normalize_math_delimiters(text), text);
    }

    #[test]
    fn test_normalize_is_textual_not_parsed() {
        // Delimiters inside unrelated prose are still replaced.
        let text = r"escribe \( donde quieras";
        assert_eq!(normalize_math_delimiters(text), "escribe $ donde quieras");
    }
}
