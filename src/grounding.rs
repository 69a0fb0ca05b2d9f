//! Grounding context assembly for each chat turn.

use crate::error::Result;
use crate::index::{VectorIndex, MAX_NEAREST};

/// Header marker that separates instructional material from conversation in
/// the rendered prompt.
pub const GROUNDING_HEADER: &str = "\n\nCONTEXTO MATERIAL:\n";

/// Build the grounding block for a question.
///
/// Returns an empty string when no index is present; otherwise the nearest
/// chunk texts joined by newlines under [`GROUNDING_HEADER`].
pub async fn assemble(question: &str, index: Option<&VectorIndex>) -> Result<String> {
    let Some(index) = index else {
        return Ok(String::new());
    };

    let chunks = index.nearest(question, MAX_NEAREST).await?;
    if chunks.is_empty() {
        return Ok(String::new());
    }

    Ok(format!("{}{}", GROUNDING_HEADER, chunks.join("\n")))
}
