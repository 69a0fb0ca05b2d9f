//! Document ingestion: PDF uploads to ordered text chunks.
//!
//! Parsing goes through a named temporary file because the PDF extractor
//! works on paths; the file is removed on drop, success or failure.

use crate::config::IngestSettings;
use crate::error::{AulaError, Result};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// One uploaded file: display name plus raw bytes.
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Split an uploaded PDF batch into an ordered sequence of text chunks.
///
/// The whole batch is atomic: an oversized batch or an unreadable file fails
/// ingestion and nothing is returned. Chunk order is file order, then page
/// order, then paragraph order within a page.
#[instrument(skip(files, settings), fields(count = files.len()))]
pub fn ingest_pdfs(files: &[UploadedFile], settings: &IngestSettings) -> Result<Vec<String>> {
    let total_bytes: u64 = files.iter().map(|f| f.bytes.len() as u64).sum();
    if total_bytes > settings.max_batch_bytes {
        return Err(AulaError::Ingest(format!(
            "Upload batch is {} bytes, above the {} byte limit",
            total_bytes, settings.max_batch_bytes
        )));
    }

    let mut chunks = Vec::new();
    for file in files {
        let file_chunks = extract_chunks(file, settings.max_chunk_chars)?;
        debug!("Extracted {} chunks from {}", file_chunks.len(), file.name);
        chunks.extend(file_chunks);
    }

    info!(
        "Ingested {} files ({} bytes) into {} chunks",
        files.len(),
        total_bytes,
        chunks.len()
    );
    Ok(chunks)
}

/// Extract text chunks from a single PDF.
fn extract_chunks(file: &UploadedFile, max_chunk_chars: usize) -> Result<Vec<String>> {
    let mut tmp = NamedTempFile::new()?;
    tmp.write_all(&file.bytes)?;
    tmp.flush()?;

    // pdf-extract can panic on malformed files; treat that as a parse error.
    let path = tmp.path().to_path_buf();
    let pages = std::panic::catch_unwind(move || pdf_extract::extract_text_by_pages(&path));
    let pages = match pages {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            return Err(AulaError::Ingest(format!(
                "Failed to read {}: {}",
                file.name, e
            )))
        }
        Err(_) => {
            return Err(AulaError::Ingest(format!(
                "Failed to read {}: malformed PDF",
                file.name
            )))
        }
    };

    let mut chunks = Vec::new();
    for page in &pages {
        chunks.extend(split_page(page, max_chunk_chars));
    }

    if chunks.is_empty() {
        return Err(AulaError::Ingest(format!(
            "No extractable text in {}",
            file.name
        )));
    }

    Ok(chunks)
}

/// Split one page of text into chunks at blank-line boundaries.
///
/// Paragraphs are packed greedily up to `max_chars`; a single paragraph
/// longer than the limit is split at char boundaries.
pub fn split_page(page: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in page.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if paragraph.chars().count() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.extend(split_hard(paragraph, max_chars));
            continue;
        }

        if !current.is_empty() && current.chars().count() + paragraph.chars().count() + 2 > max_chars
        {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split an over-long paragraph into fixed-size pieces at char boundaries.
fn split_hard(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect::<String>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestSettings;

    fn settings_with_limit(max_batch_bytes: u64) -> IngestSettings {
        IngestSettings {
            max_batch_bytes,
            ..IngestSettings::default()
        }
    }

    #[test]
    fn test_batch_at_limit_is_accepted_by_size_check() {
        // Not a valid PDF, so ingestion fails at parse time, not the size gate.
        let file = UploadedFile::new("a.pdf", vec![0u8; 100]);
        let err = ingest_pdfs(&[file], &settings_with_limit(100)).unwrap_err();
        assert!(matches!(err, AulaError::Ingest(ref msg) if msg.contains("a.pdf")));
    }

    #[test]
    fn test_batch_over_limit_is_rejected() {
        let file = UploadedFile::new("a.pdf", vec![0u8; 101]);
        let err = ingest_pdfs(&[file], &settings_with_limit(100)).unwrap_err();
        assert!(matches!(err, AulaError::Ingest(ref msg) if msg.contains("limit")));
    }

    #[test]
    fn test_limit_applies_to_the_aggregate() {
        let files = vec![
            UploadedFile::new("a.pdf", vec![0u8; 60]),
            UploadedFile::new("b.pdf", vec![0u8; 60]),
        ];
        let err = ingest_pdfs(&files, &settings_with_limit(100)).unwrap_err();
        assert!(matches!(err, AulaError::Ingest(ref msg) if msg.contains("limit")));
    }

    #[test]
    fn test_corrupt_file_aborts_whole_batch() {
        let files = vec![UploadedFile::new("bad.pdf", b"not a pdf".to_vec())];
        assert!(ingest_pdfs(&files, &IngestSettings::default()).is_err());
    }

    #[test]
    fn test_split_page_packs_paragraphs() {
        let page = "uno\n\ndos\n\ntres";
        let chunks = split_page(page, 10);
        assert_eq!(chunks, vec!["uno\n\ndos".to_string(), "tres".to_string()]);
    }

    #[test]
    fn test_split_page_splits_long_paragraph() {
        let page = "abcdefghij";
        let chunks = split_page(page, 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_split_page_skips_blank_paragraphs() {
        let chunks = split_page("\n\n  \n\nhola\n\n", 100);
        assert_eq!(chunks, vec!["hola"]);
    }
}
