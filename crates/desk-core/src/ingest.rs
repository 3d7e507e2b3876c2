use crate::error::DeskError;
use std::path::Path;
use tracing::debug;

/// Read a document file (extracted text / markdown) into memory.
pub fn load_document(path: &Path) -> Result<String, DeskError> {
    if !path.exists() {
        return Err(DeskError::Ingest(format!(
            "Document not found: {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(DeskError::Ingest(format!(
            "Document is empty: {}",
            path.display()
        )));
    }
    Ok(text)
}

/// Split a document into passages for indexing.
///
/// `chunk_size` caps each passage in characters; `overlap` is the number of
/// trailing characters repeated at the start of the next passage so that
/// sentences cut at a boundary stay retrievable. Cuts prefer a whitespace
/// boundary in the second half of the window.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, DeskError> {
    if chunk_size == 0 {
        return Err(DeskError::Ingest("chunk_size must be non-zero".into()));
    }
    if overlap >= chunk_size {
        return Err(DeskError::Ingest(
            "chunk_overlap must be smaller than chunk_size".into(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());

        let mut cut = end;
        if end < chars.len() {
            if let Some(ws) = (start + chunk_size / 2..end)
                .rev()
                .find(|&i| chars[i].is_whitespace())
            {
                cut = ws + 1;
            }
        }

        let chunk: String = chars[start..cut].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if cut >= chars.len() {
            break;
        }

        // Step back by the overlap, but always make forward progress.
        let mut next = cut.saturating_sub(overlap);
        if next <= start {
            next = cut;
        }
        start = next;
    }

    debug!(passages = chunks.len(), chunk_size, overlap, "chunked document");
    Ok(chunks)
}
