use crate::error::IngestError;
use crate::models::{DocumentChunk, IngestionOptions};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than max size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

/// Recursively splits `text` on paragraph, line, word and finally character
/// boundaries, then merges the pieces into windows of at most
/// `config.max_chars` characters that share up to `config.overlap_chars`
/// characters with their predecessor.
pub fn split_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    split_recursive(text, &SEPARATORS, config)
}

fn split_recursive(text: &str, separators: &[&str], config: ChunkingConfig) -> Vec<String> {
    let position = separators
        .iter()
        .position(|separator| separator.is_empty() || text.contains(separator))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let remaining = separators.get(position + 1..).unwrap_or(&[]);

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) < config.max_chars {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            chunks.extend(merge_pieces(&pending, config));
            pending.clear();
        }

        if remaining.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, remaining, config));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_pieces(&pending, config));
    }

    chunks
}

// The separator stays attached to the start of the piece that follows it.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(start, ch)| &text[start..start + ch.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (index, _) in text.match_indices(separator) {
        if index > last {
            pieces.push(&text[last..index]);
        }
        last = index;
    }
    pieces.push(&text[last..]);
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn merge_pieces(pieces: &[&str], config: ChunkingConfig) -> Vec<String> {
    let mut merged = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let length = char_len(piece);

        if total + length > config.max_chars && !window.is_empty() {
            if let Some(chunk) = join_window(&window) {
                merged.push(chunk);
            }

            while total > config.overlap_chars
                || (total + length > config.max_chars && total > 0)
            {
                match window.pop_front() {
                    Some(front) => total -= char_len(front),
                    None => break,
                }
            }
        }

        window.push_back(piece);
        total += length;
    }

    if let Some(chunk) = join_window(&window) {
        merged.push(chunk);
    }

    merged
}

fn join_window(window: &VecDeque<&str>) -> Option<String> {
    let joined = window.iter().copied().collect::<String>();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn build_chunks(
    source_path: Option<&str>,
    text: &str,
    config: ChunkingConfig,
    global_index: u64,
) -> Result<(Vec<DocumentChunk>, u64), IngestError> {
    config.validate()?;

    let mut chunks = Vec::new();
    let mut cursor = global_index;

    for piece in split_text(text, config) {
        chunks.push(make_chunk(source_path, cursor, piece));
        cursor = cursor.saturating_add(1);
    }

    Ok((chunks, cursor))
}

pub(crate) fn make_chunk(source_path: Option<&str>, index: u64, text: String) -> DocumentChunk {
    DocumentChunk {
        chunk_id: make_chunk_id(source_path.unwrap_or_default(), index, &text),
        source_path: source_path.map(str::to_string),
        chunk_index: index,
        text,
    }
}

fn make_chunk_id(source: &str, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_chars: usize, overlap_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chars,
            overlap_chars,
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("  Blockchain fundamentals.  ", config(1_000, 100));
        assert_eq!(chunks, vec!["Blockchain fundamentals.".to_string()]);
    }

    #[test]
    fn chunks_never_exceed_max_size() {
        let paragraph = "Distributed ledgers record transactions across many nodes. ";
        let text = (0..40)
            .map(|index| format!("{index} {}", paragraph.repeat(index % 5 + 1)))
            .collect::<Vec<_>>()
            .join("\n\n");

        let chunks = split_text(&text, config(200, 20));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn adjacent_windows_share_the_configured_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(3);
        let chunks = split_text(&text, config(20, 5));

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let previous: Vec<char> = pair[0].chars().collect();
            let tail: String = previous[previous.len() - 5..].iter().collect();
            assert!(pair[1].starts_with(&tail), "{:?} / {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn paragraph_boundaries_are_preferred() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = split_text(&text, config(40, 5));
        assert_eq!(chunks, vec!["a".repeat(30), "b".repeat(30)]);
    }

    #[test]
    fn multibyte_text_is_measured_in_chars() {
        let text = "é".repeat(25);
        let chunks = split_text(&text, config(10, 2));
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 10));
    }

    #[test]
    fn overlap_must_be_smaller_than_max() {
        assert!(config(10, 10).validate().is_err());
        assert!(config(0, 0).validate().is_err());
        assert!(config(10, 3).validate().is_ok());
    }

    #[test]
    fn chunk_ids_are_stable_and_indices_advance() -> Result<(), IngestError> {
        let text = "word ".repeat(100);
        let (first, next) = build_chunks(Some("a.docx"), &text, config(50, 10), 7)?;
        let (second, _) = build_chunks(Some("a.docx"), &text, config(50, 10), 7)?;

        assert_eq!(first, second);
        assert_eq!(first[0].chunk_index, 7);
        assert_eq!(next, 7 + first.len() as u64);
        assert_eq!(first[0].source_path.as_deref(), Some("a.docx"));
        Ok(())
    }
}
