use bal_core::error::{AppError, CONFIG_INVALID};

use super::model::{CorpusDocument, DocumentChunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, AppError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(AppError::new(
                CONFIG_INVALID,
                "Chunk overlap must be smaller than a positive chunk size",
            )
            .with_details(format!("chunk_size={chunk_size}; chunk_overlap={chunk_overlap}")));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

pub(crate) fn normalize_text(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Split text into windows of at most `chunk_size` characters.
///
/// A window ends at the last whitespace at or before its limit when that still
/// leaves more than `chunk_overlap` characters; otherwise it is cut hard. Each following
/// window starts exactly `chunk_overlap` characters before the previous end,
/// so adjacent chunks share that many characters.
pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<String> {
    let normalized = normalize_text(text);
    let chars: Vec<char> = normalized.trim().chars().collect();
    let len = chars.len();

    let mut out = Vec::new();
    if len == 0 {
        return out;
    }

    let mut start = 0usize;
    loop {
        let hard_end = (start + cfg.chunk_size).min(len);
        let end = if hard_end == len {
            len
        } else {
            (start + cfg.chunk_overlap + 1..=hard_end)
                .rev()
                .find(|&i| chars[i].is_whitespace())
                .unwrap_or(hard_end)
        };

        out.push(chars[start..end].iter().collect());
        if end == len {
            break;
        }
        // end > start + overlap, so this always advances.
        start = end - cfg.chunk_overlap;
    }
    out
}

pub fn chunk_document(doc: &CorpusDocument, cfg: &ChunkingConfig) -> Vec<DocumentChunk> {
    split_text(&doc.text, cfg)
        .into_iter()
        .enumerate()
        .map(|(i, text)| DocumentChunk::new(&doc.source, i as u32, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cfg(size: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig::new(size, overlap).unwrap()
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_text("  CD47 is a marker.\r\n", &cfg(500, 100)), vec!["CD47 is a marker."]);
        assert!(split_text(" \n\t ", &cfg(500, 100)).is_empty());
    }

    #[test]
    fn chunks_respect_size_and_share_overlap() {
        let text = (0..400)
            .map(|i| format!("token{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let c = cfg(120, 30);
        let chunks = split_text(&text, &c);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120);
        }
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let tail: String = prev[prev.len() - 30..].iter().collect();
            let head: String = pair[1].chars().take(30).collect();
            assert_eq!(tail, head);
        }
        let last = chunks.last().unwrap();
        assert!(text.ends_with(last.as_str()));
    }

    #[test]
    fn prefers_whitespace_boundaries() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = split_text(text, &cfg(16, 4));
        assert_eq!(chunks[0], "alpha beta gamma");
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
    }

    #[test]
    fn hard_cuts_when_no_whitespace() {
        let text = "x".repeat(25);
        let chunks = split_text(&text, &cfg(10, 2));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[1].len(), 10);
        assert_eq!(chunks[2].len(), 9);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "αβγδε".repeat(30);
        let chunks = split_text(&text, &cfg(40, 10));
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(ChunkingConfig::new(100, 100).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
    }
}
