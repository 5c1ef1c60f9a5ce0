use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One plain-text document from the corpus directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusDocument {
    /// File name relative to the corpus directory.
    pub source: String,
    pub text: String,
}

/// A bounded span of one document; the unit of vector indexing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub source: String,
    pub ordinal: u32,
    pub text: String,
    pub text_sha256: String,
}

impl DocumentChunk {
    pub fn new(source: &str, ordinal: u32, text: String) -> Self {
        let text_sha256 = sha256_hex(text.as_bytes());
        let chunk_id = sha256_hex(format!("source={source}\nordinal={ordinal}\ntext={text}").as_bytes());
        Self {
            chunk_id,
            source: source.to_string(),
            ordinal,
            text,
            text_sha256,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
