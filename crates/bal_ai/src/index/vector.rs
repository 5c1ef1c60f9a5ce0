use bal_core::error::AppError;

use super::model::{DocumentChunk, ScoredChunk};
use super::similarity;

/// Nearest-neighbour storage behind the retrieval index.
///
/// Build and query use the same metric. Implementations own their chunks;
/// nothing outside may mutate them after build.
pub trait VectorIndex: Send + Sync {
    fn insert(&mut self, chunk: DocumentChunk, embedding: Vec<f32>) -> Result<(), AppError>;

    /// Top `k` chunks by similarity, best first.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, AppError>;

    fn len(&self) -> usize;

    fn dims(&self) -> Option<usize>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry {
    chunk: DocumentChunk,
    embedding: Vec<f32>,
    norm: f32,
}

/// Exhaustive cosine-similarity search over vectors held in memory.
#[derive(Default)]
pub struct InMemoryIndex {
    entries: Vec<Entry>,
    dims: Option<usize>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for InMemoryIndex {
    fn insert(&mut self, chunk: DocumentChunk, embedding: Vec<f32>) -> Result<(), AppError> {
        match self.dims {
            Some(d) if d != embedding.len() => {
                return Err(AppError::new(
                    "INDEX_BUILD_FAILED",
                    "Embedding dimension mismatch across chunks",
                )
                .with_details(format!(
                    "expected={}; got={}; chunk_id={}",
                    d,
                    embedding.len(),
                    chunk.chunk_id
                )));
            }
            Some(_) => {}
            None => self.dims = Some(embedding.len()),
        }
        let norm = similarity::l2_norm(&embedding);
        self.entries.push(Entry {
            chunk,
            embedding,
            norm,
        });
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, AppError> {
        let Some(dims) = self.dims else {
            return Ok(Vec::new());
        };
        if query.len() != dims {
            return Err(AppError::new(
                "INDEX_QUERY_FAILED",
                "Query embedding dims do not match index dims",
            )
            .with_details(format!("index_dims={dims}; query_dims={}", query.len())));
        }
        let qnorm = similarity::l2_norm(query);
        if qnorm == 0.0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(&Entry, f32)> = self
            .entries
            .iter()
            .filter(|e| e.norm > 0.0)
            .map(|e| {
                let score = similarity::cosine_similarity(query, &e.embedding, qnorm, e.norm);
                (e, score)
            })
            .collect();

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.chunk.chunk_id.cmp(&b.0.chunk.chunk_id))
        });
        hits.truncate(k);

        Ok(hits
            .into_iter()
            .map(|(e, score)| ScoredChunk {
                chunk: e.chunk.clone(),
                score,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dims(&self) -> Option<usize> {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk::new("t.txt", 0, text.to_string())
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let mut idx = InMemoryIndex::new();
        idx.insert(chunk("a"), vec![1.0, 0.0]).unwrap();
        let err = idx.insert(chunk("b"), vec![1.0, 0.0, 0.0]).unwrap_err();
        assert_eq!(err.code, "INDEX_BUILD_FAILED");
    }

    #[test]
    fn skips_zero_vectors_and_empty_index() {
        let empty = InMemoryIndex::new();
        assert!(empty.search(&[1.0], 3).unwrap().is_empty());

        let mut idx = InMemoryIndex::new();
        idx.insert(chunk("zero"), vec![0.0, 0.0]).unwrap();
        idx.insert(chunk("one"), vec![1.0, 1.0]).unwrap();
        let hits = idx.search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "one");
    }

    #[test]
    fn ties_break_by_chunk_id() {
        let mut idx = InMemoryIndex::new();
        idx.insert(chunk("left"), vec![2.0, 0.0]).unwrap();
        idx.insert(chunk("right"), vec![1.0, 0.0]).unwrap();
        let hits = idx.search(&[1.0, 0.0], 2).unwrap();
        assert!(hits[0].chunk.chunk_id < hits[1].chunk.chunk_id);
    }
}
