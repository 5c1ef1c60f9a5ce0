use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bal_core::config::AppConfig;
use bal_core::error::AppError;

use crate::embeddings::Embedder;
use crate::sources::{Evidence, EvidenceSource};

pub mod cache;
pub mod chunking;
pub mod corpus;
pub mod model;
pub mod similarity;
pub mod vector;

pub use cache::IndexCache;
pub use chunking::{chunk_document, split_text, ChunkingConfig};
pub use corpus::load_corpus;
pub use model::{CorpusDocument, DocumentChunk, ScoredChunk};
pub use vector::{InMemoryIndex, VectorIndex};

/// Separator placed between retrieved chunks.
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub model: String,
    /// Service that computes the vectors; part of the cache scope.
    pub endpoint: String,
    pub chunking: ChunkingConfig,
    pub top_k: usize,
}

impl IndexSettings {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        Ok(Self {
            model: cfg.embedding_model.clone(),
            endpoint: cfg.embedding_endpoint.clone(),
            chunking: ChunkingConfig::new(cfg.chunk_size, cfg.chunk_overlap)?,
            top_k: cfg.top_k.max(1),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub documents: usize,
    pub chunks: usize,
    pub embedded: usize,
    pub reused: usize,
}

/// Similarity-searchable view over a static corpus.
///
/// Built once; read-only afterwards, so it can be shared across threads.
pub struct RetrievalIndex {
    embedder: Arc<dyn Embedder>,
    model: String,
    index: Box<dyn VectorIndex>,
    top_k: usize,
    summary: BuildSummary,
}

impl RetrievalIndex {
    /// Wrap an already populated vector index.
    pub fn from_parts(
        embedder: Arc<dyn Embedder>,
        model: &str,
        index: Box<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        let chunks = index.len();
        Self {
            embedder,
            model: model.to_string(),
            index,
            top_k: top_k.max(1),
            summary: BuildSummary {
                chunks,
                ..BuildSummary::default()
            },
        }
    }

    pub fn build_from_dir(
        dir: &Path,
        embedder: Arc<dyn Embedder>,
        settings: &IndexSettings,
        cache: Option<&IndexCache>,
    ) -> Result<Self, AppError> {
        let docs = load_corpus(dir)?;
        Self::build(&docs, embedder, settings, cache)
    }

    pub fn build(
        docs: &[CorpusDocument],
        embedder: Arc<dyn Embedder>,
        settings: &IndexSettings,
        cache: Option<&IndexCache>,
    ) -> Result<Self, AppError> {
        Self::build_into(Box::new(InMemoryIndex::new()), docs, embedder, settings, cache)
    }

    /// Chunk, embed and insert every document into `index`.
    ///
    /// With a cache, vectors for unchanged chunk texts are reused and the cache
    /// is rewritten to hold exactly the current corpus.
    pub fn build_into(
        mut index: Box<dyn VectorIndex>,
        docs: &[CorpusDocument],
        embedder: Arc<dyn Embedder>,
        settings: &IndexSettings,
        cache: Option<&IndexCache>,
    ) -> Result<Self, AppError> {
        let chunks: Vec<DocumentChunk> = docs
            .iter()
            .flat_map(|d| chunk_document(d, &settings.chunking))
            .collect();
        tracing::info!(documents = docs.len(), chunks = chunks.len(), "split corpus into chunks");

        let cached = match cache {
            Some(c) => c.load(&settings.model, &settings.endpoint)?,
            None => BTreeMap::new(),
        };
        let mut fresh: BTreeMap<String, Vec<f32>> = BTreeMap::new();
        let mut summary = BuildSummary {
            documents: docs.len(),
            chunks: chunks.len(),
            ..BuildSummary::default()
        };

        for chunk in chunks {
            let key = chunk.text_sha256.clone();
            let vector = if let Some(v) = fresh.get(&key).or_else(|| cached.get(&key)) {
                summary.reused += 1;
                v.clone()
            } else {
                summary.embedded += 1;
                embedder.embed(&settings.model, &chunk.text).map_err(|e| {
                    AppError::new("INDEX_BUILD_FAILED", "Failed to compute chunk embedding")
                        .with_details(format!("chunk_id={}; source={}; err={}", chunk.chunk_id, chunk.source, e))
                        .with_retryable(e.retryable)
                })?
            };
            fresh.insert(key, vector.clone());
            index.insert(chunk, vector)?;
        }

        if let Some(c) = cache {
            c.save(&settings.model, &settings.endpoint, &fresh)?;
        }

        tracing::info!(
            chunks = summary.chunks,
            embedded = summary.embedded,
            reused = summary.reused,
            dims = ?index.dims(),
            "retrieval index ready"
        );
        Ok(Self {
            embedder,
            model: settings.model.clone(),
            index,
            top_k: settings.top_k.max(1),
            summary,
        })
    }

    pub fn summary(&self) -> &BuildSummary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, AppError> {
        let q = query.trim();
        if q.is_empty() || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let qv = self.embedder.embed(&self.model, q)?;
        self.index.search(&qv, k)
    }

    /// Top-k chunk texts joined nearest first. Empty when nothing matches.
    pub fn retrieve(&self, query: &str) -> Result<String, AppError> {
        tracing::info!(query, k = self.top_k, "retrieving from local index");
        let hits = self.search(query, self.top_k)?;
        Ok(hits
            .into_iter()
            .map(|h| h.chunk.text)
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR))
    }
}

impl EvidenceSource for RetrievalIndex {
    fn source_name(&self) -> &str {
        "BiomedicalRAG"
    }

    fn fetch(&self, query: &str) -> Evidence {
        match self.retrieve(query) {
            Ok(text) => Evidence::found(text),
            Err(e) => Evidence::unavailable(self.source_name(), &e),
        }
    }
}
