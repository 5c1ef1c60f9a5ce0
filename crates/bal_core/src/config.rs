use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, CONFIG_INVALID, CONFIG_MISSING_CREDENTIAL};

pub const TOKEN_VAR: &str = "HUGGINGFACEHUB_API_TOKEN";

pub const DEFAULT_LLM_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/meta-llama/Llama-3.1-8B-Instruct";
pub const DEFAULT_EMBEDDING_ENDPOINT: &str =
    "https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_PUBMED_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_UNIPROT_BASE_URL: &str = "https://rest.uniprot.org";
pub const DEFAULT_CLINICAL_TRIALS_BASE_URL: &str = "https://clinicaltrials.gov";

/// Sampling parameters sent with every text-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_new_tokens: u32,
    pub repetition_penalty: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_new_tokens: 512,
            repetition_penalty: 1.03,
        }
    }
}

/// Everything the assistant needs at runtime. Built once at startup and
/// passed by reference; nothing reads the environment after this.
#[derive(Clone)]
pub struct AppConfig {
    pub api_token: String,
    pub llm_endpoint: String,
    pub embedding_endpoint: String,
    pub embedding_model: String,
    pub generation: GenerationParams,

    pub corpus_dir: PathBuf,
    /// Embedding cache location. `None` rebuilds every vector at startup.
    pub index_cache_dir: Option<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,

    pub max_iterations: usize,

    pub http_timeout: Duration,
    pub llm_timeout: Duration,

    pub pubmed_base_url: String,
    /// Optional NCBI E-utilities key.
    pub ncbi_api_key: Option<String>,
    pub uniprot_base_url: String,
    pub clinical_trials_base_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_token", &"<redacted>")
            .field("llm_endpoint", &self.llm_endpoint)
            .field("embedding_endpoint", &self.embedding_endpoint)
            .field("corpus_dir", &self.corpus_dir)
            .field("index_cache_dir", &self.index_cache_dir)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("top_k", &self.top_k)
            .field("max_iterations", &self.max_iterations)
            .field("ncbi_api_key", &self.ncbi_api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Fails with `CONFIG_MISSING_CREDENTIAL` when the API token is absent or
    /// blank, so the process stops before any request would be rejected with a 401.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup(TOKEN_VAR)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::new(
                    CONFIG_MISSING_CREDENTIAL,
                    "Language model API token is not configured",
                )
                .with_details(format!("set {TOKEN_VAR} in the environment or .env"))
            })?;

        let string_or = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let cfg = Self {
            api_token,
            llm_endpoint: string_or("BAL_LLM_ENDPOINT", DEFAULT_LLM_ENDPOINT),
            embedding_endpoint: string_or("BAL_EMBEDDING_ENDPOINT", DEFAULT_EMBEDDING_ENDPOINT),
            embedding_model: string_or("BAL_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            generation: GenerationParams::default(),
            corpus_dir: PathBuf::from(string_or("BAL_CORPUS_DIR", "data/literature")),
            index_cache_dir: lookup("BAL_INDEX_CACHE_DIR")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            chunk_size: parse_or(&lookup, "BAL_CHUNK_SIZE", 500)?,
            chunk_overlap: parse_or(&lookup, "BAL_CHUNK_OVERLAP", 100)?,
            top_k: parse_or(&lookup, "BAL_TOP_K", 3)?,
            max_iterations: parse_or(&lookup, "BAL_MAX_ITERATIONS", 15)?,
            http_timeout: Duration::from_secs(parse_or(&lookup, "BAL_HTTP_TIMEOUT_SECS", 20)?),
            llm_timeout: Duration::from_secs(parse_or(&lookup, "BAL_LLM_TIMEOUT_SECS", 60)?),
            pubmed_base_url: string_or("BAL_PUBMED_BASE_URL", DEFAULT_PUBMED_BASE_URL),
            ncbi_api_key: lookup("NCBI_API_KEY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            uniprot_base_url: string_or("BAL_UNIPROT_BASE_URL", DEFAULT_UNIPROT_BASE_URL),
            clinical_trials_base_url: string_or(
                "BAL_CLINICAL_TRIALS_BASE_URL",
                DEFAULT_CLINICAL_TRIALS_BASE_URL,
            ),
        };
        cfg.validate()?;

        tracing::debug!(config = ?cfg, "configuration loaded");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.chunk_size == 0 {
            return Err(AppError::new(CONFIG_INVALID, "Chunk size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(
                AppError::new(CONFIG_INVALID, "Chunk overlap must be smaller than chunk size")
                    .with_details(format!(
                        "chunk_size={}; chunk_overlap={}",
                        self.chunk_size, self.chunk_overlap
                    )),
            );
        }
        if self.top_k == 0 {
            return Err(AppError::new(CONFIG_INVALID, "Retrieval top_k must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(AppError::new(
                CONFIG_INVALID,
                "Maximum reasoning iterations must be positive",
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v.parse::<T>().map_err(|e| {
            AppError::new(CONFIG_INVALID, "Invalid configuration value")
                .with_details(format!("key={key}; value={v}; err={e}"))
        }),
    }
}
