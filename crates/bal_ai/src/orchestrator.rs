//! Wires configuration into tools, the model client and the reasoning engine.

use std::sync::Arc;

use bal_core::config::AppConfig;
use bal_core::error::AppError;

use crate::agent::{AnswerTrace, ReasoningEngine};
use crate::embeddings::hf_embed::HfEmbedder;
use crate::http::{HttpTransport, UreqTransport};
use crate::index::{IndexCache, IndexSettings, RetrievalIndex};
use crate::llm::hf_llm::HfLlm;
use crate::llm::Llm;
use crate::prompts::{load_prompt_template, render_template, DEFAULT_TEMPLATE};
use crate::sources::{ClinicalTrialsSource, PubMedSource, UniProtSource};
use crate::tools::{ToolDescriptor, ToolRegistry};

pub const PUBMED_DESCRIPTION: &str =
    "Useful for retrieving abstracts from PubMed. Input should be a biomedical topic or gene.";
pub const UNIPROT_DESCRIPTION: &str =
    "Provides protein and gene target information from UniProt database.";
pub const CLINICAL_TRIALS_DESCRIPTION: &str =
    "Searches ClinicalTrials.gov for current trials related to the input query.";
pub const RAG_DESCRIPTION: &str =
    "Retrieves vector-embedded biomedical literature related to the query for synthesis.";

/// Register the default tools in their fixed order. The local index tool is
/// only present when an index was built.
pub fn build_registry(
    cfg: &AppConfig,
    transport: Arc<dyn HttpTransport>,
    index: Option<RetrievalIndex>,
) -> Result<ToolRegistry, AppError> {
    let mut registry = ToolRegistry::new();
    registry.register(ToolDescriptor::new(
        "PubMed",
        PUBMED_DESCRIPTION,
        PubMedSource::new(transport.clone(), &cfg.pubmed_base_url)
            .with_api_key(cfg.ncbi_api_key.clone()),
    ))?;
    registry.register(ToolDescriptor::new(
        "UniProt",
        UNIPROT_DESCRIPTION,
        UniProtSource::new(transport.clone(), &cfg.uniprot_base_url),
    ))?;
    registry.register(ToolDescriptor::new(
        "ClinicalTrials",
        CLINICAL_TRIALS_DESCRIPTION,
        ClinicalTrialsSource::new(transport, &cfg.clinical_trials_base_url),
    ))?;
    if let Some(index) = index {
        registry.register(ToolDescriptor::new("BiomedicalRAG", RAG_DESCRIPTION, index))?;
    }
    Ok(registry)
}

/// Build the local retrieval index from `cfg.corpus_dir`, reusing cached
/// embeddings when a cache directory is configured.
pub fn build_index(cfg: &AppConfig, transport: Arc<dyn HttpTransport>) -> Result<RetrievalIndex, AppError> {
    let settings = IndexSettings::from_config(cfg)?;
    let embedder = Arc::new(HfEmbedder::new(
        transport,
        &cfg.embedding_endpoint,
        &cfg.api_token,
    ));
    let cache = cfg.index_cache_dir.clone().map(IndexCache::open);
    RetrievalIndex::build_from_dir(&cfg.corpus_dir, embedder, &settings, cache.as_ref())
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub template: String,
    pub use_index: bool,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            use_index: true,
        }
    }
}

/// Entry point for one query: template, then reasoning over the registry.
pub struct BioAgent {
    registry: ToolRegistry,
    llm: Box<dyn Llm>,
    template: &'static str,
    max_iterations: usize,
}

impl BioAgent {
    pub fn new(
        registry: ToolRegistry,
        llm: Box<dyn Llm>,
        template_name: &str,
        max_iterations: usize,
    ) -> Result<Self, AppError> {
        Ok(Self {
            registry,
            llm,
            template: load_prompt_template(template_name)?,
            max_iterations,
        })
    }

    pub fn from_config(cfg: &AppConfig, opts: &AgentOptions) -> Result<Self, AppError> {
        // Resolve the template before spending time on the index build.
        load_prompt_template(&opts.template)?;

        let sources: Arc<dyn HttpTransport> = Arc::new(UreqTransport::new(cfg.http_timeout));
        let models: Arc<dyn HttpTransport> = Arc::new(UreqTransport::new(cfg.llm_timeout));

        let index = if opts.use_index {
            Some(build_index(cfg, models.clone())?)
        } else {
            tracing::info!("local retrieval index disabled");
            None
        };
        let registry = build_registry(cfg, sources, index)?;
        let llm = HfLlm::new(models, &cfg.llm_endpoint, &cfg.api_token, cfg.generation.clone());

        Self::new(registry, Box::new(llm), &opts.template, cfg.max_iterations)
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn run(&self, query: &str) -> Result<AnswerTrace, AppError> {
        let question = render_template(self.template, query);
        tracing::info!(
            tools = ?self.registry.tool_names(),
            max_iterations = self.max_iterations,
            "running query"
        );
        ReasoningEngine::new(self.llm.as_ref(), self.max_iterations).answer(&question, &self.registry)
    }
}
