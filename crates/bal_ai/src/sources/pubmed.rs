use std::sync::Arc;

use bal_core::error::{AppError, SOURCE_UNAVAILABLE};
use serde::Deserialize;

use super::{or_na, truncate_chars, Evidence, EvidenceSource, NOT_AVAILABLE};
use crate::http::{get_json_retrying, get_ok_retrying, HttpTransport, RetryPolicy};

pub const DEFAULT_MAX_ARTICLES: usize = 3;
pub const DEFAULT_MAX_ABSTRACT_CHARS: usize = 2000;

#[derive(Debug, Default, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: ESearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ESummaryResponse {
    #[serde(default)]
    result: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ArticleSummary {
    title: Option<String>,
    pubdate: Option<String>,
    fulljournalname: Option<String>,
    source: Option<String>,
}

#[derive(Debug)]
struct Article {
    pmid: String,
    summary: ArticleSummary,
    abstract_text: Option<String>,
}

/// Literature search against NCBI E-utilities (esearch → esummary → efetch).
#[derive(Clone)]
pub struct PubMedSource {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    max_articles: usize,
    max_abstract_chars: usize,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl PubMedSource {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_articles: DEFAULT_MAX_ARTICLES,
            max_abstract_chars: DEFAULT_MAX_ABSTRACT_CHARS,
            api_key: None,
            retry: RetryPolicy::default(),
        }
    }

    /// NCBI key; raises the E-utilities rate limit from 3 to 10 requests per second.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn params<'a>(&'a self, base: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut out = base.to_vec();
        if let Some(key) = self.api_key.as_deref() {
            out.push(("api_key", key));
        }
        out
    }

    pub fn with_limits(mut self, max_articles: usize, max_abstract_chars: usize) -> Self {
        self.max_articles = max_articles.max(1);
        self.max_abstract_chars = max_abstract_chars.max(1);
        self
    }

    fn search_ids(&self, query: &str) -> Result<Vec<String>, AppError> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let retmax = self.max_articles.to_string();
        let resp: ESearchResponse = get_json_retrying(
            self.transport.as_ref(),
            "PubMed",
            &url,
            &self.params(&[
                ("db", "pubmed"),
                ("term", query),
                ("retmax", retmax.as_str()),
                ("retmode", "json"),
                ("sort", "relevance"),
            ]),
            self.retry,
        )?;
        let mut ids = resp.esearchresult.idlist;
        ids.truncate(self.max_articles);
        Ok(ids)
    }

    fn summaries(&self, ids: &[String]) -> Result<ESummaryResponse, AppError> {
        let url = format!("{}/esummary.fcgi", self.base_url);
        let joined = ids.join(",");
        get_json_retrying(
            self.transport.as_ref(),
            "PubMed",
            &url,
            &self.params(&[("db", "pubmed"), ("id", joined.as_str()), ("retmode", "json")]),
            self.retry,
        )
    }

    fn abstract_for(&self, pmid: &str) -> Result<String, AppError> {
        let url = format!("{}/efetch.fcgi", self.base_url);
        let resp = get_ok_retrying(
            self.transport.as_ref(),
            "PubMed",
            &url,
            &self.params(&[
                ("db", "pubmed"),
                ("id", pmid),
                ("rettype", "abstract"),
                ("retmode", "text"),
            ]),
            self.retry,
        )?;
        let text = resp.body.trim();
        if text.is_empty() {
            return Err(AppError::new(SOURCE_UNAVAILABLE, "PubMed returned an empty abstract")
                .with_details(format!("pmid={pmid}")));
        }
        Ok(truncate_chars(text, self.max_abstract_chars))
    }

    fn collect(&self, query: &str) -> Result<Vec<Article>, AppError> {
        let ids = self.search_ids(query)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let summaries = self.summaries(&ids)?;

        let mut out = Vec::with_capacity(ids.len());
        for pmid in ids {
            let summary = summaries
                .result
                .get(&pmid)
                .cloned()
                .and_then(|v| serde_json::from_value::<ArticleSummary>(v).ok())
                .unwrap_or_default();
            // A missing abstract degrades one article, not the whole lookup.
            let abstract_text = match self.abstract_for(&pmid) {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::warn!(pmid = %pmid, error = %e, "abstract fetch failed");
                    None
                }
            };
            out.push(Article {
                pmid,
                summary,
                abstract_text,
            });
        }
        Ok(out)
    }
}

fn format_article(a: &Article) -> String {
    let journal = a
        .summary
        .fulljournalname
        .as_deref()
        .or(a.summary.source.as_deref());
    format!(
        "Published: {}\nTitle: {}\nJournal: {}\nPMID: {}\nSummary:\n{}",
        or_na(a.summary.pubdate.as_deref()),
        or_na(a.summary.title.as_deref()),
        or_na(journal),
        a.pmid,
        a.abstract_text.as_deref().unwrap_or(NOT_AVAILABLE),
    )
}

impl EvidenceSource for PubMedSource {
    fn source_name(&self) -> &str {
        "PubMed"
    }

    fn fetch(&self, query: &str) -> Evidence {
        tracing::info!(query, "searching PubMed");
        match self.collect(query.trim()) {
            Ok(articles) if articles.is_empty() => {
                Evidence::no_results("No PubMed articles matched this query.")
            }
            Ok(articles) => Evidence::found(
                articles
                    .iter()
                    .map(format_article)
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
            Err(e) => Evidence::unavailable(self.source_name(), &e),
        }
    }
}
