use std::fmt;

use bal_core::error::AppError;
use serde::{Deserialize, Serialize};

pub mod clinical_trials;
pub mod pubmed;
pub mod uniprot;

pub use clinical_trials::ClinicalTrialsSource;
pub use pubmed::PubMedSource;
pub use uniprot::UniProtSource;

/// Prefix of evidence text when a source could not be reached.
pub const UNAVAILABLE_MARKER: &str = "[source unavailable]";
/// Prefix of evidence text when a source answered with zero matches.
pub const NO_RESULTS_MARKER: &str = "[no results]";
/// Rendered in place of any field the source did not return.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    Found,
    NoResults,
    Unavailable,
}

/// Normalized output of one source lookup.
///
/// The status is typed for callers; `text` is what the reasoning step reads and
/// always carries the matching marker for the two non-`Found` states.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evidence {
    pub status: EvidenceStatus,
    pub text: String,
}

impl Evidence {
    pub fn found(text: impl Into<String>) -> Self {
        Self {
            status: EvidenceStatus::Found,
            text: text.into(),
        }
    }

    pub fn no_results(message: &str) -> Self {
        Self {
            status: EvidenceStatus::NoResults,
            text: format!("{NO_RESULTS_MARKER} {message}"),
        }
    }

    pub fn unavailable(source: &str, err: &AppError) -> Self {
        tracing::warn!(source, code = %err.code, details = ?err.details, "evidence source unavailable");
        let text = match err.details.as_deref() {
            Some(d) => format!("{UNAVAILABLE_MARKER} {source}: {} ({d})", err.message),
            None => format!("{UNAVAILABLE_MARKER} {source}: {}", err.message),
        };
        Self {
            status: EvidenceStatus::Unavailable,
            text,
        }
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One external (or local) knowledge source.
///
/// `fetch` must not fail: outages and empty result sets are reported through
/// [`Evidence`] so one dead source never aborts a reasoning session.
pub trait EvidenceSource: Send + Sync {
    fn source_name(&self) -> &str;

    fn fetch(&self, query: &str) -> Evidence;
}

pub(crate) fn or_na(v: Option<&str>) -> &str {
    match v {
        Some(s) if !s.trim().is_empty() => s,
        _ => NOT_AVAILABLE,
    }
}

pub(crate) fn first_or_na(v: &[String]) -> &str {
    or_na(v.first().map(String::as_str))
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
