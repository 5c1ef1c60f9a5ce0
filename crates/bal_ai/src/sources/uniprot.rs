use std::sync::Arc;

use bal_core::error::AppError;
use serde::Deserialize;

use super::{or_na, Evidence, EvidenceSource, NOT_AVAILABLE};
use crate::http::{get_json, HttpTransport};

const FIELDS: &str = "accession,id,protein_name,gene_names,organism_name,length,cc_function";

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<UniProtEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniProtEntry {
    primary_accession: Option<String>,
    #[serde(rename = "uniProtkbId")]
    uniprotkb_id: Option<String>,
    protein_description: Option<ProteinDescription>,
    #[serde(default)]
    genes: Vec<Gene>,
    organism: Option<Organism>,
    sequence: Option<Sequence>,
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProteinDescription {
    recommended_name: Option<ProteinName>,
    #[serde(default)]
    submission_names: Vec<ProteinName>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProteinName {
    full_name: Option<ValueField>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueField {
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Gene {
    gene_name: Option<ValueField>,
    #[serde(default)]
    synonyms: Vec<ValueField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organism {
    scientific_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Sequence {
    length: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Comment {
    comment_type: Option<String>,
    #[serde(default)]
    texts: Vec<ValueField>,
}

impl UniProtEntry {
    fn protein_name(&self) -> Option<&str> {
        let desc = self.protein_description.as_ref()?;
        desc.recommended_name
            .iter()
            .chain(desc.submission_names.iter())
            .find_map(|n| n.full_name.as_ref()?.value.as_deref())
    }

    fn gene_names(&self) -> Option<String> {
        let gene = self.genes.first()?;
        let names: Vec<&str> = gene
            .gene_name
            .iter()
            .chain(gene.synonyms.iter())
            .filter_map(|v| v.value.as_deref())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join(", "))
        }
    }

    fn function(&self) -> Option<&str> {
        self.comments
            .iter()
            .filter(|c| c.comment_type.as_deref() == Some("FUNCTION"))
            .find_map(|c| c.texts.first()?.value.as_deref())
    }
}

/// Protein/gene lookup against the UniProtKB search API. Only the top-ranked
/// entry is reported.
#[derive(Clone)]
pub struct UniProtSource {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl UniProtSource {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search(&self, query: &str) -> Result<Option<UniProtEntry>, AppError> {
        let url = format!("{}/uniprotkb/search", self.base_url);
        let resp: SearchResponse = get_json(
            self.transport.as_ref(),
            "UniProt",
            &url,
            &[
                ("query", query),
                ("format", "json"),
                ("size", "1"),
                ("fields", FIELDS),
            ],
        )?;
        Ok(resp.results.into_iter().next())
    }
}

fn format_entry(top: &UniProtEntry) -> String {
    let length = top
        .sequence
        .as_ref()
        .and_then(|s| s.length)
        .map(|l| format!("{l} aa"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let genes = top.gene_names();
    let organism = top.organism.as_ref().and_then(|o| o.scientific_name.as_deref());

    let lines = [
        format!("UniProt ID: {}", or_na(top.primary_accession.as_deref())),
        format!("Entry Name: {}", or_na(top.uniprotkb_id.as_deref())),
        format!("Protein Name: {}", or_na(top.protein_name())),
        format!("Gene Names: {}", or_na(genes.as_deref())),
        format!("Organism: {}", or_na(organism)),
        format!("Length: {length}"),
        format!("Function: {}", or_na(top.function())),
    ];
    lines.join("\n")
}

impl EvidenceSource for UniProtSource {
    fn source_name(&self) -> &str {
        "UniProt"
    }

    fn fetch(&self, query: &str) -> Evidence {
        tracing::info!(query, "searching UniProt");
        match self.search(query.trim()) {
            Ok(Some(top)) => Evidence::found(format_entry(&top)),
            Ok(None) => Evidence::no_results("No results found in UniProt for this query."),
            Err(e) => Evidence::unavailable(self.source_name(), &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_submission_name_and_joins_synonyms() {
        let entry: UniProtEntry = serde_json::from_str(
            r#"{
                "primaryAccession": "Q08722",
                "proteinDescription": {
                    "submissionNames": [{"fullName": {"value": "CD47 antigen"}}]
                },
                "genes": [{"geneName": {"value": "CD47"}, "synonyms": [{"value": "MER6"}]}],
                "sequence": {"length": 323}
            }"#,
        )
        .unwrap();
        let text = format_entry(&entry);
        assert!(text.contains("Protein Name: CD47 antigen"));
        assert!(text.contains("Gene Names: CD47, MER6"));
        assert!(text.contains("Length: 323 aa"));
        assert!(text.contains("Organism: N/A"));
        assert!(text.contains("Function: N/A"));
    }

    #[test]
    fn picks_function_comment_only() {
        let entry: UniProtEntry = serde_json::from_str(
            r#"{
                "comments": [
                    {"commentType": "SUBUNIT", "texts": [{"value": "Interacts with SIRPA"}]},
                    {"commentType": "FUNCTION", "texts": [{"value": "Adhesive protein"}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(entry.function(), Some("Adhesive protein"));
    }
}
