use std::sync::Arc;

use bal_core::error::AppError;
use serde::Deserialize;

use super::{first_or_na, or_na, Evidence, EvidenceSource};
use crate::http::{get_json, HttpTransport};

const FIELDS: &str = "NCTId,Condition,BriefTitle,Phase,LocationCountry,OverallStatus";
pub const MAX_TRIALS: usize = 5;

#[derive(Debug, Default, Deserialize)]
struct StudiesResponse {
    #[serde(default)]
    studies: Vec<Study>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Study {
    #[serde(default)]
    protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolSection {
    #[serde(default)]
    identification_module: IdentificationModule,
    #[serde(default)]
    status_module: StatusModule,
    #[serde(default)]
    conditions_module: ConditionsModule,
    #[serde(default)]
    design_module: DesignModule,
    #[serde(default)]
    contacts_locations_module: ContactsLocationsModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentificationModule {
    nct_id: Option<String>,
    brief_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusModule {
    overall_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionsModule {
    #[serde(default)]
    conditions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DesignModule {
    #[serde(default)]
    phases: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContactsLocationsModule {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Default, Deserialize)]
struct Location {
    country: Option<String>,
}

fn format_study(study: &Study) -> String {
    let p = &study.protocol_section;
    let country = p
        .contacts_locations_module
        .locations
        .iter()
        .find_map(|l| l.country.as_deref());
    [
        format!("Trial ID: {}", or_na(p.identification_module.nct_id.as_deref())),
        format!("Condition: {}", first_or_na(&p.conditions_module.conditions)),
        format!("Title: {}", or_na(p.identification_module.brief_title.as_deref())),
        format!("Phase: {}", first_or_na(&p.design_module.phases)),
        format!("Country: {}", or_na(country)),
        format!("Status: {}", or_na(p.status_module.overall_status.as_deref())),
    ]
    .join("\n")
}

/// Trial lookup against the ClinicalTrials.gov v2 studies endpoint.
#[derive(Clone)]
pub struct ClinicalTrialsSource {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl ClinicalTrialsSource {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search(&self, query: &str) -> Result<Vec<Study>, AppError> {
        let url = format!("{}/api/v2/studies", self.base_url);
        let page_size = MAX_TRIALS.to_string();
        let resp: StudiesResponse = get_json(
            self.transport.as_ref(),
            "ClinicalTrials.gov",
            &url,
            &[
                ("query.term", query),
                ("pageSize", page_size.as_str()),
                ("format", "json"),
                ("fields", FIELDS),
            ],
        )?;
        let mut studies = resp.studies;
        studies.truncate(MAX_TRIALS);
        Ok(studies)
    }
}

impl EvidenceSource for ClinicalTrialsSource {
    fn source_name(&self) -> &str {
        "ClinicalTrials.gov"
    }

    fn fetch(&self, query: &str) -> Evidence {
        tracing::info!(query, "searching ClinicalTrials.gov");
        match self.search(query.trim()) {
            Ok(studies) if studies.is_empty() => {
                Evidence::no_results("No clinical trials found for this query.")
            }
            Ok(studies) => Evidence::found(
                studies
                    .iter()
                    .map(format_study)
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
            Err(e) => Evidence::unavailable(self.source_name(), &e),
        }
    }
}
