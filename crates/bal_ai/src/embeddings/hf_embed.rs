use std::sync::Arc;

use bal_core::error::AppError;
use serde::Deserialize;

use super::Embedder;
use crate::http::HttpTransport;

/// Sentence embeddings from a Hugging Face feature-extraction endpoint.
#[derive(Clone)]
pub struct HfEmbedder {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    api_token: String,
}

impl HfEmbedder {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: &str, api_token: &str) -> Self {
        Self {
            transport,
            endpoint: endpoint.to_string(),
            api_token: api_token.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureResponse {
    Pooled(Vec<f32>),
    PerToken(Vec<Vec<f32>>),
}

fn mean_pool(rows: Vec<Vec<f32>>) -> Vec<f32> {
    let Some(dims) = rows.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut out = vec![0.0f32; dims];
    let mut summed = 0usize;
    // Rows of another width are skipped and do not count toward the mean.
    for row in rows.iter().filter(|r| r.len() == dims) {
        for (o, x) in out.iter_mut().zip(row) {
            *o += x;
        }
        summed += 1;
    }
    let n = summed as f32;
    for o in out.iter_mut() {
        *o /= n;
    }
    out
}

impl Embedder for HfEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        // Chunking keeps inputs small, but bound the request anyway.
        let inputs: String = input.chars().take(8_000).collect();
        let body = serde_json::json!({
            "inputs": inputs,
            "options": { "wait_for_model": true },
        });

        let resp = self
            .transport
            .post_json(&self.endpoint, Some(&self.api_token), &body)
            .map_err(|e| {
                AppError::new("EMBEDDINGS_FAILED", "Failed to call embeddings endpoint")
                    .with_details(format!("model={model}; {e}"))
                    .with_retryable(true)
            })?;
        if !resp.is_success() {
            return Err(
                AppError::new("EMBEDDINGS_FAILED", "Embeddings request failed")
                    .with_details(format!("model={model}; status={}", resp.status))
                    .with_retryable(resp.status >= 500),
            );
        }

        let parsed: FeatureResponse = serde_json::from_str(&resp.body).map_err(|e| {
            AppError::new("EMBEDDINGS_FAILED", "Failed to decode embeddings response")
                .with_details(e.to_string())
        })?;
        let v = match parsed {
            FeatureResponse::Pooled(v) => v,
            FeatureResponse::PerToken(rows) => mean_pool(rows),
        };
        if v.is_empty() {
            return Err(AppError::new(
                "EMBEDDINGS_FAILED",
                "Embeddings response was empty",
            ));
        }
        Ok(v)
    }
}
