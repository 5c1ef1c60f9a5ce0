use std::sync::Arc;

use bal_core::config::GenerationParams;
use bal_core::error::AppError;
use serde::Deserialize;

use super::{truncate_at_stop, Llm};
use crate::http::HttpTransport;

/// Text generation through a Hugging Face inference endpoint.
#[derive(Clone)]
pub struct HfLlm {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    api_token: String,
    params: GenerationParams,
}

impl HfLlm {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        endpoint: &str,
        api_token: &str,
        params: GenerationParams,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.to_string(),
            api_token: api_token.to_string(),
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Batch(Vec<Generation>),
    Single(Generation),
    Failure { error: String },
}

impl Llm for HfLlm {
    fn generate(&self, prompt: &str, stop: &[&str]) -> Result<String, AppError> {
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "temperature": self.params.temperature,
                "max_new_tokens": self.params.max_new_tokens,
                "repetition_penalty": self.params.repetition_penalty,
                "return_full_text": false,
                "stop": stop,
            },
            "options": { "wait_for_model": true },
        });

        let resp = self
            .transport
            .post_json(&self.endpoint, Some(&self.api_token), &body)
            .map_err(|e| {
                AppError::new("LLM_REQUEST_FAILED", "Failed to call language model endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true)
            })?;
        if !resp.is_success() {
            return Err(
                AppError::new("LLM_REQUEST_FAILED", "Language model request failed")
                    .with_details(format!("status={}", resp.status))
                    .with_retryable(resp.status >= 500 || resp.status == 429),
            );
        }

        let parsed: GenerateResponse = serde_json::from_str(&resp.body).map_err(|e| {
            AppError::new("LLM_REQUEST_FAILED", "Failed to decode language model response")
                .with_details(e.to_string())
        })?;
        let text = match parsed {
            GenerateResponse::Batch(mut gens) if !gens.is_empty() => gens.swap_remove(0).generated_text,
            GenerateResponse::Single(g) => g.generated_text,
            GenerateResponse::Failure { error } => {
                return Err(AppError::new("LLM_REQUEST_FAILED", "Language model returned an error")
                    .with_details(error));
            }
            GenerateResponse::Batch(_) => String::new(),
        };

        let text = truncate_at_stop(&text, stop).trim_end().to_string();
        if text.trim().is_empty() {
            return Err(AppError::new(
                "LLM_REQUEST_FAILED",
                "Language model response was empty",
            ));
        }
        Ok(text)
    }
}
