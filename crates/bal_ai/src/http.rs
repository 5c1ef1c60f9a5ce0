use std::time::Duration;

use bal_core::error::{AppError, SOURCE_UNAVAILABLE};
use serde::de::DeserializeOwned;

/// Raw HTTP response. Error statuses are returned here, not as `Err`, so
/// callers decide how to report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP seam shared by every external collaborator.
///
/// `Err` means the request never produced a status (DNS, connect, timeout).
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, AppError>;

    fn post_json(
        &self,
        url: &str,
        bearer_token: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, AppError>;
}

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("bioagentlab/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, AppError> {
        let mut req = self.agent.get(url);
        for (k, v) in query {
            req = req.query(k, v);
        }
        tracing::debug!(url, params = query.len(), "GET");
        into_response(url, req.call())
    }

    fn post_json(
        &self,
        url: &str,
        bearer_token: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, AppError> {
        let mut req = self.agent.post(url);
        if let Some(token) = bearer_token {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }
        tracing::debug!(url, "POST");
        into_response(url, req.send_json(body))
    }
}

fn into_response(
    url: &str,
    resp: Result<ureq::Response, ureq::Error>,
) -> Result<HttpResponse, AppError> {
    match resp {
        Ok(r) => {
            let status = r.status();
            let body = r.into_string().map_err(|e| {
                AppError::new(SOURCE_UNAVAILABLE, "Failed to read response body")
                    .with_details(format!("url={url}; err={e}"))
                    .with_retryable(true)
            })?;
            Ok(HttpResponse { status, body })
        }
        Err(ureq::Error::Status(status, r)) => Ok(HttpResponse {
            status,
            body: r.into_string().unwrap_or_default(),
        }),
        Err(ureq::Error::Transport(t)) => Err(AppError::new(
            SOURCE_UNAVAILABLE,
            "HTTP request did not complete",
        )
        .with_details(format!("url={url}; err={t}"))
        .with_retryable(true)),
    }
}

/// Backoff applied when a source answers 429 Too Many Requests.
///
/// Attempt `n` (zero-based) waits `base_delay * 2^n`. Other statuses are never
/// retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(400),
        }
    }
}

/// Issue a GET and decode a JSON body. Status >= 300 and undecodable bodies
/// are `SOURCE_UNAVAILABLE`.
pub(crate) fn get_json<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    source: &str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, AppError> {
    get_json_retrying(transport, source, url, query, RetryPolicy::NONE)
}

pub(crate) fn get_json_retrying<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    source: &str,
    url: &str,
    query: &[(&str, &str)],
    retry: RetryPolicy,
) -> Result<T, AppError> {
    let resp = get_ok_retrying(transport, source, url, query, retry)?;
    serde_json::from_str(&resp.body).map_err(|e| {
        AppError::new(
            SOURCE_UNAVAILABLE,
            format!("Failed to decode {source} response"),
        )
        .with_details(e.to_string())
    })
}

pub(crate) fn get_ok_retrying(
    transport: &dyn HttpTransport,
    source: &str,
    url: &str,
    query: &[(&str, &str)],
    retry: RetryPolicy,
) -> Result<HttpResponse, AppError> {
    let mut attempt = 0u32;
    let resp = loop {
        let resp = transport.get(url, query)?;
        if resp.status != 429 || attempt >= retry.max_retries {
            break resp;
        }
        let delay = retry.delay_for(attempt);
        attempt += 1;
        tracing::warn!(
            source,
            url,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "rate limited, backing off"
        );
        std::thread::sleep(delay);
    };
    if !resp.is_success() {
        return Err(AppError::new(
            SOURCE_UNAVAILABLE,
            format!("{source} request failed"),
        )
        .with_details(format!("status={}; attempts={}", resp.status, attempt + 1))
        .with_retryable(resp.status >= 500 || resp.status == 429));
    }
    Ok(resp)
}
