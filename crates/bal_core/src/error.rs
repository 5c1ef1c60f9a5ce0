use serde::{Deserialize, Serialize};
use std::fmt;

/// Network or HTTP failure from an external evidence source.
pub const SOURCE_UNAVAILABLE: &str = "SOURCE_UNAVAILABLE";
/// The language model errored or produced output that is not a valid action.
pub const REASONING_FAILED: &str = "REASONING_FAILED";
/// The reasoning loop hit its iteration bound without a final answer.
pub const REASONING_ITERATION_LIMIT: &str = "REASONING_ITERATION_LIMIT";
pub const CONFIG_MISSING_CREDENTIAL: &str = "CONFIG_MISSING_CREDENTIAL";
pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
pub const TOOL_DUPLICATE_NAME: &str = "TOOL_DUPLICATE_NAME";
pub const TOOL_INVALID_NAME: &str = "TOOL_INVALID_NAME";
pub const PROMPT_TEMPLATE_NOT_FOUND: &str = "PROMPT_TEMPLATE_NOT_FOUND";

/// Single structured error shape used across the workspace.
///
/// Callers match on `code`; `message` is human-readable and `details` carries
/// the low-level cause (status codes, paths, upstream error text).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    /// Wrap any error as a reasoning failure, keeping the upstream code in the details.
    pub fn into_reasoning_failure(self, message: impl Into<String>) -> Self {
        if self.is(REASONING_FAILED) || self.is(REASONING_ITERATION_LIMIT) {
            return self;
        }
        let details = match self.details.as_deref() {
            Some(d) => format!("{}: {}; {}", self.code, self.message, d),
            None => format!("{}: {}", self.code, self.message),
        };
        AppError::new(REASONING_FAILED, message)
            .with_details(details)
            .with_retryable(self.retryable)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(d) = self.details.as_deref() {
            write!(f, " ({d})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
