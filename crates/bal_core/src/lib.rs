pub mod config;
pub mod error;

#[cfg(test)]
mod tests {
    use super::error::AppError;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("SOURCE_UNAVAILABLE", "UniProt request failed")
            .with_details("status=503")
            .with_retryable(true);
        assert_eq!(err.code, "SOURCE_UNAVAILABLE");
        assert_eq!(err.to_string(), "[SOURCE_UNAVAILABLE] UniProt request failed (status=503)");
        assert!(err.retryable);
    }
}
