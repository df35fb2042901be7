//! Error handling for the resume ranker

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed rubric: {0}")]
    MalformedRubric(String),

    #[error("Could not extract text from '{document}': {reason}")]
    DocumentExtraction { document: String, reason: String },

    #[error("Scoring service error: {0}")]
    ScoringService(#[from] ScoringServiceError),

    #[error("Aggregation invariant violated: {0}")]
    AggregationInvariant(String),

    #[error("Batch run ended without a ranking: {0}")]
    BatchInterrupted(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

/// Failures of the external text-completion service.
#[derive(Error, Debug)]
pub enum ScoringServiceError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned empty content")]
    EmptyResponse,

    #[error("API key not set; export {0}")]
    MissingApiKey(String),
}

impl ScoringServiceError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ScoringServiceError::Timeout(_) | ScoringServiceError::Http(_) => true,
            ScoringServiceError::Api { status, .. } => *status == 429 || *status >= 500,
            ScoringServiceError::EmptyResponse | ScoringServiceError::MissingApiKey(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RankerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ScoringServiceError::Timeout(30).is_transient());
        assert!(ScoringServiceError::Api { status: 429, message: String::new() }.is_transient());
        assert!(ScoringServiceError::Api { status: 503, message: String::new() }.is_transient());
        assert!(!ScoringServiceError::Api { status: 401, message: String::new() }.is_transient());
        assert!(!ScoringServiceError::EmptyResponse.is_transient());
    }
}
