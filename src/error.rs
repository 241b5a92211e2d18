use thiserror::Error;

/// Type alias for Result with TriageError
pub type Result<T> = std::result::Result<T, TriageError>;

/// Error types for the mail triage dashboard
#[derive(Error, Debug)]
pub enum TriageError {
    /// Configuration error (missing or malformed OAuth settings) - fatal at startup
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Authentication failed (token exchange, denied consent, expired session)
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Record lookup by unknown id - recovered by the caller, never shown in the UI
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Analysis backend returned 5xx
    #[error("Feed server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Analysis feed delivered a payload that does not match the record schema
    #[error("Malformed feed payload: {0}")]
    FeedFormatError(String),

    /// IO error (session cache, config file, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl TriageError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TriageError::RateLimitExceeded { .. }
                | TriageError::ServerError { .. }
                | TriageError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Map a non-success HTTP status from the analysis backend into the taxonomy
    ///
    /// 401/403 mean the session token was rejected upstream; the caller is
    /// expected to drop back to the login view rather than retry.
    pub fn from_feed_status(status: u16, retry_after: Option<u64>, message: String) -> Self {
        const DEFAULT_RETRY_AFTER: u64 = 5;

        match status {
            401 | 403 => TriageError::AuthError(message),
            404 => TriageError::FeedFormatError(format!("feed endpoint missing: {}", message)),
            429 => TriageError::RateLimitExceeded {
                retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
            },
            500..=599 => TriageError::ServerError { status, message },
            _ => TriageError::FeedFormatError(message),
        }
    }
}

impl From<reqwest::Error> for TriageError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TriageError::NetworkError(format!("Request timed out: {}", error))
        } else if error.is_connect() {
            TriageError::NetworkError(format!("Connection error: {}", error))
        } else if error.is_decode() {
            TriageError::FeedFormatError(error.to_string())
        } else {
            TriageError::NetworkError(error.to_string())
        }
    }
}
