use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents every failure a harvesting worker can hit. It uses the
/// `thiserror` crate for ergonomic error handling and automatic conversion from
/// underlying library errors.
///
/// # Error Conversion
///
/// - `std::io::Error` → `AppError::Io`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// Connectors map `reqwest` failures explicitly so that timeouts and connect
/// failures land in their own retryable variants.
///
/// # Examples
///
/// ```no_run
/// use litsweep_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::Generic("Something went wrong".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP client request failed.
    ///
    /// Raised for server errors that survived every retry, and for failures
    /// building the HTTP client itself.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// JSON serialization or deserialization failed.
    ///
    /// Raised when a checkpoint or report cannot be encoded, or when a stored
    /// checkpoint is not valid JSON.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    ///
    /// This error occurs when a configured base URL or a backend-supplied
    /// next-page link cannot be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Reading or writing a checkpoint, report or log file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A backend was selected without the credential it needs.
    #[error("Missing credential for {0}")]
    MissingCredential(String),

    /// Network or connection error.
    ///
    /// This error occurs when a network request fails due to connectivity issues,
    /// DNS resolution failures, or the remote server being unreachable.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    ///
    /// This error occurs when a request takes longer than the configured timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    ///
    /// The backend kept answering 429 after every retry.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// The run was stopped by a cancellation signal.
    #[error("Harvest cancelled")]
    Cancelled,

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ClientError(msg) => {
                if msg.contains("401") || msg.contains("403") {
                    format!(
                        "The backend rejected the credentials: {}\n   Check the API key (and institution token for Scopus).",
                        msg
                    )
                } else if msg.contains("connect") {
                    format!(
                        "Cannot connect to backend: {}\n   Check your internet connection.",
                        msg
                    )
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!("Request timed out after {} seconds.\n   The backend may be overloaded. Run again later to resume.", secs)
            }
            AppError::RateLimitExceeded => {
                "Too many requests. Run again later; progress has been checkpointed.".to_string()
            }
            AppError::MissingCredential(backend) => {
                format!(
                    "No API key configured for {}.\n   Set it in the config file or the matching environment variable.",
                    backend
                )
            }
            AppError::SerializationError(e) => {
                format!(
                    "Corrupt checkpoint or response: {}\n   Use `litsweep reset --backend <name>` to start over.",
                    e
                )
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use litsweep_core::error::AppError;
    ///
    /// // Network errors are retryable
    /// let err = AppError::NetworkError("connection reset".to_string());
    /// assert!(err.is_retryable());
    ///
    /// // Rate limits are retryable (after a delay)
    /// let err = AppError::RateLimitExceeded;
    /// assert!(err.is_retryable());
    ///
    /// // A missing key is NOT retryable
    /// let err = AppError::MissingCredential("IEEE".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::RateLimitExceeded
                | AppError::ClientError(_)
        )
    }
}
