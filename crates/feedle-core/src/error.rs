use thiserror::Error;

use crate::models::NormalizedRecord;

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur while fetching,
/// filtering and persisting records. It uses the `thiserror` crate for
/// ergonomic error handling and automatic conversion from underlying library
/// errors.
///
/// # Error Conversion
///
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// # Examples
///
/// ```
/// use feedle_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::NoQueryCriteria)
/// }
///
/// assert!(example().is_err());
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Wraps connection failures, query errors and constraint violations
    /// raised by the record store.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP client request failed for a reason not covered below
    /// (request building, body decoding, TLS).
    #[error("API Client error: {0}")]
    ClientError(String),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network or connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The source answered 429.
    ///
    /// `reset` carries the raw `X-Ratelimit-Reset` header when present.
    #[error("rate limit exceeded, retry after {}", .reset.as_deref().unwrap_or("unknown"))]
    RateLimitExceeded { reset: Option<String> },

    /// Credential exchange failed or the source answered 401.
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// The source answered 403.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The source returned an error payload with a message.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The source returned an unexpected non-200 status.
    #[error("source API returned status {0}")]
    HttpStatus(u16),

    /// A fetch was requested with neither keywords nor a channel.
    #[error("no query criteria: provide keywords or a channel/subreddit")]
    NoQueryCriteria,

    /// The source name is unknown or has no registered client.
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// Configuration error.
    ///
    /// Raised when a fetch profile file is malformed or a fetch config does
    /// not match the client it was handed to.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The run was cancelled before the operation completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is PostgreSQL running?\n   Check DATABASE_URL."
                        .to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::AuthError(msg) => format!(
                "Authentication failed: {}\n   Check REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET.",
                msg
            ),
            AppError::RateLimitExceeded { reset } => match reset {
                Some(reset) => format!(
                    "Source rate limit reached. Retry after {} seconds.",
                    reset
                ),
                None => "Source rate limit reached. Please wait and try again.".to_string(),
            },
            AppError::Forbidden(msg) => format!("Access denied by the source: {}", msg),
            AppError::NetworkError(msg) => format!(
                "Network error: {}\n   Check your internet connection.",
                msg
            ),
            AppError::Timeout(secs) => format!(
                "Request timed out after {} seconds. The source may be slow or unreachable.",
                secs
            ),
            AppError::NoQueryCriteria => {
                "Nothing to fetch: pass --keywords or --subreddits, or define a fetch profile."
                    .to_string()
            }
            AppError::UnsupportedSource(name) => format!(
                "Unknown source '{}'. Supported sources: reddit",
                name
            ),
            AppError::ConfigError(msg) => format!("Configuration error: {}", msg),
            AppError::Cancelled => "Operation cancelled.".to_string(),
            _ => self.to_string(),
        }
    }

    /// Returns true if this error is transient and the operation could
    /// succeed if attempted again later.
    ///
    /// Nothing in the pipeline retries on its own; callers may use this to
    /// decide whether a later run is worthwhile.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_)
            | AppError::Timeout(_)
            | AppError::RateLimitExceeded { .. } => true,
            AppError::HttpStatus(status) => *status >= 500,
            _ => false,
        }
    }

    /// Returns true for the errors produced by a cancelled run.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

/// Error returned by [`SourceClient::fetch`](crate::traits::SourceClient::fetch).
///
/// A fetch can fail after some pages were already retrieved (a cancelled
/// run, a transport error mid-pagination). Those records travel with the
/// error instead of being dropped, so the caller decides what to do with them.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct FetchError {
    /// The error that stopped the fetch.
    #[source]
    pub error: AppError,
    /// Records accumulated before the failure, in fetch order.
    pub partial: Vec<NormalizedRecord>,
}

impl FetchError {
    pub fn new(error: AppError, partial: Vec<NormalizedRecord>) -> Self {
        Self { error, partial }
    }
}

impl From<AppError> for FetchError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            partial: Vec::new(),
        }
    }
}
