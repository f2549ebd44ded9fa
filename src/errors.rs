/*!
 * Error types for the doc-mt application.
 *
 * Library code reports failures through these thiserror enums; the binary
 * and the storage internals use anyhow and convert at the boundary.
 */

use thiserror::Error;

/// Errors that can occur when talking to a translation backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend returned a different number of results than it was sent
    #[error("Backend returned {received} translations for {expected} sources")]
    ResponseMismatch {
        /// Number of source strings sent
        expected: usize,
        /// Number of translations received
        received: usize,
    },
}

impl ProviderError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors that can occur during document translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The caller sent something that cannot be processed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error from the backend
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The document lock could not be acquired in time
    #[error("Timed out waiting for document lock: {0}")]
    LockTimeout(String),

    /// Error reading or writing the translation store
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TranslationError {
    /// Shorthand for an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Whether this is a caller error
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(error: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", error))
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
