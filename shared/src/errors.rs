/// Unified error types for Stickerpull.
use thiserror::Error;

/// Top-level error type for Stickerpull operations.
#[derive(Debug, Error)]
pub enum StickerError {
    #[error("Sticker pack '{pack}' not found: {description}")]
    PackNotFound { pack: String, description: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bot API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Conversion error: {0}")]
    Conversion(String),
}

/// Errors raised by a single Bot API round trip.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with `ok: false`.
    #[error("{method} rejected ({code:?}): {description}")]
    Rejected {
        method: String,
        code: Option<i32>,
        description: String,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            ApiError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            ApiError::Status(code) => is_retriable_status(*code),
            ApiError::Rejected { code, .. } => matches!(code, Some(429) | Some(500..=599)),
            ApiError::Decode(_) => false,
        }
    }
}

/// 429 and 5xx are worth another attempt, everything else is final.
pub fn is_retriable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Why one asset of a batch did not end up on disk.
///
/// Carried as data inside a fetch report; never aborts sibling assets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetFailure {
    #[error("file metadata lookup failed: {0}")]
    MetadataLookup(String),

    #[error("download returned HTTP {0}")]
    HttpStatus(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl AssetFailure {
    /// Short machine-readable tag for logs and summaries.
    pub fn code(&self) -> &'static str {
        match self {
            AssetFailure::MetadataLookup(_) => "METADATA_LOOKUP",
            AssetFailure::HttpStatus(_) => "HTTP_STATUS",
            AssetFailure::Network(_) => "NETWORK",
            AssetFailure::Write(_) => "WRITE",
            AssetFailure::Cancelled => "CANCELLED",
            AssetFailure::DeadlineExceeded => "DEADLINE",
        }
    }

    /// Whether the asset was never attempted to completion because the batch stopped.
    pub fn is_interruption(&self) -> bool {
        matches!(self, AssetFailure::Cancelled | AssetFailure::DeadlineExceeded)
    }
}

/// Result type alias for Stickerpull operations.
pub type StickerResult<T> = Result<T, StickerError>;
