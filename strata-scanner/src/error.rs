use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No targets configured: at least one depth level is required")]
    EmptyTargets,

    #[error("Target at depth {depth} has no selector")]
    MissingSelector { depth: usize },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Other error: {0}")]
    Other(String),
}

/// Failure of a single document fetch. Never fatal to a walk.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            FetchError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
