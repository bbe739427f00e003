use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pattern compile error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure reported by a [`crate::fetcher::PageFetcher`].
///
/// `Transient` failures are retried by the retry policy; `Permanent` ones abort
/// the unit immediately.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transient failure (status {}): {detail}", status.map_or_else(|| "-".to_string(), |s| s.to_string()))]
    Transient { status: Option<u16>, detail: String },

    #[error("HTTP {status} from {url}")]
    Permanent { status: u16, url: String },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transient { status, .. } => *status,
            FetchError::Permanent { status, .. } => Some(*status),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    /// Map an HTTP status to the taxonomy: 408/429/503/504 are worth retrying,
    /// every other error status is final.
    pub fn from_status(status: u16, url: &str) -> Self {
        if crate::config::RETRYABLE_STATUS.contains(&status) {
            FetchError::Transient {
                status: Some(status),
                detail: format!("HTTP {status}"),
            }
        } else {
            FetchError::Permanent {
                status,
                url: url.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transient {
            status: e.status().map(|s| s.as_u16()),
            detail: e.to_string(),
        }
    }
}
