use thiserror::Error;

/// Failure to obtain a usable volume series for one pair. Never aborts a scan.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
}

impl FetchError {
    /// Whether the call reached the provider and therefore consumed quota
    pub fn consumed_quota(&self) -> bool {
        matches!(self, FetchError::Status { .. } | FetchError::Malformed(_))
    }
}

/// Failure that aborts the whole run
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("pair source failed: {0}")]
    PairSource(String),

    #[error("scan failed: {0}")]
    Internal(String),
}

/// Failure to deliver the run report. Logged only.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification channel returned {status}: {body}")]
    Status { status: u16, body: String },
}
