use crate::config::ValidationError;
use http::header::InvalidHeaderValue;
use std::io;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum RetryProxyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
}

/// The single way a relay attempt fails. The cause is kept for logging and is
/// never shown to the caller.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("downstream call failed: {0}")]
    DownstreamFailed(#[source] BoxError),
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::DownstreamFailed(Box::new(e))
    }
}

impl From<InvalidHeaderValue> for RelayError {
    fn from(e: InvalidHeaderValue) -> Self {
        RelayError::DownstreamFailed(Box::new(e))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    #[error("invalid status API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("status API call failed: {0}")]
    Request(#[from] reqwest::Error),
}
