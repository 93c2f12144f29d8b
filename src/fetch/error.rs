use thiserror::Error;

/// Why a fetch failed.
///
/// Cloneable: one in-flight result is handed to every caller attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response
    #[error("transport failure: {0}")]
    Transport(String),
    /// The server answered with a non-2xx status
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },
    /// The response body did not have the expected shape
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            FetchError::Status { status: status.as_u16(), url }
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}
