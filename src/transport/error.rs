use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network request failed for {url}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("HTTP request failed for {url} with status {status} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
        body: String,
    },

    #[error("Failed to read response body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// Status code of the failed response, if the failure was an HTTP error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
