use crate::transport::error::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to parse token response")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to load credentials from environment: {0}")]
    Env(String),
}
