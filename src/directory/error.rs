use crate::auth::error::AuthError;
use crate::transport::error::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(
        "Fetching a large number of meters is not supported \
         (this would only fetch one page out of {pages})"
    )]
    MultiPageUnsupported { pages: u32 },

    #[error("Failed to parse meter directory response")]
    Parse(#[source] serde_json::Error),
}
