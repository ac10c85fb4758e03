use crate::auth::error::AuthError;
use crate::decrypt::error::DecryptError;
use crate::directory::error::DirectoryError;
use crate::metering::error::MeteringError;
use crate::transport::error::TransportError;
use thiserror::Error;

/// Top-level error for the crate; every module error converts into it.
#[derive(Debug, Error)]
pub enum EnedisError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Metering(#[from] MeteringError),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),
}
