use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("Failed to read encrypted file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write decrypted file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Encrypted file '{path}' is too short to carry an initialization vector ({len} bytes)")]
    TruncatedInput { path: PathBuf, len: usize },

    #[error("Decryption key is not valid hexadecimal")]
    KeyDecode(#[source] hex::FromHexError),

    #[error("Decryption key must be 16, 24 or 32 bytes, got {bytes}")]
    UnsupportedKeyLength { bytes: usize },

    #[error("Ciphertext length {len} is not a multiple of the AES block size")]
    MisalignedCiphertext { len: usize },
}
