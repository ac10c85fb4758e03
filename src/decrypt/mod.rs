//! Decryption of provider-delivered files.
//!
//! Enedis exports delivered over e-mail or FTP are AES-CBC encrypted, laid
//! out as a 16-byte initialization vector followed by the ciphertext. The key
//! is communicated as a hex string whose length selects the AES variant
//! (128, 192 or 256 bits). No unpadding is applied: the raw decrypted bytes,
//! padding included, match the provider's delivered format, and unwrapping
//! the inner envelope is left to the caller.
//!
//! This module is standalone: it never touches the network and shares no
//! state with the API session.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

pub mod error;

use error::DecryptError;

const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Decrypts `input` (layout: `IV || ciphertext`) with the hex-encoded `key`
/// and writes the plaintext to `output`, overwriting any existing file.
///
/// Returns the output path for chaining.
///
/// # Errors
///
/// * [`DecryptError::TruncatedInput`] if the file cannot hold a 16-byte IV.
/// * [`DecryptError::KeyDecode`] / [`DecryptError::UnsupportedKeyLength`] if
///   the key is not valid hex or not an AES key size.
/// * [`DecryptError::MisalignedCiphertext`] if the ciphertext is not a whole
///   number of AES blocks.
pub fn decrypt_file(
    input: impl AsRef<Path>,
    key: &str,
    output: impl AsRef<Path>,
) -> Result<PathBuf, DecryptError> {
    let input = input.as_ref();
    let output = output.as_ref();

    let content = fs::read(input).map_err(|e| DecryptError::Read(input.to_path_buf(), e))?;
    if content.len() < IV_LEN {
        return Err(DecryptError::TruncatedInput {
            path: input.to_path_buf(),
            len: content.len(),
        });
    }
    let key = hex::decode(key).map_err(DecryptError::KeyDecode)?;

    let (iv, ciphertext) = content.split_at(IV_LEN);
    let plaintext = cbc_decrypt(&key, iv, ciphertext)?;

    fs::write(output, &plaintext).map_err(|e| DecryptError::Write(output.to_path_buf(), e))?;
    info!(
        "decrypted {} ({} bytes) into {}",
        input.display(),
        plaintext.len(),
        output.display()
    );
    Ok(output.to_path_buf())
}

fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
    if ciphertext.len() % BLOCK_LEN != 0 {
        return Err(DecryptError::MisalignedCiphertext {
            len: ciphertext.len(),
        });
    }
    let misaligned = |_| DecryptError::MisalignedCiphertext {
        len: ciphertext.len(),
    };
    let bad_key = |_| DecryptError::UnsupportedKeyLength { bytes: key.len() };

    match key.len() {
        16 => Aes128CbcDec::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .map_err(misaligned),
        24 => Aes192CbcDec::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .map_err(misaligned),
        32 => Aes256CbcDec::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .map_err(misaligned),
        bytes => Err(DecryptError::UnsupportedKeyLength { bytes }),
    }
}
