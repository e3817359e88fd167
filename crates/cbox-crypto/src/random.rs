//! Random material helpers: fresh salts and IVs
//!
//! The pipeline never requires salts or IVs to be random (callers may pass
//! fixed values and take the consequences); these helpers are the safe
//! default for callers that don't need a specific value.

use rand::RngCore;

use cbox_core::{CboxResult, CipherKind};

use crate::cipher::SymmetricCipher;
use crate::MIN_SALT_BYTES;

/// Fill `buf` from the thread-local CSPRNG.
pub fn fill_random(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}

/// `n` fresh random bytes.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    fill_random(&mut buf);
    buf
}

/// A fresh random salt of `len` bytes; rejects lengths below the
/// pipeline's minimum.
pub fn fresh_salt(len: usize) -> CboxResult<Vec<u8>> {
    if len < MIN_SALT_BYTES {
        return Err(cbox_core::CboxError::WeakSalt {
            len,
            min: MIN_SALT_BYTES,
        });
    }
    Ok(random_bytes(len))
}

/// A fresh random IV sized to `kind`'s block size.
pub fn fresh_iv_for(kind: CipherKind) -> CboxResult<Vec<u8>> {
    let cipher = SymmetricCipher::resolve(kind)?;
    Ok(random_bytes(cipher.block_size_bits() / 8))
}
