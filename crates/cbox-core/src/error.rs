use thiserror::Error;

use crate::types::CipherKind;

pub type CboxResult<T> = Result<T, CboxError>;

/// Errors raised by the cryptbox crates.
///
/// All variants are raised at the point of detection and never retried
/// internally; these are deterministic input-validation or integrity
/// failures, not transient conditions.
#[derive(Debug, Error)]
pub enum CboxError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("password too short: {len} bytes (minimum {min})")]
    WeakPassword { len: usize, min: usize },

    #[error("salt too short: {len} bytes (minimum {min})")]
    WeakSalt { len: usize, min: usize },

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cipher handle is {actual} but {expected} was requested")]
    AlgorithmMismatch {
        expected: CipherKind,
        actual: CipherKind,
    },

    #[error("key derivation was not initialized before use")]
    NotInitialized,

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("payload too large: {len} bytes (maximum {max} for this key size)")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
