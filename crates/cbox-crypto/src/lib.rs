//! cbox-crypto: password-derived symmetric encryption pipeline
//!
//! Pipeline: password + salt → KDF stream → key ‖ IV → CBC cipher → PKCS7
//!
//! ```text
//! prepare_from_password / prepare_raw
//!   ├── KeyDeriver {Rfc2898, Legacy, Identity}   (kdf)
//!   ├── valid_key_for / valid_iv_for             (normalize)
//!   └── SymmetricCipher size tables              (cipher)
//!         └── CipherParams {kind, key, iv}
//! encrypt / decrypt (bytes, streams, base64, files)
//!   └── StreamEncryptor / StreamDecryptor        (stream)
//! ```
//!
//! Salted framing: `ciphertext = CBC(salt ++ plaintext)` — the salt is
//! mixed into the plaintext before encryption, not written in clear, and
//! its length must be agreed out-of-band by both sides.

pub mod asymmetric;
pub mod cipher;
pub mod hash;
pub mod kdf;
pub mod normalize;
pub mod pipeline;
pub mod random;
pub mod stream;

pub use cbox_core::{CboxError, CboxResult, CipherKind, CryptoConfig, HashKind, KdfKind};

pub use cipher::{CipherParams, SymmetricCipher};
pub use hash::HashAlgorithm;
pub use kdf::KeyDeriver;
pub use pipeline::{
    decrypt, decrypt_file, decrypt_from_base64, decrypt_stream, encrypt, encrypt_file,
    encrypt_stream, encrypt_to_base64, encrypt_with_salt, prepare_from_passphrase,
    prepare_from_password, prepare_raw, PrepareOptions,
};
pub use stream::{StreamDecryptor, StreamEncryptor};

/// Minimum password length accepted by the password-based preparation path
pub const MIN_PASSWORD_BYTES: usize = 8;

/// Minimum salt length accepted by the password-based preparation path
pub const MIN_SALT_BYTES: usize = 8;

/// Default KDF iteration count
pub const DEFAULT_KDF_ITERATIONS: u32 = 1000;

/// Chunk size for buffered stream copies
pub const COPY_BUF_LEN: usize = 1024;
