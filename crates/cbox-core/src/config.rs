use serde::{Deserialize, Serialize};

use crate::types::{CipherKind, HashKind, KdfKind};

/// Pipeline defaults (loadable from cryptbox.toml).
///
/// Every field has a default so partial config files work; the struct is
/// the source of the `PrepareOptions` defaults in the crypto crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Symmetric cipher used when none is requested explicitly
    pub cipher: CipherKind,
    /// Key derivation algorithm for the password-based path
    pub kdf: KdfKind,
    /// KDF iteration count (default: 1000)
    pub kdf_iterations: u32,
    /// Configure the cipher for its largest legal key size before derivation
    pub use_largest_key_size: bool,
    /// Configure the cipher for its largest legal block size before derivation
    pub use_largest_block_size: bool,
    /// Length of the salt prefix mixed into the plaintext (0 = no prefix).
    /// Must match between the encrypting and decrypting side; it is not
    /// recorded in the ciphertext.
    pub salt_prefix_len: usize,
    /// Hash algorithm for the digest facade
    pub hash: HashKind,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            cipher: CipherKind::default(),
            kdf: KdfKind::default(),
            kdf_iterations: 1000,
            use_largest_key_size: false,
            use_largest_block_size: false,
            salt_prefix_len: 0,
            hash: HashKind::default(),
        }
    }
}
