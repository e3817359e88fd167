//! RSA short-message helpers
//!
//! Suitable for key material and other payloads that fit a single RSA
//! operation; anything larger belongs in the symmetric pipeline with an
//! RSA-wrapped key. OAEP uses SHA-1 for compatibility with ciphertext
//! produced by the original tooling.

use anyhow::anyhow;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

use cbox_core::{CboxError, CboxResult};

use crate::normalize;

/// RSA encryption padding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPaddingMode {
    /// OAEP with SHA-1
    Oaep,
    /// PKCS#1 v1.5
    Pkcs1,
}

/// Maximum plaintext length in bytes for one RSA operation at
/// `key_size_bits`.
///
/// These are the original platform's documented sizing formulas, kept
/// verbatim as the contract: `(key_size_bits - 384) / 8 + 7` for OAEP and
/// `(key_size_bits - 384) / 8 + 37` for PKCS#1 v1.5.
pub fn max_payload_len(key_size_bits: usize, mode: RsaPaddingMode) -> usize {
    match mode {
        RsaPaddingMode::Oaep => (key_size_bits - 384) / 8 + 7,
        RsaPaddingMode::Pkcs1 => (key_size_bits - 384) / 8 + 37,
    }
}

/// Generate an RSA keypair of `bits` modulus size.
pub fn generate_keypair(bits: usize) -> CboxResult<(RsaPrivateKey, RsaPublicKey)> {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, bits)
        .map_err(|e| CboxError::Other(anyhow!("RSA key generation failed: {e}")))?;
    let public = RsaPublicKey::from(&private);
    Ok((private, public))
}

/// Encrypt a short message with the public key.
pub fn encrypt_short(
    public_key: &RsaPublicKey,
    plaintext: &[u8],
    mode: RsaPaddingMode,
) -> CboxResult<Vec<u8>> {
    let max = max_payload_len(public_key.size() * 8, mode);
    if plaintext.len() > max {
        return Err(CboxError::PayloadTooLarge {
            len: plaintext.len(),
            max,
        });
    }

    let mut rng = rand::thread_rng();
    let result = match mode {
        RsaPaddingMode::Oaep => public_key.encrypt(&mut rng, Oaep::new::<Sha1>(), plaintext),
        RsaPaddingMode::Pkcs1 => public_key.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext),
    };
    result.map_err(|e| CboxError::Other(anyhow!("RSA encryption failed: {e}")))
}

/// Decrypt a short message with the private key.
pub fn decrypt_short(
    private_key: &RsaPrivateKey,
    ciphertext: &[u8],
    mode: RsaPaddingMode,
) -> CboxResult<Vec<u8>> {
    let result = match mode {
        RsaPaddingMode::Oaep => private_key.decrypt(Oaep::new::<Sha1>(), ciphertext),
        RsaPaddingMode::Pkcs1 => private_key.decrypt(Pkcs1v15Encrypt, ciphertext),
    };
    result.map_err(|e| CboxError::Decryption(format!("RSA decryption failed: {e}")))
}

/// Cyclically repair raw asymmetric key bytes to `required` length.
///
/// Non-standard: asymmetric keys are structured values, not byte buffers,
/// so a repaired buffer only round-trips through these helpers and says
/// nothing about key validity. Kept for callers that persisted such
/// buffers with the original tooling.
pub fn valid_key_material(bytes: &[u8], required: usize) -> CboxResult<Vec<u8>> {
    normalize::valid_key_for(bytes, required)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY_BITS: usize = 1024;

    fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        generate_keypair(TEST_KEY_BITS).unwrap()
    }

    #[test]
    fn sizing_formulas_are_exact() {
        assert_eq!(max_payload_len(2048, RsaPaddingMode::Oaep), 215);
        assert_eq!(max_payload_len(2048, RsaPaddingMode::Pkcs1), 245);
        assert_eq!(max_payload_len(1024, RsaPaddingMode::Oaep), 87);
        assert_eq!(max_payload_len(1024, RsaPaddingMode::Pkcs1), 117);
    }

    #[test]
    fn roundtrip_both_padding_modes() {
        let (private, public) = test_keypair();
        for mode in [RsaPaddingMode::Oaep, RsaPaddingMode::Pkcs1] {
            let plaintext = b"wrapped session key";
            let ciphertext = encrypt_short(&public, plaintext, mode).unwrap();
            assert_eq!(ciphertext.len(), TEST_KEY_BITS / 8);
            assert_eq!(decrypt_short(&private, &ciphertext, mode).unwrap(), plaintext);
        }
    }

    #[test]
    fn oversized_payload_is_rejected_before_encryption() {
        let (_, public) = test_keypair();
        let max = max_payload_len(TEST_KEY_BITS, RsaPaddingMode::Oaep);
        let payload = vec![0u8; max + 1];
        assert!(matches!(
            encrypt_short(&public, &payload, RsaPaddingMode::Oaep),
            Err(CboxError::PayloadTooLarge { len, max: m }) if len == max + 1 && m == max
        ));
    }

    #[test]
    fn pkcs1_payload_at_the_exact_maximum_roundtrips() {
        let (private, public) = test_keypair();
        let max = max_payload_len(TEST_KEY_BITS, RsaPaddingMode::Pkcs1);
        let payload = vec![0x5Au8; max];
        let ciphertext = encrypt_short(&public, &payload, RsaPaddingMode::Pkcs1).unwrap();
        assert_eq!(
            decrypt_short(&private, &ciphertext, RsaPaddingMode::Pkcs1).unwrap(),
            payload
        );
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let (_, public) = test_keypair();
        let (other_private, _) = test_keypair();
        let ciphertext = encrypt_short(&public, b"secret", RsaPaddingMode::Oaep).unwrap();
        assert!(matches!(
            decrypt_short(&other_private, &ciphertext, RsaPaddingMode::Oaep),
            Err(CboxError::Decryption(_))
        ));
    }

    #[test]
    fn mismatched_padding_mode_fails() {
        let (private, public) = test_keypair();
        let ciphertext = encrypt_short(&public, b"secret", RsaPaddingMode::Oaep).unwrap();
        assert!(decrypt_short(&private, &ciphertext, RsaPaddingMode::Pkcs1).is_err());
    }

    #[test]
    fn key_material_repair_roundtrips_buffers_only() {
        let repaired = valid_key_material(&[1, 2, 3], 8).unwrap();
        assert_eq!(repaired, [1, 2, 3, 1, 2, 3, 1, 2]);
    }
}
