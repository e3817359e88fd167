//! The prepare/encrypt/decrypt orchestrator
//!
//! Preparation turns a password+salt (or raw key+IV) into validated
//! [`CipherParams`]; encryption and decryption drive the stream transforms
//! over bytes, readers/writers, Base64 strings, or files.
//!
//! Salted framing: `encrypt_with_salt` writes the salt into the encryptor
//! *before* the plaintext, so the salt is encrypted together with the
//! payload as one ciphertext stream. Decryption with `num_salt_bytes > 0`
//! therefore decrypts everything first and discards the leading plaintext
//! bytes afterwards; the salt length travels out-of-band.

use std::io::{Read, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use cbox_core::{CboxError, CboxResult, CipherKind, CryptoConfig, KdfKind};

use crate::cipher::{CipherParams, SymmetricCipher};
use crate::kdf::KeyDeriver;
use crate::normalize;
use crate::stream::{StreamDecryptor, StreamEncryptor};
use crate::{COPY_BUF_LEN, DEFAULT_KDF_ITERATIONS, MIN_PASSWORD_BYTES, MIN_SALT_BYTES};

/// Options for the preparation functions.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Requested cipher kind; a supplied handle must match it
    pub cipher: CipherKind,
    /// Key derivation algorithm (password-based path only)
    pub kdf: KdfKind,
    /// KDF iteration count
    pub iterations: u32,
    /// Configure the cipher's largest legal key size before derivation
    pub use_largest_key_size: bool,
    /// Configure the cipher's largest legal block size before derivation
    pub use_largest_block_size: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            cipher: CipherKind::default(),
            kdf: KdfKind::default(),
            iterations: DEFAULT_KDF_ITERATIONS,
            use_largest_key_size: false,
            use_largest_block_size: false,
        }
    }
}

impl From<&CryptoConfig> for PrepareOptions {
    fn from(config: &CryptoConfig) -> Self {
        Self {
            cipher: config.cipher,
            kdf: config.kdf,
            iterations: config.kdf_iterations,
            use_largest_key_size: config.use_largest_key_size,
            use_largest_block_size: config.use_largest_block_size,
        }
    }
}

/// Resolve a fresh handle for `kind`, or validate a supplied one against
/// it. Mismatches fail before any derivation or I/O happens.
fn resolve_or_validate(
    cipher: Option<SymmetricCipher>,
    kind: CipherKind,
) -> CboxResult<SymmetricCipher> {
    match cipher {
        None => SymmetricCipher::resolve(kind),
        Some(handle) => {
            if !handle.matches_kind(kind) {
                return Err(CboxError::AlgorithmMismatch {
                    expected: kind,
                    actual: handle.kind(),
                });
            }
            Ok(handle)
        }
    }
}

/// Derive cipher parameters from a password and salt.
///
/// The key is pulled from the KDF stream first and the IV second; both
/// lengths follow the handle's configured sizes, which the
/// `use_largest_*` flags adjust *before* derivation.
pub fn prepare_from_password(
    password: &[u8],
    salt: &[u8],
    cipher: Option<SymmetricCipher>,
    opts: &PrepareOptions,
) -> CboxResult<CipherParams> {
    if password.len() < MIN_PASSWORD_BYTES {
        return Err(CboxError::WeakPassword {
            len: password.len(),
            min: MIN_PASSWORD_BYTES,
        });
    }
    if salt.len() < MIN_SALT_BYTES {
        return Err(CboxError::WeakSalt {
            len: salt.len(),
            min: MIN_SALT_BYTES,
        });
    }
    if opts.kdf == KdfKind::None {
        return Err(CboxError::InvalidArgument(
            "a key derivation algorithm must be selected for password-based preparation".into(),
        ));
    }

    let mut handle = resolve_or_validate(cipher, opts.cipher)?;
    if opts.use_largest_key_size {
        handle.set_largest_key_size();
    }
    if opts.use_largest_block_size {
        handle.set_largest_block_size();
    }

    let mut kdf = KeyDeriver::new(opts.kdf);
    kdf.init(password, salt, opts.iterations)?;
    let key = kdf.get_bytes(handle.key_size_bits() / 8)?;
    let iv = kdf.get_bytes(handle.block_size_bits() / 8)?;
    kdf.reset();

    debug!(
        "derived cipher parameters: cipher={} kdf={} iterations={}",
        handle.kind(),
        opts.kdf,
        opts.iterations
    );
    CipherParams::new(handle.kind(), &key, &iv)
}

/// [`prepare_from_password`] for a passphrase string.
pub fn prepare_from_passphrase(
    passphrase: &SecretString,
    salt: &[u8],
    cipher: Option<SymmetricCipher>,
    opts: &PrepareOptions,
) -> CboxResult<CipherParams> {
    prepare_from_password(passphrase.expose_secret().as_bytes(), salt, cipher, opts)
}

/// Build cipher parameters from caller-supplied key material.
///
/// Without a handle, both `key` and `iv` are required. With a handle, a
/// missing key or IV is taken from the handle's own (randomly generated)
/// material. Supplied buffers are size-repaired to the handle's configured
/// sizes by cyclic padding/truncation; no minimum-length policy applies
/// in this path.
pub fn prepare_raw(
    key: Option<&[u8]>,
    iv: Option<&[u8]>,
    cipher: Option<SymmetricCipher>,
    opts: &PrepareOptions,
) -> CboxResult<CipherParams> {
    if cipher.is_none() && (key.is_none() || iv.is_none()) {
        return Err(CboxError::InvalidArgument(
            "both key and IV are required when no cipher handle is supplied".into(),
        ));
    }

    let mut handle = resolve_or_validate(cipher, opts.cipher)?;
    if opts.use_largest_key_size {
        handle.set_largest_key_size();
    }
    if opts.use_largest_block_size {
        handle.set_largest_block_size();
    }

    let key_len = handle.key_size_bits() / 8;
    let iv_len = handle.block_size_bits() / 8;
    let key = match key {
        Some(k) => normalize::valid_key_for(k, key_len)?,
        None => handle.key().to_vec(),
    };
    let iv = match iv {
        Some(v) => normalize::valid_iv_for(v, iv_len)?,
        None => handle.iv().to_vec(),
    };

    CipherParams::new(handle.kind(), &key, &iv)
}

/// Encrypt `plaintext` and return the ciphertext.
pub fn encrypt(params: &CipherParams, plaintext: &[u8]) -> CboxResult<Vec<u8>> {
    encrypt_with_salt(params, plaintext, &[])
}

/// Encrypt `salt ++ plaintext` as one stream. The salt bytes are
/// encrypted together with the payload; pass their length as
/// `num_salt_bytes` when decrypting.
pub fn encrypt_with_salt(
    params: &CipherParams,
    plaintext: &[u8],
    salt: &[u8],
) -> CboxResult<Vec<u8>> {
    let mut enc = StreamEncryptor::new(params, Vec::new())?;
    if !salt.is_empty() {
        enc.write(salt)?;
    }
    enc.write(plaintext)?;
    enc.finish()
}

/// Encrypt everything `reader` yields into `writer`, with an optional
/// salt prefix mixed into the plaintext. Reads in fixed-size chunks; the
/// writer is flushed before returning.
pub fn encrypt_stream<R: Read, W: Write>(
    params: &CipherParams,
    reader: &mut R,
    writer: &mut W,
    salt: Option<&[u8]>,
) -> CboxResult<()> {
    let mut enc = StreamEncryptor::new(params, writer)?;
    if let Some(salt) = salt {
        enc.write(salt)?;
    }
    let mut buf = [0u8; COPY_BUF_LEN];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        enc.write(&buf[..n])?;
    }
    enc.finish()?;
    debug!("stream encryption finalized: cipher={}", params.kind());
    Ok(())
}

/// Decrypt `ciphertext`, discarding the first `num_salt_bytes` of the
/// decrypted payload.
pub fn decrypt(
    params: &CipherParams,
    ciphertext: &[u8],
    num_salt_bytes: usize,
) -> CboxResult<Vec<u8>> {
    let mut dec = StreamDecryptor::new(params, Vec::new())?;
    dec.write(ciphertext)?;
    let plain = dec.finish()?;
    strip_salt_prefix(plain, num_salt_bytes)
}

/// Decrypt everything `reader` yields into `writer`, discarding the first
/// `num_salt_bytes` of the decrypted payload.
///
/// With a salt prefix the whole stream is decrypted into a temporary
/// buffer first — padding only resolves at finalize, so the prefix cannot
/// be skipped on the fly — and the remainder is then copied out through a
/// fixed-size buffer.
pub fn decrypt_stream<R: Read, W: Write>(
    params: &CipherParams,
    reader: &mut R,
    writer: &mut W,
    num_salt_bytes: usize,
) -> CboxResult<()> {
    if num_salt_bytes == 0 {
        let mut dec = StreamDecryptor::new(params, writer)?;
        let mut buf = [0u8; COPY_BUF_LEN];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            dec.write(&buf[..n])?;
        }
        dec.finish()?;
        return Ok(());
    }

    let mut dec = StreamDecryptor::new(params, Vec::new())?;
    let mut buf = [0u8; COPY_BUF_LEN];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        dec.write(&buf[..n])?;
    }
    let plain = dec.finish()?;
    let payload = strip_salt_prefix(plain, num_salt_bytes)?;
    for chunk in payload.chunks(COPY_BUF_LEN) {
        writer.write_all(chunk)?;
    }
    writer.flush()?;
    Ok(())
}

fn strip_salt_prefix(mut plain: Vec<u8>, num_salt_bytes: usize) -> CboxResult<Vec<u8>> {
    if num_salt_bytes == 0 {
        return Ok(plain);
    }
    if plain.len() < num_salt_bytes {
        return Err(CboxError::InvalidArgument(format!(
            "salt length {} exceeds the {}-byte decrypted payload",
            num_salt_bytes,
            plain.len()
        )));
    }
    plain.drain(..num_salt_bytes);
    Ok(plain)
}

/// Encrypt to a standard-alphabet Base64 string.
pub fn encrypt_to_base64(
    params: &CipherParams,
    plaintext: &[u8],
    salt: Option<&[u8]>,
) -> CboxResult<String> {
    let ciphertext = encrypt_with_salt(params, plaintext, salt.unwrap_or_default())?;
    Ok(BASE64.encode(ciphertext))
}

/// Decrypt a standard-alphabet Base64 string.
pub fn decrypt_from_base64(
    params: &CipherParams,
    encoded: &str,
    num_salt_bytes: usize,
) -> CboxResult<Vec<u8>> {
    let ciphertext = BASE64
        .decode(encoded.trim())
        .map_err(|e| CboxError::InvalidArgument(format!("invalid Base64 ciphertext: {e}")))?;
    decrypt(params, &ciphertext, num_salt_bytes)
}

/// Encrypt `src` into `dst` with buffered file streams.
pub fn encrypt_file(
    params: &CipherParams,
    src: &Path,
    dst: &Path,
    salt: Option<&[u8]>,
) -> CboxResult<()> {
    let mut reader = std::io::BufReader::new(std::fs::File::open(src)?);
    let mut writer = std::io::BufWriter::new(std::fs::File::create(dst)?);
    encrypt_stream(params, &mut reader, &mut writer, salt)
}

/// Decrypt `src` into `dst` with buffered file streams.
pub fn decrypt_file(
    params: &CipherParams,
    src: &Path,
    dst: &Path,
    num_salt_bytes: usize,
) -> CboxResult<()> {
    let mut reader = std::io::BufReader::new(std::fs::File::open(src)?);
    let mut writer = std::io::BufWriter::new(std::fs::File::create(dst)?);
    decrypt_stream(params, &mut reader, &mut writer, num_salt_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> CipherParams {
        prepare_from_password(
            b"a test password",
            b"a test salt value",
            None,
            &PrepareOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn short_password_is_rejected() {
        let err = prepare_from_password(b"tiny", b"salt salt", None, &PrepareOptions::default());
        assert!(matches!(err, Err(CboxError::WeakPassword { len: 4, min: 8 })));
    }

    #[test]
    fn short_salt_is_rejected() {
        let err = prepare_from_password(b"password!", b"salt", None, &PrepareOptions::default());
        assert!(matches!(err, Err(CboxError::WeakSalt { len: 4, min: 8 })));
    }

    #[test]
    fn kdf_none_is_rejected_in_the_password_path() {
        let opts = PrepareOptions {
            kdf: KdfKind::None,
            ..PrepareOptions::default()
        };
        let err = prepare_from_password(b"password!", b"salt salt", None, &opts);
        assert!(matches!(err, Err(CboxError::InvalidArgument(_))));
    }

    #[test]
    fn mismatched_handle_fails_fast() {
        let handle = SymmetricCipher::resolve(CipherKind::TripleDes).unwrap();
        let opts = PrepareOptions {
            cipher: CipherKind::Aes,
            ..PrepareOptions::default()
        };
        let err = prepare_from_password(b"password!", b"salt salt", Some(handle), &opts);
        assert!(matches!(
            err,
            Err(CboxError::AlgorithmMismatch {
                expected: CipherKind::Aes,
                actual: CipherKind::TripleDes,
            })
        ));
    }

    #[test]
    fn preparation_is_deterministic() {
        let opts = PrepareOptions::default();
        let a = prepare_from_password(b"password!", b"salt salt", None, &opts).unwrap();
        let b = prepare_from_password(b"password!", b"salt salt", None, &opts).unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(a.iv(), b.iv());
        // Key comes out of the stream before the IV, so they differ
        assert_ne!(&a.key()[..16], a.iv());
    }

    #[test]
    fn passphrase_path_equals_byte_path() {
        let opts = PrepareOptions::default();
        let from_str = prepare_from_passphrase(
            &SecretString::from("correct horse battery staple"),
            b"salt salt",
            None,
            &opts,
        )
        .unwrap();
        let from_bytes =
            prepare_from_password(b"correct horse battery staple", b"salt salt", None, &opts)
                .unwrap();
        assert_eq!(from_str.key(), from_bytes.key());
        assert_eq!(from_str.iv(), from_bytes.iv());
    }

    #[test]
    fn largest_size_flags_apply_before_derivation() {
        let mut handle = SymmetricCipher::resolve(CipherKind::Aes).unwrap();
        handle.set_key_size_bits(128).unwrap();
        let opts = PrepareOptions {
            cipher: CipherKind::Aes,
            use_largest_key_size: true,
            ..PrepareOptions::default()
        };
        let params =
            prepare_from_password(b"password!", b"salt salt", Some(handle), &opts).unwrap();
        assert_eq!(params.key().len(), 32, "derived at the enlarged key size");
    }

    #[test]
    fn prepare_raw_requires_key_and_iv_without_a_handle() {
        let opts = PrepareOptions {
            cipher: CipherKind::Aes,
            ..PrepareOptions::default()
        };
        assert!(prepare_raw(Some(&[1u8; 32]), None, None, &opts).is_err());
        assert!(prepare_raw(None, Some(&[2u8; 16]), None, &opts).is_err());
        assert!(prepare_raw(Some(&[1u8; 32]), Some(&[2u8; 16]), None, &opts).is_ok());
    }

    #[test]
    fn prepare_raw_repairs_sizes_cyclically() {
        let opts = PrepareOptions {
            cipher: CipherKind::Aes,
            ..PrepareOptions::default()
        };
        let params = prepare_raw(Some(&[1, 2, 3]), Some(&[4, 5]), None, &opts).unwrap();
        assert_eq!(params.key().len(), 32);
        assert_eq!(params.iv().len(), 16);
        assert_eq!(&params.key()[..6], &[1, 2, 3, 1, 2, 3]);
        assert_eq!(&params.iv()[..4], &[4, 5, 4, 5]);
    }

    #[test]
    fn prepare_raw_pulls_missing_material_from_the_handle() {
        let opts = PrepareOptions {
            cipher: CipherKind::Aes,
            ..PrepareOptions::default()
        };
        let handle = SymmetricCipher::resolve(CipherKind::Aes).unwrap();
        let params = prepare_raw(Some(&[9u8; 32]), None, Some(handle), &opts).unwrap();
        assert_eq!(params.key(), [9u8; 32].as_slice());
        assert_eq!(params.iv().len(), 16, "IV generated by the handle");
    }

    #[test]
    fn roundtrip_without_salt() {
        let params = test_params();
        let plaintext = b"The quick brown fox jumps over the lazy dog";
        let ciphertext = encrypt(&params, plaintext).unwrap();
        assert_eq!(ciphertext.len(), 48, "44 bytes pad to three AES blocks");
        assert_eq!(decrypt(&params, &ciphertext, 0).unwrap(), plaintext);
    }

    #[test]
    fn roundtrip_with_salt_prefix() {
        let params = test_params();
        let plaintext = b"The quick brown fox jumps over the lazy dog";
        for salt_len in [8usize, 16, 37] {
            let salt: Vec<u8> = (0..salt_len as u8).collect();
            let ciphertext = encrypt_with_salt(&params, plaintext, &salt).unwrap();
            let decrypted = decrypt(&params, &ciphertext, salt_len).unwrap();
            assert_eq!(decrypted, plaintext, "salt length {salt_len}");
        }
    }

    #[test]
    fn salt_is_encrypted_not_prefixed_in_clear() {
        let params = test_params();
        let salt = [0xABu8; 8];
        let ciphertext = encrypt_with_salt(&params, b"payload", &salt).unwrap();
        assert_ne!(&ciphertext[..8], salt.as_slice());
        // The salted frame decrypts to salt ++ plaintext
        let full = decrypt(&params, &ciphertext, 0).unwrap();
        assert_eq!(&full[..8], salt.as_slice());
        assert_eq!(&full[8..], b"payload");
    }

    #[test]
    fn salt_count_beyond_payload_is_rejected() {
        let params = test_params();
        let ciphertext = encrypt(&params, b"tiny").unwrap();
        assert!(matches!(
            decrypt(&params, &ciphertext, 100),
            Err(CboxError::InvalidArgument(_))
        ));
    }

    #[test]
    fn stream_mode_matches_byte_mode() {
        let params = test_params();
        let plaintext: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

        let mut ciphertext = Vec::new();
        encrypt_stream(&params, &mut plaintext.as_slice(), &mut ciphertext, Some(&[7u8; 8]))
            .unwrap();
        assert_eq!(
            ciphertext,
            encrypt_with_salt(&params, &plaintext, &[7u8; 8]).unwrap()
        );

        let mut decrypted = Vec::new();
        decrypt_stream(&params, &mut ciphertext.as_slice(), &mut decrypted, 8).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn base64_roundtrip() {
        let params = test_params();
        let encoded = encrypt_to_base64(&params, b"string boundary", None).unwrap();
        assert_eq!(
            decrypt_from_base64(&params, &encoded, 0).unwrap(),
            b"string boundary"
        );
        assert!(decrypt_from_base64(&params, "not base64!!!", 0).is_err());
    }

    #[test]
    fn file_roundtrip() {
        let params = test_params();
        let dir = tempfile::tempdir().unwrap();
        let plain_path = dir.path().join("plain.bin");
        let enc_path = dir.path().join("cipher.bin");
        let out_path = dir.path().join("roundtrip.bin");

        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 253) as u8).collect();
        std::fs::write(&plain_path, &data).unwrap();

        encrypt_file(&params, &plain_path, &enc_path, Some(&[1u8; 16])).unwrap();
        decrypt_file(&params, &enc_path, &out_path, 16).unwrap();
        assert_eq!(std::fs::read(&out_path).unwrap(), data);
    }

    #[test]
    fn options_come_from_config() {
        let config = CryptoConfig {
            cipher: CipherKind::TripleDes,
            kdf_iterations: 4242,
            ..CryptoConfig::default()
        };
        let opts = PrepareOptions::from(&config);
        assert_eq!(opts.cipher, CipherKind::TripleDes);
        assert_eq!(opts.iterations, 4242);
        assert_eq!(opts.kdf, KdfKind::Rfc2898);
    }
}
