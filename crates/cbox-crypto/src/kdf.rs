//! Key derivation: one stateful byte stream per session
//!
//! Callers pull the key first and the IV second from the same stream, so
//! `get_bytes` must advance an internal cursor: two consecutive calls with
//! the same length return *different* bytes. Both the PBKDF2 and the
//! legacy PBKDF1 variants honor that contract; the identity variant is a
//! documented non-cryptographic passthrough.

use pbkdf2::pbkdf2_hmac;
use sha1::{Digest as _, Sha1};
use zeroize::Zeroizing;

use cbox_core::{CboxError, CboxResult, KdfKind};

const SHA1_LEN: usize = 20;

/// A key-derivation session. Variants own their entire state; `init`
/// establishes it and `reset` wipes it.
pub enum KeyDeriver {
    /// PBKDF2-HMAC-SHA1 (RFC 2898 §5.2)
    Pbkdf2(Option<Pbkdf2State>),
    /// PBKDF1 (RFC 2898 §5.1) with the vendor counter extension for
    /// outputs past 20 bytes
    Legacy(Option<LegacyState>),
    /// Cyclic resize of the seed bytes. No key stretching, no salt, no
    /// iteration count: not a KDF, only a size adapter for raw key
    /// material. Excluded from the stream-cursor contract.
    Identity(Option<Zeroizing<Vec<u8>>>),
}

pub struct Pbkdf2State {
    password: Zeroizing<Vec<u8>>,
    salt: Vec<u8>,
    iterations: u32,
    consumed: usize,
}

pub struct LegacyState {
    base: Zeroizing<[u8; SHA1_LEN]>,
    consumed: usize,
}

impl KeyDeriver {
    pub fn new(kind: KdfKind) -> Self {
        match kind {
            KdfKind::Rfc2898 => KeyDeriver::Pbkdf2(None),
            KdfKind::Legacy => KeyDeriver::Legacy(None),
            KdfKind::None => KeyDeriver::Identity(None),
        }
    }

    pub fn kind(&self) -> KdfKind {
        match self {
            KeyDeriver::Pbkdf2(_) => KdfKind::Rfc2898,
            KeyDeriver::Legacy(_) => KdfKind::Legacy,
            KeyDeriver::Identity(_) => KdfKind::None,
        }
    }

    /// Establish the derivation state. Calling `init` on an initialized
    /// session resets it first.
    pub fn init(&mut self, password: &[u8], salt: &[u8], iterations: u32) -> CboxResult<()> {
        if password.is_empty() {
            return Err(CboxError::InvalidArgument("password must not be empty".into()));
        }
        if salt.is_empty() {
            return Err(CboxError::InvalidArgument("salt must not be empty".into()));
        }
        if iterations == 0 {
            return Err(CboxError::InvalidArgument(
                "iteration count must be positive".into(),
            ));
        }

        self.reset();
        match self {
            KeyDeriver::Pbkdf2(state) => {
                *state = Some(Pbkdf2State {
                    password: Zeroizing::new(password.to_vec()),
                    salt: salt.to_vec(),
                    iterations,
                    consumed: 0,
                });
            }
            KeyDeriver::Legacy(state) => {
                // T_1 = SHA1(password || salt); T_i = SHA1(T_{i-1})
                let mut hasher = Sha1::new();
                hasher.update(password);
                hasher.update(salt);
                let mut t = hasher.finalize();
                for _ in 1..iterations {
                    let mut hasher = Sha1::new();
                    hasher.update(t);
                    t = hasher.finalize();
                }
                *state = Some(LegacyState {
                    base: Zeroizing::new(t.into()),
                    consumed: 0,
                });
            }
            KeyDeriver::Identity(seed) => {
                *seed = Some(Zeroizing::new(password.to_vec()));
            }
        }
        Ok(())
    }

    /// Wipe all derivation state. Safe to call repeatedly; a wiped session
    /// must be `init`ed again before `get_bytes`.
    pub fn reset(&mut self) {
        match self {
            KeyDeriver::Pbkdf2(state) => *state = None,
            KeyDeriver::Legacy(state) => *state = None,
            KeyDeriver::Identity(seed) => *seed = None,
        }
    }

    /// Return the next `num_bytes` of the derivation stream.
    pub fn get_bytes(&mut self, num_bytes: usize) -> CboxResult<Zeroizing<Vec<u8>>> {
        match self {
            KeyDeriver::Pbkdf2(state) => {
                let state = state.as_mut().ok_or(CboxError::NotInitialized)?;
                // PBKDF2 output is a deterministic stream; derive the
                // prefix again and hand back the tail past the cursor.
                let total = state.consumed + num_bytes;
                let mut buf = Zeroizing::new(vec![0u8; total]);
                pbkdf2_hmac::<Sha1>(&state.password, &state.salt, state.iterations, &mut buf);
                let out = Zeroizing::new(buf[state.consumed..].to_vec());
                state.consumed = total;
                Ok(out)
            }
            KeyDeriver::Legacy(state) => {
                let state = state.as_mut().ok_or(CboxError::NotInitialized)?;
                let out = legacy_stream(&state.base, state.consumed, num_bytes);
                state.consumed += num_bytes;
                Ok(out)
            }
            KeyDeriver::Identity(seed) => {
                let seed = seed.as_ref().ok_or(CboxError::NotInitialized)?;
                let mut out = Zeroizing::new(Vec::with_capacity(num_bytes));
                for i in 0..num_bytes {
                    out.push(seed[i % seed.len()]);
                }
                Ok(out)
            }
        }
    }
}

/// Bytes `start..start + len` of the extended PBKDF1 stream:
/// block 0 is the iterated base hash, block i >= 1 is
/// `SHA1(ascii(i) || base)`.
fn legacy_stream(
    base: &[u8; SHA1_LEN],
    start: usize,
    len: usize,
) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(len));
    let mut pos = start;
    while out.len() < len {
        let block_index = pos / SHA1_LEN;
        let block: Zeroizing<[u8; SHA1_LEN]> = if block_index == 0 {
            Zeroizing::new(*base)
        } else {
            let mut hasher = Sha1::new();
            hasher.update(block_index.to_string().as_bytes());
            hasher.update(base);
            Zeroizing::new(hasher.finalize().into())
        };
        let offset = pos % SHA1_LEN;
        let take = (SHA1_LEN - offset).min(len - out.len());
        out.extend_from_slice(&block[offset..offset + take]);
        pos += take;
    }
    out
}
