//! Symmetric cipher handles: size tables, validation, lazy key material
//!
//! A [`SymmetricCipher`] stands in for the platform algorithm object the
//! original pipeline mutated: it carries the selected kind, the configured
//! key/block sizes, and (only if asked) self-generated random key material.
//! The actual block transforms live in [`crate::stream`].

use zeroize::Zeroizing;

use cbox_core::{CboxError, CboxResult, CipherKind};

use crate::random;

const AES_KEY_SIZES: [usize; 3] = [128, 192, 256];
const TDES_KEY_SIZES: [usize; 2] = [128, 192];
const DES_KEY_SIZES: [usize; 1] = [64];
const RC2_KEY_SIZES: [usize; 12] = [40, 48, 56, 64, 72, 80, 88, 96, 104, 112, 120, 128];

const AES_BLOCK_SIZES: [usize; 1] = [128];
const SMALL_BLOCK_SIZES: [usize; 1] = [64];

/// Legal key sizes in bits for `kind` (empty for [`CipherKind::None`]).
pub fn legal_key_size_bits(kind: CipherKind) -> &'static [usize] {
    match kind {
        CipherKind::Rijndael | CipherKind::Aes => &AES_KEY_SIZES,
        CipherKind::TripleDes => &TDES_KEY_SIZES,
        CipherKind::Des => &DES_KEY_SIZES,
        CipherKind::Rc2 => &RC2_KEY_SIZES,
        CipherKind::None => &[],
    }
}

/// Legal block sizes in bits for `kind` (empty for [`CipherKind::None`]).
pub fn legal_block_size_bits(kind: CipherKind) -> &'static [usize] {
    match kind {
        CipherKind::Rijndael | CipherKind::Aes => &AES_BLOCK_SIZES,
        CipherKind::TripleDes | CipherKind::Des | CipherKind::Rc2 => &SMALL_BLOCK_SIZES,
        CipherKind::None => &[],
    }
}

/// A configured symmetric cipher instance.
pub struct SymmetricCipher {
    kind: CipherKind,
    key_size_bits: usize,
    block_size_bits: usize,
    key: Option<Zeroizing<Vec<u8>>>,
    iv: Option<Vec<u8>>,
}

impl SymmetricCipher {
    /// Instantiate a cipher for `kind` at its default sizes.
    pub fn resolve(kind: CipherKind) -> CboxResult<Self> {
        let (key_size_bits, block_size_bits) = match kind {
            CipherKind::Rijndael | CipherKind::Aes => (256, 128),
            CipherKind::TripleDes => (192, 64),
            CipherKind::Des => (64, 64),
            CipherKind::Rc2 => (128, 64),
            CipherKind::None => {
                return Err(CboxError::UnsupportedAlgorithm(
                    "no symmetric cipher selected".into(),
                ))
            }
        };
        Ok(Self {
            kind,
            key_size_bits,
            block_size_bits,
            key: None,
            iv: None,
        })
    }

    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    pub fn key_size_bits(&self) -> usize {
        self.key_size_bits
    }

    pub fn block_size_bits(&self) -> usize {
        self.block_size_bits
    }

    /// True if this handle implements `kind`; [`CipherKind::None`] acts as
    /// a wildcard and matches any handle. Never errors.
    pub fn matches_kind(&self, kind: CipherKind) -> bool {
        kind == CipherKind::None || self.kind == kind
    }

    /// Largest legal key size for this cipher, in bits.
    pub fn largest_key_size_bits(&self) -> usize {
        // Tables are non-empty for every resolvable kind
        legal_key_size_bits(self.kind).iter().copied().max().unwrap_or(0)
    }

    /// Largest legal block size for this cipher, in bits.
    pub fn largest_block_size_bits(&self) -> usize {
        legal_block_size_bits(self.kind).iter().copied().max().unwrap_or(0)
    }

    /// Configure the largest legal key size and return it. Cached key
    /// material is discarded if the size changes.
    pub fn set_largest_key_size(&mut self) -> usize {
        let largest = self.largest_key_size_bits();
        if self.key_size_bits != largest {
            self.key_size_bits = largest;
            self.key = None;
        }
        largest
    }

    /// Configure the largest legal block size and return it.
    pub fn set_largest_block_size(&mut self) -> usize {
        let largest = self.largest_block_size_bits();
        if self.block_size_bits != largest {
            self.block_size_bits = largest;
            self.iv = None;
        }
        largest
    }

    /// Configure an explicit key size in bits.
    pub fn set_key_size_bits(&mut self, bits: usize) -> CboxResult<()> {
        if !legal_key_size_bits(self.kind).contains(&bits) {
            return Err(CboxError::InvalidArgument(format!(
                "{} bits is not a legal key size for {}",
                bits, self.kind
            )));
        }
        if self.key_size_bits != bits {
            self.key_size_bits = bits;
            self.key = None;
        }
        Ok(())
    }

    /// Current key material, generated randomly at the configured size on
    /// first access.
    pub fn key(&mut self) -> &[u8] {
        let len = self.key_size_bits / 8;
        self.key
            .get_or_insert_with(|| Zeroizing::new(random::random_bytes(len)))
    }

    /// Current IV, generated randomly at the configured block size on
    /// first access.
    pub fn iv(&mut self) -> &[u8] {
        let len = self.block_size_bits / 8;
        self.iv.get_or_insert_with(|| random::random_bytes(len))
    }

    /// Install caller-supplied key material; the configured key size
    /// follows the key length.
    pub fn set_key(&mut self, key: &[u8]) -> CboxResult<()> {
        let bits = key.len() * 8;
        if !legal_key_size_bits(self.kind).contains(&bits) {
            return Err(CboxError::InvalidArgument(format!(
                "a {}-byte key is not legal for {}",
                key.len(),
                self.kind
            )));
        }
        self.key_size_bits = bits;
        self.key = Some(Zeroizing::new(key.to_vec()));
        Ok(())
    }

    /// Install a caller-supplied IV; must match the configured block size.
    pub fn set_iv(&mut self, iv: &[u8]) -> CboxResult<()> {
        if iv.len() * 8 != self.block_size_bits {
            return Err(CboxError::InvalidArgument(format!(
                "a {}-byte IV does not match the {}-bit block size of {}",
                iv.len(),
                self.block_size_bits,
                self.kind
            )));
        }
        self.iv = Some(iv.to_vec());
        Ok(())
    }
}

impl std::fmt::Debug for SymmetricCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricCipher")
            .field("kind", &self.kind)
            .field("key_size_bits", &self.key_size_bits)
            .field("block_size_bits", &self.block_size_bits)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("iv", &self.iv)
            .finish()
    }
}

/// Ready-to-use cipher parameters: kind, key, IV.
///
/// Construction validates the size invariant (`key.len() * 8` legal for
/// the kind, `iv.len() * 8` equal to the block size), so a value of this
/// type can always be handed to the stream transforms. Key material is
/// wiped on drop. Request-scoped: build one per encrypt/decrypt call and
/// discard it; key material must not be cached or pooled.
#[derive(Clone)]
pub struct CipherParams {
    kind: CipherKind,
    key: Zeroizing<Vec<u8>>,
    iv: Vec<u8>,
}

impl CipherParams {
    pub fn new(kind: CipherKind, key: &[u8], iv: &[u8]) -> CboxResult<Self> {
        if kind == CipherKind::None {
            return Err(CboxError::UnsupportedAlgorithm(
                "no symmetric cipher selected".into(),
            ));
        }
        if !legal_key_size_bits(kind).contains(&(key.len() * 8)) {
            return Err(CboxError::InvalidArgument(format!(
                "a {}-byte key is not legal for {}",
                key.len(),
                kind
            )));
        }
        if !legal_block_size_bits(kind).contains(&(iv.len() * 8)) {
            return Err(CboxError::InvalidArgument(format!(
                "a {}-byte IV does not match the block size of {}",
                iv.len(),
                kind
            )));
        }
        Ok(Self {
            kind,
            key: Zeroizing::new(key.to_vec()),
            iv: iv.to_vec(),
        })
    }

    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Block size in bytes for this parameter set.
    pub fn block_len(&self) -> usize {
        self.iv.len()
    }
}

impl std::fmt::Debug for CipherParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherParams")
            .field("kind", &self.kind)
            .field("key", &"[REDACTED]")
            .field("iv", &self.iv)
            .finish()
    }
}
