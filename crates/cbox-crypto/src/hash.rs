//! Hashing facade over the platform digest algorithms
//!
//! MD5 and SHA-1 are kept for compatibility with data produced by the
//! original tooling; they are not suitable for security purposes.

use std::io::Read;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest as _, Sha256, Sha512};

use cbox_core::{CboxError, CboxResult, HashKind};

/// An incremental hasher bound to one [`HashKind`].
pub enum HashAlgorithm {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl HashAlgorithm {
    /// Instantiate a fresh hasher for `kind`.
    pub fn resolve(kind: HashKind) -> CboxResult<Self> {
        match kind {
            HashKind::Md5 => Ok(HashAlgorithm::Md5(Md5::new())),
            HashKind::Sha1 => Ok(HashAlgorithm::Sha1(Sha1::new())),
            HashKind::Sha256 => Ok(HashAlgorithm::Sha256(Sha256::new())),
            HashKind::Sha512 => Ok(HashAlgorithm::Sha512(Sha512::new())),
            HashKind::None => Err(CboxError::UnsupportedAlgorithm(
                "no hash algorithm selected".into(),
            )),
        }
    }

    pub fn kind(&self) -> HashKind {
        match self {
            HashAlgorithm::Md5(_) => HashKind::Md5,
            HashAlgorithm::Sha1(_) => HashKind::Sha1,
            HashAlgorithm::Sha256(_) => HashKind::Sha256,
            HashAlgorithm::Sha512(_) => HashKind::Sha512,
        }
    }

    /// True if this hasher implements `kind`; `HashKind::None` acts as a
    /// wildcard and matches any hasher. Never errors.
    pub fn matches_kind(&self, kind: HashKind) -> bool {
        kind == HashKind::None || self.kind() == kind
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            HashAlgorithm::Md5(h) => h.update(data),
            HashAlgorithm::Sha1(h) => h.update(data),
            HashAlgorithm::Sha256(h) => h.update(data),
            HashAlgorithm::Sha512(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            HashAlgorithm::Md5(h) => h.finalize().to_vec(),
            HashAlgorithm::Sha1(h) => h.finalize().to_vec(),
            HashAlgorithm::Sha256(h) => h.finalize().to_vec(),
            HashAlgorithm::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

/// Digest length in bytes for `kind`, or `None` for [`HashKind::None`].
pub fn digest_len(kind: HashKind) -> Option<usize> {
    match kind {
        HashKind::None => None,
        HashKind::Md5 => Some(16),
        HashKind::Sha1 => Some(20),
        HashKind::Sha256 => Some(32),
        HashKind::Sha512 => Some(64),
    }
}

/// One-shot digest of `data`.
pub fn digest(kind: HashKind, data: &[u8]) -> CboxResult<Vec<u8>> {
    let mut hasher = HashAlgorithm::resolve(kind)?;
    hasher.update(data);
    Ok(hasher.finalize())
}

/// One-shot digest, lowercase hex.
pub fn digest_hex(kind: HashKind, data: &[u8]) -> CboxResult<String> {
    Ok(hex::encode(digest(kind, data)?))
}

/// One-shot digest, standard Base64.
pub fn digest_base64(kind: HashKind, data: &[u8]) -> CboxResult<String> {
    Ok(BASE64.encode(digest(kind, data)?))
}

/// Digest a file's content without reading it fully into memory.
pub fn digest_file(kind: HashKind, path: &Path) -> CboxResult<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = HashAlgorithm::resolve(kind)?;
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize())
}
