//! Algorithm selectors shared across the workspace.
//!
//! Each selector is a closed set of named algorithm choices. Config files
//! and CLI layers parse user-facing strings (case-insensitive, with the
//! historical short aliases) into these enums; the crypto crate resolves
//! them to concrete implementations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CboxError;

/// Hash algorithm selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    None,
    Md5,
    Sha1,
    Sha256,
    #[default]
    Sha512,
}

impl HashKind {
    pub const ALL: [HashKind; 5] = [
        HashKind::None,
        HashKind::Md5,
        HashKind::Sha1,
        HashKind::Sha256,
        HashKind::Sha512,
    ];
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashKind::None => "none",
            HashKind::Md5 => "md5",
            HashKind::Sha1 => "sha1",
            HashKind::Sha256 => "sha256",
            HashKind::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

impl FromStr for HashKind {
    type Err = CboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(HashKind::None),
            "md5" => Ok(HashKind::Md5),
            "sha1" | "sha-1" => Ok(HashKind::Sha1),
            "sha256" | "sha-256" => Ok(HashKind::Sha256),
            "sha512" | "sha-512" => Ok(HashKind::Sha512),
            other => Err(CboxError::UnsupportedAlgorithm(format!(
                "unknown hash algorithm '{other}'"
            ))),
        }
    }
}

/// Symmetric cipher selector.
///
/// `Rijndael` and `Aes` are distinct kinds: a handle resolved as one does
/// not validate as the other, mirroring the platform classes they map to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherKind {
    None,
    #[default]
    Rijndael,
    Aes,
    TripleDes,
    Des,
    Rc2,
}

impl CipherKind {
    pub const ALL: [CipherKind; 6] = [
        CipherKind::None,
        CipherKind::Rijndael,
        CipherKind::Aes,
        CipherKind::TripleDes,
        CipherKind::Des,
        CipherKind::Rc2,
    ];
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CipherKind::None => "none",
            CipherKind::Rijndael => "rijndael",
            CipherKind::Aes => "aes",
            CipherKind::TripleDes => "tripledes",
            CipherKind::Des => "des",
            CipherKind::Rc2 => "rc2",
        };
        f.write_str(name)
    }
}

impl FromStr for CipherKind {
    type Err = CboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(CipherKind::None),
            "rd" | "rijndael" => Ok(CipherKind::Rijndael),
            "aes" => Ok(CipherKind::Aes),
            "td" | "tripledes" | "triple-des" | "3des" => Ok(CipherKind::TripleDes),
            "des" => Ok(CipherKind::Des),
            "rc2" => Ok(CipherKind::Rc2),
            other => Err(CboxError::UnsupportedAlgorithm(format!(
                "unknown cipher algorithm '{other}'"
            ))),
        }
    }
}

/// Key derivation selector.
///
/// `Rfc2898` is PBKDF2-HMAC-SHA1. `Legacy` is PBKDF1 with the vendor
/// counter extension for outputs past the digest size. `None` is a
/// non-cryptographic resize-only passthrough and is rejected by the
/// password-based preparation path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfKind {
    None,
    #[default]
    Rfc2898,
    Legacy,
}

impl KdfKind {
    pub const ALL: [KdfKind; 3] = [KdfKind::None, KdfKind::Rfc2898, KdfKind::Legacy];
}

impl fmt::Display for KdfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KdfKind::None => "none",
            KdfKind::Rfc2898 => "rfc2898",
            KdfKind::Legacy => "legacy",
        };
        f.write_str(name)
    }
}

impl FromStr for KdfKind {
    type Err = CboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(KdfKind::None),
            "rfc2898" | "pbkdf2" => Ok(KdfKind::Rfc2898),
            "legacy" | "pbkdf1" => Ok(KdfKind::Legacy),
            other => Err(CboxError::UnsupportedAlgorithm(format!(
                "unknown key derivation algorithm '{other}'"
            ))),
        }
    }
}
