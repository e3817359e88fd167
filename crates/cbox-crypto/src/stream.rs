//! Incremental CBC transforms with PKCS7 padding at finalize
//!
//! The RustCrypto padded one-shot APIs cannot express the pipeline's
//! write-then-finalize streaming, so these transforms drive the block
//! ciphers one block at a time and handle the padding themselves:
//! [`StreamEncryptor`] pads exactly once in `finish`, and
//! [`StreamDecryptor`] holds the final ciphertext block back until
//! `finish`, where the padding is validated and stripped.

use std::io::Write;

use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyIvInit};

use cbox_core::{CboxError, CboxResult, CipherKind};

use crate::cipher::CipherParams;

/// Largest block size across the supported ciphers (AES), in bytes.
const MAX_BLOCK_LEN: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type DesCbcEnc = cbc::Encryptor<des::Des>;
type Tdes2CbcEnc = cbc::Encryptor<des::TdesEde2>;
type Tdes3CbcEnc = cbc::Encryptor<des::TdesEde3>;
type Rc2CbcEnc = cbc::Encryptor<rc2::Rc2>;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type DesCbcDec = cbc::Decryptor<des::Des>;
type Tdes2CbcDec = cbc::Decryptor<des::TdesEde2>;
type Tdes3CbcDec = cbc::Decryptor<des::TdesEde3>;
type Rc2CbcDec = cbc::Decryptor<rc2::Rc2>;

fn bad_length(_: cbc::cipher::InvalidLength) -> CboxError {
    CboxError::InvalidArgument("key or IV length rejected by the cipher".into())
}

enum BlockEnc {
    Aes128(Aes128CbcEnc),
    Aes192(Aes192CbcEnc),
    Aes256(Aes256CbcEnc),
    Des(DesCbcEnc),
    Tdes2(Tdes2CbcEnc),
    Tdes3(Tdes3CbcEnc),
    Rc2(Rc2CbcEnc),
}

impl BlockEnc {
    fn new(params: &CipherParams) -> CboxResult<Self> {
        let key = params.key();
        let iv = params.iv();
        match params.kind() {
            CipherKind::Rijndael | CipherKind::Aes => match key.len() {
                16 => Ok(BlockEnc::Aes128(
                    Aes128CbcEnc::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                24 => Ok(BlockEnc::Aes192(
                    Aes192CbcEnc::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                32 => Ok(BlockEnc::Aes256(
                    Aes256CbcEnc::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                n => Err(CboxError::InvalidArgument(format!(
                    "a {n}-byte key is not legal for AES"
                ))),
            },
            CipherKind::TripleDes => match key.len() {
                16 => Ok(BlockEnc::Tdes2(
                    Tdes2CbcEnc::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                24 => Ok(BlockEnc::Tdes3(
                    Tdes3CbcEnc::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                n => Err(CboxError::InvalidArgument(format!(
                    "a {n}-byte key is not legal for TripleDES"
                ))),
            },
            CipherKind::Des => Ok(BlockEnc::Des(
                DesCbcEnc::new_from_slices(key, iv).map_err(bad_length)?,
            )),
            CipherKind::Rc2 => {
                // RC2 keys are variable-length; build the core directly
                // with the effective key length and wrap it in CBC.
                let core = rc2::Rc2::new_with_eff_key_len(key, key.len() * 8);
                Ok(BlockEnc::Rc2(Rc2CbcEnc::inner_iv_init(
                    core,
                    GenericArray::from_slice(iv),
                )))
            }
            CipherKind::None => Err(CboxError::UnsupportedAlgorithm(
                "no symmetric cipher selected".into(),
            )),
        }
    }

    fn block_size(&self) -> usize {
        match self {
            BlockEnc::Aes128(_) | BlockEnc::Aes192(_) | BlockEnc::Aes256(_) => 16,
            _ => 8,
        }
    }

    fn encrypt_block(&mut self, block: &mut [u8]) {
        match self {
            BlockEnc::Aes128(c) => c.encrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockEnc::Aes192(c) => c.encrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockEnc::Aes256(c) => c.encrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockEnc::Des(c) => c.encrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockEnc::Tdes2(c) => c.encrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockEnc::Tdes3(c) => c.encrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockEnc::Rc2(c) => c.encrypt_block_mut(GenericArray::from_mut_slice(block)),
        }
    }
}

enum BlockDec {
    Aes128(Aes128CbcDec),
    Aes192(Aes192CbcDec),
    Aes256(Aes256CbcDec),
    Des(DesCbcDec),
    Tdes2(Tdes2CbcDec),
    Tdes3(Tdes3CbcDec),
    Rc2(Rc2CbcDec),
}

impl BlockDec {
    fn new(params: &CipherParams) -> CboxResult<Self> {
        let key = params.key();
        let iv = params.iv();
        match params.kind() {
            CipherKind::Rijndael | CipherKind::Aes => match key.len() {
                16 => Ok(BlockDec::Aes128(
                    Aes128CbcDec::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                24 => Ok(BlockDec::Aes192(
                    Aes192CbcDec::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                32 => Ok(BlockDec::Aes256(
                    Aes256CbcDec::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                n => Err(CboxError::InvalidArgument(format!(
                    "a {n}-byte key is not legal for AES"
                ))),
            },
            CipherKind::TripleDes => match key.len() {
                16 => Ok(BlockDec::Tdes2(
                    Tdes2CbcDec::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                24 => Ok(BlockDec::Tdes3(
                    Tdes3CbcDec::new_from_slices(key, iv).map_err(bad_length)?,
                )),
                n => Err(CboxError::InvalidArgument(format!(
                    "a {n}-byte key is not legal for TripleDES"
                ))),
            },
            CipherKind::Des => Ok(BlockDec::Des(
                DesCbcDec::new_from_slices(key, iv).map_err(bad_length)?,
            )),
            CipherKind::Rc2 => {
                let core = rc2::Rc2::new_with_eff_key_len(key, key.len() * 8);
                Ok(BlockDec::Rc2(Rc2CbcDec::inner_iv_init(
                    core,
                    GenericArray::from_slice(iv),
                )))
            }
            CipherKind::None => Err(CboxError::UnsupportedAlgorithm(
                "no symmetric cipher selected".into(),
            )),
        }
    }

    fn block_size(&self) -> usize {
        match self {
            BlockDec::Aes128(_) | BlockDec::Aes192(_) | BlockDec::Aes256(_) => 16,
            _ => 8,
        }
    }

    fn decrypt_block(&mut self, block: &mut [u8]) {
        match self {
            BlockDec::Aes128(c) => c.decrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockDec::Aes192(c) => c.decrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockDec::Aes256(c) => c.decrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockDec::Des(c) => c.decrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockDec::Tdes2(c) => c.decrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockDec::Tdes3(c) => c.decrypt_block_mut(GenericArray::from_mut_slice(block)),
            BlockDec::Rc2(c) => c.decrypt_block_mut(GenericArray::from_mut_slice(block)),
        }
    }
}

/// Streaming CBC encryptor. Feed plaintext with `write`, then call
/// `finish` exactly once: it pads the final block (PKCS7), flushes, and
/// returns the writer. Dropping without `finish` leaves the output
/// truncated and undecryptable.
pub struct StreamEncryptor<W: Write> {
    enc: BlockEnc,
    block: [u8; MAX_BLOCK_LEN],
    filled: usize,
    writer: W,
}

impl<W: Write> StreamEncryptor<W> {
    pub fn new(params: &CipherParams, writer: W) -> CboxResult<Self> {
        Ok(Self {
            enc: BlockEnc::new(params)?,
            block: [0u8; MAX_BLOCK_LEN],
            filled: 0,
            writer,
        })
    }

    /// Encrypt and emit every full block in `data`, buffering the rest.
    pub fn write(&mut self, mut data: &[u8]) -> CboxResult<()> {
        let bs = self.enc.block_size();
        while !data.is_empty() {
            let take = (bs - self.filled).min(data.len());
            self.block[self.filled..self.filled + take].copy_from_slice(&data[..take]);
            self.filled += take;
            data = &data[take..];
            if self.filled == bs {
                self.enc.encrypt_block(&mut self.block[..bs]);
                self.writer.write_all(&self.block[..bs])?;
                self.filled = 0;
            }
        }
        Ok(())
    }

    /// Apply PKCS7 padding, emit the final block, flush, and hand the
    /// writer back. A full padding block is emitted when the plaintext
    /// length is already a block multiple.
    pub fn finish(mut self) -> CboxResult<W> {
        let bs = self.enc.block_size();
        let pad = (bs - self.filled) as u8;
        for byte in &mut self.block[self.filled..bs] {
            *byte = pad;
        }
        self.enc.encrypt_block(&mut self.block[..bs]);
        self.writer.write_all(&self.block[..bs])?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Streaming CBC decryptor. Feed ciphertext with `write`; the final block
/// is withheld until `finish`, which validates and strips the PKCS7
/// padding. Corrupted data or a wrong key surface as
/// [`CboxError::Decryption`] at finalize time.
pub struct StreamDecryptor<W: Write> {
    dec: BlockDec,
    pending: Vec<u8>,
    writer: W,
}

impl<W: Write> StreamDecryptor<W> {
    pub fn new(params: &CipherParams, writer: W) -> CboxResult<Self> {
        Ok(Self {
            dec: BlockDec::new(params)?,
            pending: Vec::new(),
            writer,
        })
    }

    /// Decrypt and emit every block that can no longer be the final one.
    pub fn write(&mut self, data: &[u8]) -> CboxResult<()> {
        self.pending.extend_from_slice(data);
        let bs = self.dec.block_size();
        let len = self.pending.len();
        // The last full block must stay buffered: it may carry the
        // padding. A trailing partial block means every buffered full
        // block is safe to decrypt.
        let keep = match len % bs {
            0 => bs.min(len),
            r => r,
        };
        let process = len - keep;
        if process > 0 {
            for chunk in self.pending[..process].chunks_exact_mut(bs) {
                self.dec.decrypt_block(chunk);
                self.writer.write_all(chunk)?;
            }
            self.pending.drain(..process);
        }
        Ok(())
    }

    /// Decrypt the withheld final block, validate and strip its padding,
    /// flush, and hand the writer back.
    pub fn finish(mut self) -> CboxResult<W> {
        let bs = self.dec.block_size();
        if self.pending.is_empty() {
            self.writer.flush()?;
            return Ok(self.writer);
        }
        if self.pending.len() != bs {
            return Err(CboxError::Decryption(
                "ciphertext length is not a multiple of the cipher block size".into(),
            ));
        }

        let mut block = [0u8; MAX_BLOCK_LEN];
        block[..bs].copy_from_slice(&self.pending);
        self.dec.decrypt_block(&mut block[..bs]);

        let pad = block[bs - 1] as usize;
        if pad == 0 || pad > bs || block[bs - pad..bs].iter().any(|&b| b as usize != pad) {
            return Err(CboxError::Decryption("invalid block padding".into()));
        }

        self.writer.write_all(&block[..bs - pad])?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::block_padding::Pkcs7;

    fn aes_params() -> CipherParams {
        CipherParams::new(CipherKind::Aes, &[0x11u8; 32], &[0x22u8; 16]).unwrap()
    }

    fn roundtrip(params: &CipherParams, plaintext: &[u8]) -> Vec<u8> {
        let mut enc = StreamEncryptor::new(params, Vec::new()).unwrap();
        enc.write(plaintext).unwrap();
        let ciphertext = enc.finish().unwrap();

        let mut dec = StreamDecryptor::new(params, Vec::new()).unwrap();
        dec.write(&ciphertext).unwrap();
        dec.finish().unwrap()
    }

    #[test]
    fn roundtrip_across_block_boundaries() {
        let params = aes_params();
        for len in [0usize, 1, 15, 16, 17, 31, 32, 33, 1024] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
            assert_eq!(roundtrip(&params, &plaintext), plaintext, "len {len}");
        }
    }

    #[test]
    fn ciphertext_is_padded_to_the_next_block_multiple() {
        let params = aes_params();
        let mut enc = StreamEncryptor::new(&params, Vec::new()).unwrap();
        enc.write(&[0u8; 44]).unwrap();
        let ciphertext = enc.finish().unwrap();
        assert_eq!(ciphertext.len(), 48);

        // A block-aligned plaintext still gets a full padding block
        let mut enc = StreamEncryptor::new(&params, Vec::new()).unwrap();
        enc.write(&[0u8; 32]).unwrap();
        assert_eq!(enc.finish().unwrap().len(), 48);
    }

    #[test]
    fn matches_the_one_shot_padded_mode() {
        let key = [0x42u8; 16];
        let iv = [0x24u8; 16];
        let plaintext = b"attack at dawn, bring snacks";

        let params = CipherParams::new(CipherKind::Aes, &key, &iv).unwrap();
        let mut enc = StreamEncryptor::new(&params, Vec::new()).unwrap();
        enc.write(plaintext).unwrap();
        let streamed = enc.finish().unwrap();

        let reference = Aes128CbcEnc::new_from_slices(&key, &iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        assert_eq!(streamed, reference);
    }

    #[test]
    fn chunked_writes_equal_one_write() {
        let params = aes_params();
        let plaintext: Vec<u8> = (0..199).map(|i| (i * 7 % 256) as u8).collect();

        let mut whole = StreamEncryptor::new(&params, Vec::new()).unwrap();
        whole.write(&plaintext).unwrap();
        let expected = whole.finish().unwrap();

        let mut chunked = StreamEncryptor::new(&params, Vec::new()).unwrap();
        for chunk in plaintext.chunks(13) {
            chunked.write(chunk).unwrap();
        }
        assert_eq!(chunked.finish().unwrap(), expected);

        // Decrypt side must tolerate arbitrary chunking too
        let mut dec = StreamDecryptor::new(&params, Vec::new()).unwrap();
        for chunk in expected.chunks(7) {
            dec.write(chunk).unwrap();
        }
        assert_eq!(dec.finish().unwrap(), plaintext);
    }

    #[test]
    fn small_block_ciphers_roundtrip() {
        for (kind, key_len) in [
            (CipherKind::Des, 8usize),
            (CipherKind::TripleDes, 16),
            (CipherKind::TripleDes, 24),
            (CipherKind::Rc2, 5),
            (CipherKind::Rc2, 16),
        ] {
            let key: Vec<u8> = (1..=key_len as u8).collect();
            let params = CipherParams::new(kind, &key, &[0x33u8; 8]).unwrap();
            let plaintext = b"eight-byte blocks here";
            assert_eq!(
                roundtrip(&params, plaintext),
                plaintext,
                "{kind} with {key_len}-byte key"
            );
        }
    }

    #[test]
    fn tampered_ciphertext_fails_at_finish() {
        let params = aes_params();
        let mut enc = StreamEncryptor::new(&params, Vec::new()).unwrap();
        enc.write(b"do not touch this payload").unwrap();
        let mut ciphertext = enc.finish().unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;

        let mut dec = StreamDecryptor::new(&params, Vec::new()).unwrap();
        dec.write(&ciphertext).unwrap();
        assert!(matches!(dec.finish(), Err(CboxError::Decryption(_))));
    }

    #[test]
    fn truncated_ciphertext_fails_at_finish() {
        let params = aes_params();
        let mut enc = StreamEncryptor::new(&params, Vec::new()).unwrap();
        enc.write(b"short").unwrap();
        let ciphertext = enc.finish().unwrap();

        let mut dec = StreamDecryptor::new(&params, Vec::new()).unwrap();
        dec.write(&ciphertext[..ciphertext.len() - 3]).unwrap();
        assert!(matches!(dec.finish(), Err(CboxError::Decryption(_))));
    }

    #[test]
    fn wrong_key_fails_at_finish() {
        let params = aes_params();
        let mut enc = StreamEncryptor::new(&params, Vec::new()).unwrap();
        enc.write(b"a secret worth keeping").unwrap();
        let ciphertext = enc.finish().unwrap();

        let wrong = CipherParams::new(CipherKind::Aes, &[0x99u8; 32], &[0x22u8; 16]).unwrap();
        let mut dec = StreamDecryptor::new(&wrong, Vec::new()).unwrap();
        dec.write(&ciphertext).unwrap();
        // A wrong key usually fails padding validation; when the garbage
        // happens to look padded, it still must not yield the plaintext.
        match dec.finish() {
            Err(CboxError::Decryption(_)) => {}
            Err(other) => panic!("unexpected error kind: {other}"),
            Ok(out) => assert_ne!(out, b"a secret worth keeping"),
        }
    }
}
