//! Key/IV size repair: cyclic or zero padding to an exact block multiple
//!
//! These are byte-buffer adjustments, not cryptography: a caller-supplied
//! key that is too short is extended by repeating its own bytes from the
//! start, and one that is too long is truncated. Derived keys never need
//! this (the KDF emits exact lengths); it exists for the raw-key path.

use cbox_core::{CboxError, CboxResult};

/// Extend `data` to the next multiple of `block_size` by cyclic repetition
/// of its own bytes.
///
/// The truncate branch takes precedence: with `truncate_if_larger` set and
/// `data.len() > block_size`, exactly the first `block_size` bytes are
/// returned. Input already a multiple of `block_size` is returned
/// unchanged; otherwise `out[i] = data[i % data.len()]` for every index
/// past the original length.
pub fn pad_cyclic(data: &[u8], block_size: usize, truncate_if_larger: bool) -> CboxResult<Vec<u8>> {
    pad_with(data, block_size, truncate_if_larger, Fill::Cyclic)
}

/// Same contract as [`pad_cyclic`], but fill bytes are `0x00`.
pub fn pad_zero(data: &[u8], block_size: usize, truncate_if_larger: bool) -> CboxResult<Vec<u8>> {
    pad_with(data, block_size, truncate_if_larger, Fill::Zero)
}

#[derive(Clone, Copy)]
enum Fill {
    Cyclic,
    Zero,
}

fn pad_with(
    data: &[u8],
    block_size: usize,
    truncate_if_larger: bool,
    fill: Fill,
) -> CboxResult<Vec<u8>> {
    if data.is_empty() {
        return Err(CboxError::InvalidArgument(
            "cannot size-normalize an empty buffer".into(),
        ));
    }
    if block_size == 0 {
        return Err(CboxError::InvalidArgument(
            "block size must be positive".into(),
        ));
    }

    if truncate_if_larger && data.len() > block_size {
        return Ok(data[..block_size].to_vec());
    }
    if data.len() % block_size == 0 {
        return Ok(data.to_vec());
    }

    let target = data.len().div_ceil(block_size) * block_size;
    let mut out = Vec::with_capacity(target);
    out.extend_from_slice(data);
    for i in data.len()..target {
        out.push(match fill {
            Fill::Cyclic => data[i % data.len()],
            Fill::Zero => 0,
        });
    }
    Ok(out)
}

/// Repair `key` to exactly `required` bytes: unchanged when already the
/// right length, cyclically padded when shorter, truncated when longer.
pub fn valid_key_for(key: &[u8], required: usize) -> CboxResult<Vec<u8>> {
    if key.len() == required {
        return Ok(key.to_vec());
    }
    pad_cyclic(key, required, true)
}

/// Same contract as [`valid_key_for`], for IV/block alignment.
pub fn valid_iv_for(iv: &[u8], required: usize) -> CboxResult<Vec<u8>> {
    if iv.len() == required {
        return Ok(iv.to_vec());
    }
    pad_cyclic(iv, required, true)
}
