//! Shared math utilities.

/// Elementwise cutoff used when binarizing feature activations.
pub const BINARY_THRESHOLD: f32 = 0.5;

/// Logistic sigmoid.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Threshold a feature vector at `> threshold` and pack the bits.
///
/// Bit `i` lands in byte `i / 8`, most significant bit first. The last byte is
/// zero-padded, so the output has `ceil(len / 8)` bytes.
pub fn pack_bits(values: &[f32], threshold: f32) -> Vec<u8> {
    let mut packed = vec![0u8; values.len().div_ceil(8)];
    for (i, &v) in values.iter().enumerate() {
        if v > threshold {
            packed[i / 8] |= 0x80 >> (i % 8);
        }
    }
    packed
}

/// Inverse of [`pack_bits`]: expand `bytes` into `len` booleans.
#[cfg(test)]
pub(crate) fn unpack_bits(bytes: &[u8], len: usize) -> Vec<bool> {
    (0..len)
        .map(|i| bytes.get(i / 8).is_some_and(|b| b & (0x80 >> (i % 8)) != 0))
        .collect()
}
