//! Synthetic batch generation.

use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::config::{KeyOrder, WorkloadConfig};

/// One generated key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Returns `input + 1`, treating the slice as a big-endian unsigned integer.
///
/// The input is left untouched. An all-`0xFF` input wraps around to zeros.
pub fn next_key(input: &[u8]) -> Vec<u8> {
    let mut out = input.to_vec();
    for byte in out.iter_mut().rev() {
        if *byte != u8::MAX {
            *byte += 1;
            return out;
        }
        *byte = 0;
    }
    out
}

/// Value number `dup` of a key: zeroes with the big-endian dup index up front,
/// so duplicates are distinct and already in sorted order.
pub fn dup_value(dup: usize, value_size: usize) -> Vec<u8> {
    let mut value = vec![0u8; value_size];
    let index = (dup as u64).to_be_bytes();
    let n = value_size.min(index.len());
    value[..n].copy_from_slice(&index[index.len() - n..]);
    value
}

/// Builds batch number `batch`: `keys_per_batch` keys, each carrying `dups`
/// values.
///
/// Sequential keys start at `[batch as u8, 0, ...]` and count up from there, so
/// batches never overlap as long as there are at most 256 of them.
pub fn create_batch(batch: usize, config: &WorkloadConfig) -> Vec<Pair> {
    let values: Vec<Vec<u8>> = (0..config.dups)
        .map(|d| dup_value(d, config.value_size))
        .collect();
    let mut pairs = Vec::with_capacity(config.keys_per_batch * config.dups);

    let mut push_key = |key: &[u8]| {
        for value in &values {
            pairs.push(Pair {
                key: key.to_vec(),
                value: value.clone(),
            });
        }
    };

    match config.key_order {
        KeyOrder::Sequential => {
            let mut key = vec![0u8; config.key_len];
            key[0] = batch as u8;
            for _ in 0..config.keys_per_batch {
                key = next_key(&key);
                push_key(&key);
            }
        }
        KeyOrder::Random => {
            let mut rng = StdRng::seed_from_u64(config.seed ^ batch as u64);
            let mut key = vec![0u8; config.key_len];
            for _ in 0..config.keys_per_batch {
                rng.fill_bytes(&mut key);
                push_key(&key);
            }
        }
    }

    pairs
}

/// Orders pairs by key, then by value, as the engines store them.
pub fn sort_pairs(pairs: &mut [Pair]) {
    pairs.sort_unstable_by(|a, b| a.key.cmp(&b.key).then_with(|| a.value.cmp(&b.value)));
}
